//! Command-line entry point for indexing and identifying audio.

use std::env;
use std::path::{Path, PathBuf};
use std::process;

use fpcore::{
    identify_stream_segment, FingerprintConfig, IndexPipeline, MatchReport, QueryPipeline,
    SqliteStore, StoreConfig,
};

fn data_dir() -> PathBuf {
    env::var("FPCORE_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .map(|d| d.join("fpcore"))
                .unwrap_or_else(|| PathBuf::from(".fpcore"))
        })
}

fn db_path() -> PathBuf {
    data_dir().join("fingerprints.sqlite3")
}

fn usage() {
    eprintln!("Usage: fpcore <command> [args]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  index <file> <songid>          Fingerprint a file and store it under songid");
    eprintln!("  identify <file> [--json]       Identify a standalone audio file");
    eprintln!("  stream <name> <file> [--json]  Identify one segment of a named stream");
    process::exit(1);
}

fn open_store() -> SqliteStore {
    let dir = data_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        eprintln!("Failed to create data directory {}: {e}", dir.display());
        process::exit(1);
    }
    match SqliteStore::open(db_path(), StoreConfig::default()) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open store: {e}");
            process::exit(1);
        }
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let config = FingerprintConfig::default();

    match args[1].as_str() {
        "index" => {
            if args.len() < 4 {
                eprintln!("Usage: fpcore index <file> <songid>");
                process::exit(1);
            }
            let mut store = open_store();
            let mut indexer = IndexPipeline::new(&mut store, config);
            match indexer.index_file(Path::new(&args[2]), &args[3]) {
                Ok(n) => println!("Indexed {} hashes for {}", n, args[3]),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        "identify" => {
            if args.len() < 3 {
                eprintln!("Usage: fpcore identify <file> [--json]");
                process::exit(1);
            }
            let json = args.iter().any(|a| a == "--json");
            let store = open_store();
            let querier = QueryPipeline::new(&store, config);
            match querier.identify_file(Path::new(&args[2])) {
                Ok(report) => print_match_report(&report, json),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        "stream" => {
            if args.len() < 4 {
                eprintln!("Usage: fpcore stream <name> <file> [--json]");
                process::exit(1);
            }
            let json = args.iter().any(|a| a == "--json");
            let mut store = open_store();
            match identify_stream_segment(&mut store, &config, &args[2], Path::new(&args[3])) {
                Ok(Some(note)) => {
                    if json {
                        println!("{}", serde_json::to_string(&note).unwrap());
                    } else {
                        println!(
                            "Stream {} changed to {} (score {})",
                            note.stream, note.song, note.score
                        );
                    }
                }
                Ok(None) => println!("No change for stream {}", args[2]),
                Err(e) => {
                    eprintln!("Error: {e}");
                    process::exit(1);
                }
            }
        }
        _ => usage(),
    }
}

fn print_match_report(report: &MatchReport, json: bool) {
    if json {
        println!("{}", serde_json::to_string(report).unwrap());
    } else {
        match &report.song {
            Some(song) => println!("Matched {} (score {})", song, report.score),
            None => println!("No match (score {})", report.score),
        }
    }
}
