//! SlateKV CLI
//!
//! Command-line interface for inspecting and writing SlateKV archives.
//!
//! Keys and values are printed as UTF-8 by default; the `--binary-keys`
//! and `--binary-values` flags switch the respective side to base58 for
//! non-textual data.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use slatekv::Reader;

/// SlateKV archive tool
#[derive(Parser, Debug)]
#[command(name = "slatekv")]
#[command(about = "Inspect and write SlateKV key/value archives")]
#[command(version)]
struct Args {
    /// Path to the archive file
    #[arg(short, long, global = true)]
    file: Option<PathBuf>,

    /// Print keys as binary (base58)
    #[arg(long, global = true)]
    binary_keys: bool,

    /// Print values as binary (base58)
    #[arg(long, global = true)]
    binary_values: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the number of keys in the archive
    Count,

    /// Print all keys in sorted order
    Keys,

    /// Print all key/value pairs
    Values,

    /// Get the value for a specific key
    Get {
        /// The key to look up
        key: String,
    },

    /// Write a new archive from a JSON object of key/value strings
    Write {
        /// The JSON data to write
        json: String,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,slatekv=info"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        eprintln!("ERROR: {err:#}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Commands::Count => {
            let reader = open_archive(args)?;
            println!("{}", reader.len());
            Ok(())
        }
        Commands::Keys => {
            let reader = open_archive(args)?;
            for index in 0..reader.len() {
                let entry = reader.read_index_entry(index)?;
                print_data(entry.key(), args.binary_keys);
            }
            Ok(())
        }
        Commands::Values => {
            let reader = open_archive(args)?;
            if reader.is_empty() {
                println!("No key-value pairs found.");
                return Ok(());
            }
            for index in 0..reader.len() {
                let entry = reader.read_index_entry(index)?;
                print_data(entry.key(), args.binary_keys);
                let value = reader.value_of(&entry, index)?;
                print_data(&value, args.binary_values);
            }
            Ok(())
        }
        Commands::Get { key } => {
            let reader = open_archive(args)?;
            match reader.get(key.as_bytes())? {
                Some(value) => {
                    print_data(&value, args.binary_values);
                    Ok(())
                }
                None => bail!("key {key:?} not found"),
            }
        }
        Commands::Write { json } => {
            let path = archive_path(args)?;
            let data: BTreeMap<String, String> =
                serde_json::from_str(json).context("invalid JSON input")?;

            let values: BTreeMap<Vec<u8>, Vec<u8>> = data
                .into_iter()
                .map(|(key, value)| (key.into_bytes(), value.into_bytes()))
                .collect();
            let keys: Vec<Vec<u8>> = values.keys().cloned().collect();

            let mut file = File::create(path)?;
            slatekv::write(&mut file, &keys, |out, key| {
                let value = values.get(key).expect("key came from this map");
                out.write_all(value)?;
                Ok(value.len() as u64)
            })?;
            file.sync_all()?;
            Ok(())
        }
    }
}

fn archive_path(args: &Args) -> Result<&Path> {
    args.file
        .as_deref()
        .ok_or_else(|| anyhow!("please provide a file path with --file"))
}

fn open_archive(args: &Args) -> Result<Reader<File>> {
    let path = archive_path(args)?;
    Reader::open(path).with_context(|| format!("opening archive {}", path.display()))
}

fn print_data(data: &[u8], binary: bool) {
    if binary {
        println!("{}", bs58::encode(data).into_string());
    } else {
        println!("{}", String::from_utf8_lossy(data));
    }
}
