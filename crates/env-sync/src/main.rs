//! Sync load-related fields in the demo metadata YAML from a `.env` file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use env_sync::{load_env, sync_metadata, SyncError};

#[derive(Parser)]
#[command(name = "sync-load-env")]
#[command(about = "Sync load configuration values from a .env file into demo-user-data.yaml", long_about = None)]
struct Cli {
    /// Path to the .env file
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Path to the kube-burner user metadata file
    #[arg(long, default_value = "tmp/demo-user-data.yaml")]
    metadata_file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let env = match load_env(&cli.env_file) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if env.is_empty() {
        println!("No .env values found at {}, nothing to sync.", cli.env_file.display());
        return ExitCode::SUCCESS;
    }

    match sync_metadata(&cli.metadata_file, &env) {
        Ok(mut keys) if !keys.is_empty() => {
            keys.sort();
            println!("Updated {} keys: {}", cli.metadata_file.display(), keys.join(", "));
            ExitCode::SUCCESS
        }
        Ok(_) => {
            println!("No matching environment variables to sync.");
            ExitCode::SUCCESS
        }
        Err(e @ SyncError::MetadataNotFound(_)) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
