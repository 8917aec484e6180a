use clap::Parser;

use reelgen::cli::{self, Args};
use reelgen::config::{REPLICATE_API_KEY_ENV, REPLICATE_API_TOKEN_ENV};

/// Load .env file and check for the Replicate token.
///
/// Does not override existing environment variables.
fn load_env() {
    // dotenv::dotenv() returns Err if .env doesn't exist, which is fine
    let _ = dotenv::dotenv();

    if std::env::var(REPLICATE_API_TOKEN_ENV).is_err() && std::env::var(REPLICATE_API_KEY_ENV).is_err() {
        log::warn!(
            "{} is not set. Generation commands will fail until it is added to .env or the environment.",
            REPLICATE_API_TOKEN_ENV
        );
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load .env file before anything reads configuration
    load_env();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(cli::run(args)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
