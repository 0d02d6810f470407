//! `viewer_manifest` - stages a compiled viewer and packages it.

use std::process;
use viewer_bundler::cli::{self, Args};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse_args();

    // RUST_LOG wins; --verbose only raises the default
    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let exit_code = match cli::run(&args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            for hint in e.recovery_suggestions() {
                eprintln!("  hint: {hint}");
            }
            1
        }
    };

    process::exit(exit_code);
}
