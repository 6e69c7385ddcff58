//! msdo task runner binary

// The panic hook and fatal error report bypass tracing
#![allow(clippy::print_stderr)]

use msdo::cli::{self, EXIT_FAILED};
use msdo::tracing::{TracingConfig, init_tracing};

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with RUST_LOG=debug for more information.");
    }));

    let cli = cli::parse();

    let config = TracingConfig {
        format: cli.format,
        level: cli.level.into(),
    };
    if let Err(error) = init_tracing(config) {
        eprintln!("{error:?}");
        std::process::exit(EXIT_FAILED);
    }

    match msdo::commands::execute(cli).await {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("{:?}", miette::Report::new(error));
            std::process::exit(EXIT_FAILED);
        }
    }
}
