pub mod commands;
pub mod config;
pub mod pipeline;

use clap::Parser;
use config::Config;
use std::process::ExitCode;

pub async fn run() -> ExitCode {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_directives().into()),
        )
        .init();

    match commands::execute(&config).await {
        Ok(envelope) => {
            println!("{}", envelope);
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", commands::failure(&e));
            ExitCode::FAILURE
        }
    }
}
