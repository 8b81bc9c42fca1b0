mod cli;
mod report;
mod setup;

use crate::cli::Args;
use clap::Parser;
use futures::StreamExt;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    tokio::select! {
        code = run(args) => code,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the run drops its event stream, which removes the
            // intermediates registered so far.
            tracing::warn!("Interrupted");
            ExitCode::from(INTERRUPTED)
        },
    }
}

async fn run(args: Args) -> ExitCode {
    let (request, collaborators) = match setup::prepare(&args) {
        Ok(prepared) => prepared,
        Err(e) => {
            tracing::error!(error = ?e, "Cannot start");
            eprintln!("error: {}", &*e);
            return ExitCode::FAILURE;
        },
    };

    let mut fatal = false;
    let mut events = std::pin::pin!(rotamix_mixer::mix(&request, &collaborators));
    while let Some(event) = events.next().await {
        match event {
            Ok(event) => {
                if let Some(line) = report::describe(&event) {
                    println!("{line}");
                }
            },
            Err(e) => {
                fatal |= e.is_fatal();
                tracing::debug!(error = ?e, "Run error");
                eprintln!("error: {}", &*e);
            },
        }
    }
    match fatal {
        true => ExitCode::FAILURE,
        false => ExitCode::SUCCESS,
    }
}
