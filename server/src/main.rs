//! sgmock server - drive the in-memory mock over stdin and stdout.
//!
//! Each line on stdin is one JSON request; each answer is one JSON line on
//! stdout. Logs go to stderr so they never mix with responses. When stdin
//! closes the live records can be written to a snapshot file.

mod config;
mod error;
mod handlers;
mod protocol;

use crate::config::Config;
use sgmock_engine::Session;
use std::fs::File;
use std::io::{self, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sgmock_server=info,sgmock_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env().map_err(error::AppError::from)?;

    let mut session = Session::new().with_base_url(config.base_url.clone());

    if let Some(path) = &config.snapshot {
        tracing::info!(path = %path.display(), "loading snapshot");
        let file = File::open(path).map_err(error::AppError::from)?;
        session
            .load_json(BufReader::new(file))
            .map_err(error::AppError::from)?;
    }

    tracing::info!("Serving requests on stdin");
    let answered = handlers::serve(&mut session, &config, io::stdin().lock(), io::stdout().lock())?;
    tracing::info!(answered, "input closed");

    if let Some(path) = &config.dump {
        handlers::write_dump(&session, path, config.pretty_dump)?;
    }

    Ok(())
}
