use anyhow::Result;
use clap::Parser;

use client::{build_client_app, Args, ClientConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ClientConfig::load(args.config.as_deref())?;
    let mut app = build_client_app(args, config);
    app.run();
    Ok(())
}
