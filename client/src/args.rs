use std::path::PathBuf;

use bevy::prelude::Resource;
use clap::Parser;

#[derive(Parser, Debug, Resource, Clone)]
#[command(name = "foilsync")]
#[command(about = "Live 3D view of a hydrofoil simulation", long_about = None)]
pub struct Args {
    /// Simulation server WebSocket URL
    #[arg(long, default_value = "ws://127.0.0.1:9000")]
    pub url: String,
    /// Optional TOML file with [visuals], [grid] and [assets] sections
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory holding the STL meshes
    #[arg(long, default_value = "assets")]
    pub assets: PathBuf,
    /// Run without window/rendering
    #[arg(long, default_value_t = false)]
    pub headless: bool,
    /// Wait for the Connect button instead of connecting on startup
    #[arg(long, default_value_t = false)]
    pub no_autoconnect: bool,
    /// Show the ECS world inspector
    #[arg(long, default_value_t = false)]
    pub inspector: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:9000".to_string(),
            config: None,
            assets: PathBuf::from("assets"),
            headless: false,
            no_autoconnect: false,
            inspector: false,
        }
    }
}
