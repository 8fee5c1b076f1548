//! # Bestiary Engine
//!
//! Headless driver for Genesis Bestiary.
//!
//! This crate ties together:
//! - Config: seed, timestep, frame cap, definitions path, autopilot toggles
//! - Gameplay: hunter, monsters, carving and quest tracking
//! - Autopilot: scripted input standing in for a player

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

mod app;
mod autopilot;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{SimConfig, CONFIG_FILE};

/// Main entry point.
fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("bestiary=info".parse()?))
        .init();

    info!("Genesis Bestiary starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let config = SimConfig::load_from(&config_path);

    let summary = app::run(&config)?;
    info!("Hunt over: {}", summary.describe());

    info!("Genesis Bestiary shutdown complete");
    Ok(())
}
