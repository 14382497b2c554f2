//! PairCull - side-by-side image comparison and culling
//!
//! Shows two random images from a folder at a time and moves the ones
//! the user rejects into a discard subfolder, until fewer than two
//! images remain.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod file_ops;
mod scanner;
mod scheduler;

use std::path::PathBuf;

use clap::Parser;

use app::PairCullApp;
use scanner::SessionConfig;

/// Compare images two at a time and move rejects to a discard folder.
#[derive(Parser, Debug)]
#[command(name = "PairCull", version, about)]
struct Cli {
    /// Folder holding the images to compare; defaults to the working directory
    folder: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let folder = cli.folder.unwrap_or_else(|| PathBuf::from("."));

    log::info!("Welcome to PairCull!");
    log::info!("W or UP to keep both images");
    log::info!("A or LEFT to discard the left image");
    log::info!("D or RIGHT to discard the right image");
    log::info!("S or DOWN to discard both images");

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([600.0, 400.0])
            .with_maximized(true)
            .with_title("PairCull"),
        ..Default::default()
    };

    let config = SessionConfig::new(folder);
    eframe::run_native(
        "PairCull",
        options,
        Box::new(|cc| Ok(Box::new(PairCullApp::new(cc, config)))),
    )
}
