#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
pub mod client;
mod config;
pub mod controller;
pub mod error;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;

use clap::Parser;
use eframe::egui;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "threadchat-egui")]
#[command(about = "Desktop chat client for a LangGraph agent server", long_about = None)]
struct Args {
    /// Base URL of the agent server (saved for next launch)
    #[arg(short, long)]
    url: Option<String>,

    /// Assistant (graph) id to run turns against
    #[arg(short, long)]
    assistant: Option<String>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("threadchat_egui=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> eframe::Result {
    init_tracing();
    let args = Args::parse();

    let mut config = config::AppConfig::load();
    if config.apply_overrides(args.url, args.assistant) {
        config.save();
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1024.0, 720.0])
            .with_title("Chatbot"),
        ..Default::default()
    };

    eframe::run_native(
        "threadchat-egui",
        options,
        Box::new(move |cc| Ok(Box::new(app::ChatApp::new(cc, config)?))),
    )
}
