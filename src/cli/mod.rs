//! CLI for the agentflow server

pub mod serve;

use clap::{Parser, Subcommand};

/// Agentflow - agents and workflows over HTTP and WebSocket
#[derive(Parser)]
#[command(name = "agentflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Default, Clone, Copy)]
pub enum Command {
    /// Run the HTTP and WebSocket server (default)
    #[default]
    Serve,
}
