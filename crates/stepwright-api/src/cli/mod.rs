//! CLI command definitions and dispatch for the `stepwright` binary.
//!
//! Uses clap derive macros for argument parsing. The CLI follows a noun-verb
//! pattern (e.g., `stepwright workflow create`, `stepwright template list`).

pub mod template;
pub mod token;
pub mod workflow;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Manage ordered approval workflows.
#[derive(Parser)]
#[command(name = "stepwright", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage workflows (create, list, show, delete).
    #[command(alias = "wf")]
    Workflow {
        #[command(subcommand)]
        action: workflow::WorkflowCommand,
    },

    /// Browse built-in workflow templates.
    Template {
        #[command(subcommand)]
        action: template::TemplateCommand,
    },

    /// Anti-forgery tokens for API clients.
    Token {
        #[command(subcommand)]
        action: token::TokenCommand,
    },

    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to `server.port` from config.toml).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to `server.host` from config.toml).
        #[arg(long)]
        host: Option<String>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
