//! Anti-forgery token CLI subcommands.
//!
//! Scripts talking to the REST API mint a token here and send it in the
//! `X-CSRF-Token` header of every mutating request.

use anyhow::Result;
use clap::Subcommand;
use console::style;

use stepwright_infra::csrf::WORKFLOW_API_NAMESPACE;

use crate::state::AppState;

/// Token subcommands.
#[derive(Subcommand)]
pub enum TokenCommand {
    /// Mint a token for the workflow API.
    Issue,
}

/// Handle a token subcommand.
pub async fn handle_token_command(cmd: TokenCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        TokenCommand::Issue => {
            let token = state.csrf.issue(WORKFLOW_API_NAMESPACE)?;
            if json {
                println!(
                    "{}",
                    serde_json::json!({"header": "X-CSRF-Token", "token": token})
                );
            } else {
                println!();
                println!("  {} Send as the {} header:", style("🔑").bold(), style("X-CSRF-Token").bold());
                println!();
                println!("  {}", style(&token).yellow().bold());
                println!();
            }
            Ok(())
        }
    }
}
