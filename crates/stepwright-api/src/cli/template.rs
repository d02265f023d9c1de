//! Template catalog CLI subcommands.

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use crate::http::handlers::template::TemplateCatalog;
use crate::state::AppState;

/// Template subcommands.
#[derive(Subcommand)]
pub enum TemplateCommand {
    /// List built-in templates.
    #[command(alias = "ls")]
    List,
}

/// Handle a template subcommand.
pub async fn handle_template_command(cmd: TemplateCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        TemplateCommand::List => list_templates(state, json),
    }
}

fn list_templates(state: &AppState, json: bool) -> Result<()> {
    let templates = state.workflow_service.list_templates();

    if json {
        println!("{}", serde_json::to_string_pretty(&TemplateCatalog(templates))?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Key").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Entity").fg(Color::White),
        Cell::new("Steps").fg(Color::White),
    ]);

    for t in templates {
        let steps = t
            .steps
            .iter()
            .map(|s| s.name)
            .collect::<Vec<_>>()
            .join(" → ");
        table.add_row(vec![
            Cell::new(t.key).fg(Color::Cyan),
            Cell::new(t.name),
            Cell::new(t.entity_type),
            Cell::new(steps).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  Apply one with: {}",
        style("stepwright workflow create <name> --entity-type <type> --template <key>").yellow()
    );
    println!();

    Ok(())
}
