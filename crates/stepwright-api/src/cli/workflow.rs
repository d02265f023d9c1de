//! Workflow CLI subcommands: create, list, show, delete.

use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use stepwright_types::workflow::{NewWorkflowRequest, StepType, Workflow, WorkflowId};

use crate::state::AppState;

/// Workflow subcommands.
#[derive(Subcommand)]
pub enum WorkflowCommand {
    /// Create a workflow, optionally seeded from a template.
    Create {
        /// Workflow name.
        name: String,

        /// Entity type the workflow applies to (Risk, Control, Incident, ...).
        #[arg(long)]
        entity_type: String,

        /// Short description.
        #[arg(long)]
        description: Option<String>,

        /// Template key to populate the steps from (see `template list`).
        #[arg(long)]
        template: Option<String>,
    },

    /// List all workflows.
    #[command(alias = "ls")]
    List,

    /// Show a workflow and its ordered steps.
    Show {
        /// Workflow id.
        id: String,
    },

    /// Delete a workflow and all its steps.
    #[command(alias = "rm")]
    Delete {
        /// Workflow id.
        id: String,

        /// Skip confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

/// Handle a workflow subcommand.
pub async fn handle_workflow_command(cmd: WorkflowCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        WorkflowCommand::Create {
            name,
            entity_type,
            description,
            template,
        } => create_workflow(state, name, entity_type, description, template, json).await,
        WorkflowCommand::List => list_workflows(state, json).await,
        WorkflowCommand::Show { id } => show_workflow(state, &id, json).await,
        WorkflowCommand::Delete { id, force } => delete_workflow(state, &id, force, json).await,
    }
}

fn parse_id(raw: &str) -> Result<WorkflowId> {
    raw.parse::<WorkflowId>()
        .with_context(|| format!("'{raw}' is not a valid workflow id"))
}

async fn create_workflow(
    state: &AppState,
    name: String,
    entity_type: String,
    description: Option<String>,
    template: Option<String>,
    json: bool,
) -> Result<()> {
    let request = NewWorkflowRequest {
        name,
        description,
        entity_type,
        is_active: None,
    };

    let service = &state.workflow_service;
    let created = service.create_workflow(request).await?;

    if let Some(key) = &template {
        if let Err(e) = service.apply_template(&created.id, key, false).await {
            // Don't leave an empty workflow behind for a bad template key.
            service.delete_workflow(&created.id).await?;
            return Err(e).with_context(|| format!("Failed to apply template '{key}'"));
        }
    }

    let workflow = service.get_workflow(&created.id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflow)?);
        return Ok(());
    }

    println!();
    println!("  {} Workflow created successfully!", style("✓").green().bold());
    println!();
    println!("  {}  {}", style("Name:").bold(), style(&workflow.name).cyan());
    println!("  {}  {}", style("Entity:").bold(), &workflow.entity_type);
    println!("  {}  {}", style("Steps:").bold(), workflow.steps.len());
    if let Some(key) = &template {
        println!("  {}  {}", style("Template:").bold(), key);
    }
    println!("  {}  {}", style("ID:").bold(), style(workflow.id.to_string()).dim());
    println!();

    Ok(())
}

async fn list_workflows(state: &AppState, json: bool) -> Result<()> {
    let workflows = state.workflow_service.list_workflows().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    if workflows.is_empty() {
        println!();
        println!(
            "  {} No workflows found. Create one with: {}",
            style("i").blue().bold(),
            style("stepwright workflow create <name> --entity-type <type>").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Entity").fg(Color::White),
        Cell::new("Steps").fg(Color::White),
        Cell::new("Status").fg(Color::White),
        Cell::new("ID").fg(Color::White),
    ]);

    for wf in &workflows {
        table.add_row(vec![
            Cell::new(&wf.name).fg(Color::Cyan),
            Cell::new(&wf.entity_type),
            Cell::new(wf.steps.len()),
            active_cell(wf),
            Cell::new(wf.id.to_string()).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} workflow{}",
        style(workflows.len()).bold(),
        if workflows.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

async fn show_workflow(state: &AppState, id: &str, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let workflow = state.workflow_service.get_workflow(&id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workflow)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&workflow.name).cyan().bold());
    if let Some(desc) = &workflow.description {
        println!("  {}", style(desc).dim());
    }
    println!();
    println!("  {}", style("── Details ──").dim());
    println!("  {}   {}", style("Entity:").bold(), &workflow.entity_type);
    println!(
        "  {}   {}",
        style("Active:").bold(),
        if workflow.is_active { "yes" } else { "no" }
    );
    println!("  {}  {}", style("Version:").bold(), workflow.version);
    println!("  {}       {}", style("ID:").bold(), style(workflow.id.to_string()).dim());
    println!();

    println!("  {}", style("── Steps ──").dim());
    if workflow.steps.is_empty() {
        println!("  (none)");
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").fg(Color::White),
        Cell::new("Name").fg(Color::White),
        Cell::new("Type").fg(Color::White),
        Cell::new("Approver").fg(Color::White),
        Cell::new("Days").fg(Color::White),
        Cell::new("Required").fg(Color::White),
    ]);

    for step in &workflow.steps {
        let type_cell = match step.step_type {
            StepType::Approval => Cell::new("approval").fg(Color::Green),
            StepType::Notification => Cell::new("notification").fg(Color::Yellow),
            StepType::AutoAction => Cell::new("auto_action").fg(Color::Blue),
        };
        let approver = match (&step.approver_role, step.approver_users.is_empty()) {
            (Some(role), true) => role.clone(),
            (Some(role), false) => format!("{role} + {} user(s)", step.approver_users.len()),
            (None, false) => format!("{} user(s)", step.approver_users.len()),
            (None, true) => "-".to_string(),
        };
        let days = step
            .days_to_complete
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            Cell::new(step.step_order),
            Cell::new(&step.name).fg(Color::Cyan),
            type_cell,
            Cell::new(approver),
            Cell::new(days),
            Cell::new(if step.is_required { "yes" } else { "no" }),
        ]);
    }

    println!("{table}");
    println!();

    Ok(())
}

async fn delete_workflow(state: &AppState, id: &str, force: bool, json: bool) -> Result<()> {
    let id = parse_id(id)?;
    let workflow = state.workflow_service.get_workflow(&id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete workflow '{}' and its {} step(s)?",
                style(&workflow.name).red().bold(),
                workflow.steps.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.workflow_service.delete_workflow(&id).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "id": id.to_string()}));
    } else {
        println!(
            "  {} Workflow '{}' deleted.",
            style("✓").red().bold(),
            workflow.name
        );
    }

    Ok(())
}

fn active_cell(wf: &Workflow) -> Cell {
    if wf.is_active {
        Cell::new("● active").fg(Color::Green)
    } else {
        Cell::new("○ inactive").fg(Color::Yellow)
    }
}
