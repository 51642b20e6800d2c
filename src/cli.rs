//! CLI interface for storyloop

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::Config;
use crate::generation::{OpenRouterClient, OpenRouterGenerator, OpenRouterImageRenderer, ProviderConfig};
use crate::store::FileStore;
use crate::studio::Studio;
use crate::types::{ItemStatus, Stage};

#[derive(Parser)]
#[command(name = "storyloop")]
#[command(about = "Content-review pipeline with persistent feedback memory", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage review projects
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },
    /// Inspect and review pipeline items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Inspect the feedback ledger and what was learned from it
    Feedback {
        #[command(subcommand)]
        command: FeedbackCommands,
    },
    /// Print the compiled generation context for a project
    Context {
        /// Project id
        project: String,
    },
    /// Generate items for a stage
    Generate {
        /// Project id
        project: String,
        /// Target stage (strategy, concept, script, storyboard)
        stage: String,
        /// Number of fresh items to generate (strategy stage only)
        #[arg(short, long, default_value = "3")]
        count: usize,
        /// Wait for background generation to finish before exiting
        #[arg(short, long)]
        wait: bool,
    },
    /// Regenerate one item in place after revision feedback
    Regenerate {
        /// Project id
        project: String,
        /// Stage of the item
        stage: String,
        /// Item id
        item: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// Create a new project
    New {
        /// Project name
        name: String,
        /// Brand/tone context injected into every generation prompt
        #[arg(short, long, default_value = "")]
        brand: String,
    },
    /// List all projects
    List,
}

#[derive(Subcommand)]
enum ItemCommands {
    /// List items of a stage
    List {
        project: String,
        stage: String,
    },
    /// Approve an item
    Approve {
        project: String,
        stage: String,
        item: String,
        /// Optional comment recorded with the decision
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Reject an item
    Reject {
        project: String,
        stage: String,
        item: String,
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Request a revision of an item
    Revise {
        project: String,
        stage: String,
        item: String,
        /// Revision comment (becomes a standing rule when non-empty)
        #[arg(short, long)]
        comment: Option<String>,
    },
    /// Comment on an item without changing its status
    Comment {
        project: String,
        stage: String,
        item: String,
        comment: String,
    },
}

#[derive(Subcommand)]
enum FeedbackCommands {
    /// List the full decision ledger, oldest first
    List { project: String },
    /// Show the learned pattern summary
    Patterns { project: String },
    /// Detect and show contradictions in the ledger
    Contradictions { project: String },
}

fn parse_stage(s: &str) -> Result<Stage> {
    Stage::parse(s).ok_or_else(|| anyhow!("unknown stage '{}' (expected strategy, concept, script, or storyboard)", s))
}

fn open_studio(config: &Config) -> Result<Studio> {
    let base_dir = config.resolved_data_dir()?.join("projects");
    let store = FileStore::with_dir(base_dir)?;
    Ok(Studio::new(Arc::new(store)))
}

/// Run the CLI
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    let studio = open_studio(&config)?;

    match cli.command {
        Commands::Project { command } => match command {
            ProjectCommands::New { name, brand } => {
                let project = studio.projects.create(&name, &brand).await?;
                println!("Created project {} ({})", project.name, project.id);
            }
            ProjectCommands::List => {
                let projects = studio.projects.list().await?;
                if projects.is_empty() {
                    println!("No projects yet. Create one with: storyloop project new <name>");
                }
                for project in projects {
                    println!(
                        "{}  {}  (updated {})",
                        project.id,
                        project.name,
                        project.updated_at.format("%Y-%m-%d %H:%M UTC")
                    );
                }
            }
        },

        Commands::Item { command } => match command {
            ItemCommands::List { project, stage } => {
                let stage = parse_stage(&stage)?;
                for item in studio.items.list(&project, stage).await? {
                    let error_note = item
                        .error
                        .as_deref()
                        .map(|e| format!("  [error: {}]", e))
                        .unwrap_or_default();
                    println!("{}  [{}]  {}{}", item.id, item.status, item.title, error_note);
                }
            }
            ItemCommands::Approve { project, stage, item, comment } => {
                review(&studio, &project, &stage, &item, ItemStatus::Approved, comment).await?;
            }
            ItemCommands::Reject { project, stage, item, comment } => {
                review(&studio, &project, &stage, &item, ItemStatus::Rejected, comment).await?;
            }
            ItemCommands::Revise { project, stage, item, comment } => {
                review(&studio, &project, &stage, &item, ItemStatus::Revision, comment).await?;
            }
            ItemCommands::Comment { project, stage, item, comment } => {
                let stage = parse_stage(&stage)?;
                let (updated, _) = studio.items.add_comment(&project, stage, &item, &comment).await?;
                println!("Commented on '{}'", updated.title);
            }
        },

        Commands::Feedback { command } => match command {
            FeedbackCommands::List { project } => {
                for entry in studio.ledger.list(&project).await? {
                    println!(
                        "{}  {}  [{}] {}  {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M"),
                        entry.action,
                        entry.stage,
                        entry.item_title,
                        entry.comment.as_deref().unwrap_or("")
                    );
                }
            }
            FeedbackCommands::Patterns { project } => {
                let patterns = studio.ledger.patterns(&project).await?;
                println!("{}", serde_json::to_string_pretty(&patterns)?);
            }
            FeedbackCommands::Contradictions { project } => {
                let entries = studio.ledger.list(&project).await?;
                let found = crate::feedback::detect_contradictions(&entries);
                if found.is_empty() {
                    println!("No contradictions detected.");
                }
                for c in found {
                    println!("[{}] {}", c.kind, c.description);
                }
            }
        },

        Commands::Context { project } => {
            let ctx = studio.compiler.compile(&project).await?;
            println!("{}", serde_json::to_string_pretty(&ctx)?);
        }

        Commands::Generate { project, stage, count, wait } => {
            let stage = parse_stage(&stage)?;
            let provider = ProviderConfig::from_config(&config)?;
            let client = OpenRouterClient::new(provider);
            let generator = Arc::new(OpenRouterGenerator::new(client.clone(), config.models.clone()));
            let runner = studio
                .batch_runner(generator)
                .with_image_renderer(Arc::new(OpenRouterImageRenderer::new(
                    client,
                    config.models.image.clone(),
                )));

            if stage.upstream().is_none() {
                for _ in 0..count {
                    let item = runner.generate_fresh(&project, stage).await?;
                    println!("Generated {} '{}'", stage, item.title);
                }
            } else {
                let receipt = runner.trigger(&project, stage).await?;
                println!(
                    "Queued {} {} generation(s); {} approved item(s) already have {}s",
                    receipt.queued, stage, receipt.skipped, stage
                );
                if wait {
                    runner.wait_for_completion().await;
                    println!("Batch complete.");
                }
            }
        }

        Commands::Regenerate { project, stage, item } => {
            let stage = parse_stage(&stage)?;
            let provider = ProviderConfig::from_config(&config)?;
            let client = OpenRouterClient::new(provider);
            let generator = Arc::new(OpenRouterGenerator::new(client, config.models.clone()));
            let runner = studio.batch_runner(generator);
            let updated = runner.regenerate(&project, stage, &item).await?;
            println!("Regenerated '{}' (back to pending review)", updated.title);
        }
    }

    Ok(())
}

async fn review(
    studio: &Studio,
    project: &str,
    stage: &str,
    item: &str,
    status: ItemStatus,
    comment: Option<String>,
) -> Result<()> {
    let stage = parse_stage(stage)?;
    let (updated, entry) = studio
        .items
        .set_status(project, stage, item, status, comment)
        .await?;
    println!("Marked '{}' as {} (ledger entry {})", updated.title, updated.status, entry.id);
    Ok(())
}
