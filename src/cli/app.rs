//! Main CLI application structure

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use super::output::{Output, OutputFormat};
use super::query::{self, FilterArgs};
use super::task;
use crate::domain::{Priority, SortField};
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "deck")]
#[command(author, version, about = "Immutable task tracking from the command line")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, then text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable debug logging on stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new taskdeck project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(long, short)]
        description: Option<String>,

        /// low, medium, high or urgent
        #[arg(long, short)]
        priority: Option<Priority>,

        /// Tag (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = query::parse_date)]
        due: Option<DateTime<Utc>>,
    },

    /// List tasks matching the filters
    List {
        #[command(flatten)]
        filter: FilterArgs,

        /// Sort field: createdAt, dueDate, priority, title, status
        #[arg(long)]
        sort: Option<SortField>,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Show task details
    Show {
        /// Task ID
        id: String,
    },

    /// Mark task as in progress
    Start {
        /// Task ID
        id: String,
    },

    /// Mark task as completed
    Done {
        /// Task ID
        id: String,
    },

    /// Cancel a task
    Cancel {
        /// Task ID
        id: String,
    },

    /// Edit task fields
    Edit {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long, short)]
        description: Option<String>,

        #[arg(long, short)]
        priority: Option<Priority>,

        /// Replaces all tags (repeatable)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// New due date (RFC 3339 or YYYY-MM-DD)
        #[arg(long, value_parser = query::parse_date, conflicts_with = "clear_due")]
        due: Option<DateTime<Utc>>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },

    /// Remove a task
    Remove {
        /// Task ID
        id: String,
    },

    /// Show statistics for all tasks and for the filtered view
    Stats {
        #[command(flatten)]
        filter: FilterArgs,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => default_format(),
    };
    let output = Output::new(format);

    tracing::debug!("deck starting");

    match cli.command {
        Commands::Init { path } => {
            tracing::debug!(%path, "initializing project");
            let project = Project::init(&path)?;
            tracing::debug!(dir = %project.deck_dir().display(), "created project directory");
            output.success(&format!(
                "Initialized taskdeck project at {}",
                project.root().display()
            ));
        }

        Commands::Add {
            title,
            description,
            priority,
            tags,
            due,
        } => task::add(
            &output,
            task::AddArgs {
                title,
                description,
                priority,
                tags,
                due,
            },
        )?,
        Commands::List { filter, sort, desc } => task::list(&output, filter, sort, desc)?,
        Commands::Show { id } => task::show(&output, &id)?,
        Commands::Start { id } => task::start(&output, &id)?,
        Commands::Done { id } => task::complete(&output, &id)?,
        Commands::Cancel { id } => task::cancel(&output, &id)?,
        Commands::Edit {
            id,
            title,
            description,
            priority,
            tags,
            due,
            clear_due,
        } => task::edit(
            &output,
            &id,
            task::EditArgs {
                title,
                description,
                priority,
                tags,
                due,
                clear_due,
            },
        )?,
        Commands::Remove { id } => task::remove(&output, &id)?,

        Commands::Stats { filter } => query::stats(&output, filter)?,
    }

    Ok(())
}

/// Installs the stderr log subscriber; `RUST_LOG` wins over `--verbose`
fn init_logging(verbose: bool) {
    let default = if verbose { "taskdeck=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be set when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn default_format() -> OutputFormat {
    match Config::load() {
        Ok(config) => config.global.default_format.into(),
        Err(e) => {
            let message = format!("{:#}", e);
            tracing::debug!(error = %message, "using text output");
            OutputFormat::Text
        }
    }
}
