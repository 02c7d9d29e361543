use crate::logging::LogFormat;
use clap::{ArgAction, Args, Parser, Subcommand};
use codemap_kernel::MapStatus;
use codemap_store::{Relationship, TaskType};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "codemap",
    about = "Codemap: row specifications, task assignment and mapping workflow over a JSONL store",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Path to codemap.toml (default: ./codemap.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the store JSONL (overrides [store].path)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format (overrides [logging].format)
    #[arg(long, value_enum, global = true)]
    pub log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse, normalize and subtract row specifications
    Spec {
        #[command(subcommand)]
        command: SpecCommands,
    },

    /// Assign, inspect and delete tasks
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// List, save and reconcile rows, and edit their targets
    Row {
        #[command(subcommand)]
        command: RowCommands,
    },
}

#[derive(Subcommand)]
pub enum SpecCommands {
    /// Normalize a specification against a code-set size
    Normalize {
        /// Row specification, e.g. `5,4,5-10` or `*`
        spec: String,

        /// Code-set size (largest valid row index)
        #[arg(long)]
        limit: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the rows of other specifications from a specification
    Subtract {
        /// Base row specification
        spec: String,

        /// Code-set size (largest valid row index)
        #[arg(long)]
        limit: u64,

        /// Specification whose rows are removed (repeatable)
        #[arg(long = "remove")]
        remove: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Create or rebind a task over a row specification
    Assign {
        /// Map the task belongs to
        #[arg(long)]
        map: u64,

        /// Task type: author, review or reconcile
        #[arg(long = "type")]
        task_type: TaskType,

        /// User who will own the task
        #[arg(long)]
        assignee: String,

        /// Row specification to bind
        #[arg(long)]
        rows: String,

        /// Existing task to rebind
        #[arg(long)]
        task: Option<u64>,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// Let the assignee hold author and reviewer roles on the same rows
        #[arg(long)]
        allow_author_and_reviewer: bool,

        /// Take rows away from tasks of the same type
        #[arg(long)]
        reassign: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the specification of the rows bound to a task
    Spec {
        /// Task ID
        id: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Unbind and delete a task
    Delete {
        /// Task ID
        id: u64,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the tasks of a map
    List {
        /// Map ID
        #[arg(long)]
        map: u64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum RowCommands {
    /// List rows of a map
    List {
        /// Map ID
        #[arg(long)]
        map: u64,

        /// Row specification to select
        #[arg(long, default_value = "*")]
        rows: String,

        /// Only rows in this status
        #[arg(long)]
        status: Option<MapStatus>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a row's status, no-map flag or notes
    Save {
        /// Row ID
        id: u64,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// New status
        #[arg(long)]
        status: Option<MapStatus>,

        /// Set or clear no-map
        #[arg(long)]
        no_map: Option<bool>,

        /// Append a note
        #[arg(long)]
        note: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile a dual-mapped row with its sibling
    Reconcile {
        /// Row ID
        id: u64,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add, update or delete a row's targets
    Target {
        #[command(subcommand)]
        command: TargetCommands,
    },
}

#[derive(Subcommand)]
pub enum TargetCommands {
    /// Add a target to a row
    Add {
        /// Row ID
        row: u64,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// Target code
        #[arg(long)]
        code: String,

        /// Target display text
        #[arg(long, default_value = "")]
        display: String,

        /// equivalent, narrower, broader or inexact
        #[arg(long, default_value = "equivalent")]
        relationship: Relationship,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a target's content or flag
    Update {
        /// Row ID
        row: u64,

        /// Target ID
        target: Uuid,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// New target code
        #[arg(long)]
        code: Option<String>,

        /// New display text
        #[arg(long)]
        display: Option<String>,

        /// New relationship
        #[arg(long)]
        relationship: Option<Relationship>,

        /// Set or clear the review flag
        #[arg(long)]
        flagged: Option<bool>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a target from a row
    Delete {
        /// Row ID
        row: u64,

        /// Target ID
        target: Uuid,

        /// Acting user
        #[arg(long)]
        actor: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
