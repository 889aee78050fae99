//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Medical Research Synthesizer console
#[derive(Parser)]
#[command(name = "mrs")]
#[command(about = "Evidence briefs for clinical questions, with cited sources", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Answer from the research backend instead of demo fixtures (overrides $MRS_LIVE)
    #[arg(long, global = true)]
    pub live: bool,

    /// Backend base URL (overrides $MRS_API_BASE_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Subcommand (if not provided, starts the interactive shell)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question and print the brief
    Ask {
        /// The clinical question
        question: Vec<String>,

        #[command(flatten)]
        filters: FilterArgs,

        /// Print an export instead of the brief
        #[arg(long, value_enum)]
        export: Option<ExportFormat>,
    },

    /// Run a suggested question by label (e.g. "SGLT2 in CKD")
    Suggest {
        label: Vec<String>,

        #[arg(long, value_enum)]
        export: Option<ExportFormat>,
    },

    /// Run a query template by id (e.g. "limitations-only")
    Template {
        id: String,

        #[arg(long, value_enum)]
        export: Option<ExportFormat>,
    },

    /// Run the built-in demo question
    Demo {
        #[arg(long, value_enum)]
        export: Option<ExportFormat>,
    },

    /// List research sessions and their history entries
    Sessions,

    /// Re-run a history entry by id
    Rerun {
        entry_id: String,

        #[arg(long, value_enum)]
        export: Option<ExportFormat>,
    },

    /// Upload a document to the research backend
    Upload {
        /// PDF, TXT or DOCX file
        file: PathBuf,

        #[command(flatten)]
        metadata: MetadataArgs,
    },

    /// List indexed documents
    Documents,

    /// Show backend dependency health
    Health,

    /// Show pipeline latency metrics
    Metrics,

    /// Show or change saved preferences
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommands>,
    },

    /// Start the interactive shell
    Shell,
}

#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Set the theme, or toggle it when no value is given
    Theme {
        #[arg(value_enum)]
        value: Option<ThemeArg>,
    },

    /// Show the guided tour again on the next shell start
    ResetTour,
}

#[derive(clap::Args, Default)]
pub struct FilterArgs {
    /// Maximum number of sources (default 10)
    #[arg(long)]
    pub max_results: Option<String>,

    #[arg(long)]
    pub start_year: Option<i32>,

    #[arg(long)]
    pub end_year: Option<i32>,

    /// Comma-separated journal names
    #[arg(long, default_value = "")]
    pub journals: String,
}

#[derive(clap::Args)]
pub struct MetadataArgs {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub authors: Option<String>,

    #[arg(long)]
    pub journal: Option<String>,

    #[arg(long)]
    pub year: Option<i32>,

    #[arg(long)]
    pub doi: Option<String>,

    #[arg(long)]
    pub url: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Markdown,
    References,
    Answer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Dark,
    Light,
}
