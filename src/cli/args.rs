//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::domain::{ConflictPolicy, SortMode};

/// Merge markdown notes from a vault into a single document
#[derive(Parser, Debug)]
#[command(name = "notemerge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Vault directory (default: config or cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub vault: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge notes into one document
    Merge {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output name, relative to the vault (.md appended if missing)
        #[arg(short, long)]
        output: Option<String>,

        /// Text between notes (escapes: \n \t \\)
        #[arg(long)]
        separator: Option<String>,

        /// Insert note names as headings of this level (1-6)
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=6), conflicts_with = "no_headings")]
        headings: Option<u8>,

        /// Do not insert headings, even if configured
        #[arg(long)]
        no_headings: bool,

        /// When the output exists: rename, overwrite or fail
        #[arg(long)]
        on_conflict: Option<ConflictPolicy>,

        /// Print the merged document instead of writing it
        #[arg(long)]
        stdout: bool,

        /// Show what would be written without writing
        #[arg(short = 'n', long, conflicts_with = "stdout")]
        dry_run: bool,
    },

    /// List notes in merge order
    List {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Show selection as tree, annotated with merge positions
    Tree {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which notes to merge and in what order.
#[derive(Args, Debug, Clone, Default)]
pub struct SelectionArgs {
    /// Notes and folders, relative to the vault
    #[arg(value_hint = ValueHint::AnyPath)]
    pub paths: Vec<PathBuf>,

    /// Pick folders interactively (fzf)
    #[arg(long, conflicts_with = "paths")]
    pub select: bool,

    /// alphabetical, creation-date or logical
    #[arg(short, long)]
    pub sort: Option<SortMode>,

    /// Include notes of sub-folders
    #[arg(short = 'r', long, conflicts_with = "no_nested")]
    pub nested: bool,

    /// Only direct notes of selected folders
    #[arg(long)]
    pub no_nested: bool,

    /// Index note defining logical order
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub order_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Create config template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show config paths
    Path,

    /// Edit config file
    Edit {
        /// Edit global config
        #[arg(short, long)]
        global: bool,
    },
}
