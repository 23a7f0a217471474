//! CLI command and subcommand definitions

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// mdpad CLI
#[derive(Parser, Debug)]
#[command(name = "mdpadctl")]
#[command(version, about = "CLI client for mdpad collaborative markdown servers", long_about = None)]
pub struct Cli {
    /// Server URL (overrides config file and environment)
    #[arg(short, long)]
    pub server: Option<String>,

    /// Cookie file path (overrides config file and environment)
    #[arg(long)]
    pub cookie_file: Option<PathBuf>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Don't load config file
    #[arg(long)]
    pub no_config: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Table,
    /// JSON output
    Json,
}

/// Authentication backend for `login`
#[derive(Debug, Clone, clap::ValueEnum)]
pub enum LoginMethod {
    /// Email and password against `/login`
    Email,
    /// LDAP credentials against `/auth/ldap`
    Ldap,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a local markdown file as a new note
    Import {
        /// Path of the markdown file to upload
        path: PathBuf,

        /// Create the note under this identifier instead of a random one
        note_id: Option<String>,
    },

    /// Publish a note and print its public identifier
    Publish {
        /// Private note identifier
        note_id: String,
    },

    /// Export a note in one of four formats
    Export {
        #[command(flatten)]
        variant: ExportVariant,

        /// Note identifier
        note_id: String,

        /// Output path (defaults to `<note_id>.<ext>`)
        output: Option<PathBuf>,
    },

    /// Remove a note from the account history
    Delete {
        /// Note identifier
        note_id: String,
    },

    /// Log in and persist the session cookies
    Login {
        /// Authentication method
        #[arg(value_enum)]
        method: LoginMethod,

        /// User name or email (prompted when omitted)
        user: Option<String>,

        /// Password (prompted, unechoed, when omitted)
        password: Option<String>,
    },

    /// Log out on the server and delete the local session
    Logout,

    /// Show the logged-in user's profile and local paths
    Profile,

    /// List the account's note history
    History,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Export variant selection; exactly one must be given.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct ExportVariant {
    /// Raw markdown source
    #[arg(long)]
    pub md: bool,

    /// Server-rendered PDF
    #[arg(long)]
    pub pdf: bool,

    /// Standalone HTML page (publishes the note first)
    #[arg(long)]
    pub html: bool,

    /// Slide deck mirrored into a zip archive
    #[arg(long)]
    pub slides: bool,
}
