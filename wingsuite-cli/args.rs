use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Wingsuite console CLI.
#[derive(Debug, Parser)]
#[command(author, version, bin_name = "wingsuite-cli")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Console server base URL.
    #[arg(long, global = true, default_value = "http://127.0.0.1:8600")]
    pub server: String,

    /// Where the session token is kept between invocations.
    #[arg(long = "session-file", global = true)]
    pub session_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and store the session token.
    Login {
        identifier: String,
        /// Password; prompted on stdin when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the signed-in account.
    Whoami,
    /// List content folders, or one folder's files.
    Folders {
        folder: Option<String>,
    },
    /// List knowledge documents.
    Documents,
    /// Show credit usage.
    Credits,
    /// Watch an execution until it finishes.
    Watch {
        execution_id: String,
        /// Poll interval in milliseconds.
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
    },
    /// Interactive edit loop for one document.
    Edit {
        file_id: String,
        #[arg(long, default_value = "editor")]
        persona: String,
        /// `edit` proposes rewrites, `feedback` only comments.
        #[arg(long, default_value = "edit")]
        mode: String,
    },
}
