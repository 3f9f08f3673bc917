//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// PrintVendo kiosk CLI.
#[derive(Parser, Debug)]
#[command(name = "printvendo")]
#[command(author = "PrintVendo Contributors")]
#[command(version)]
#[command(about = "Drive a PrintVendo kiosk session against the shared mailbox")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Machine id, overriding the configured one.
    #[arg(short, long, global = true)]
    pub machine: Option<String>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // =========================================================================
    // Operator Commands
    // =========================================================================
    /// Provision the machine's mailbox folder.
    ///
    /// Creates `machine_<id>` with its standard subfolders in the store.
    /// Run once per kiosk, before the kiosk goes live.
    Provision,

    /// Delete every mailbox entry for the machine and reset the session.
    Cleanup,

    // =========================================================================
    // Session Commands
    // =========================================================================
    /// Run one full kiosk session: submit, generate, collect payment,
    /// prepare the deliverable, collect the print payment.
    Run {
        /// Prompt text. Reads stdin when neither this nor --file is given.
        #[arg(short, long)]
        prompt: Option<String>,

        /// Read the prompt from a file instead.
        #[arg(short, long, conflicts_with = "prompt")]
        file: Option<PathBuf>,

        /// Extracted document text to append to the prompt.
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Print in color (monochrome otherwise).
        #[arg(long)]
        color: bool,

        /// Keep a PDF copy of the deliverable (flat surcharge).
        #[arg(long)]
        save_pdf: bool,

        /// Client-rendered PDF bytes to attach to the deliverable.
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Stop after the completion payment; skip the print flow.
        #[arg(long)]
        skip_print: bool,
    },

    // =========================================================================
    // Read-back Commands
    // =========================================================================
    /// Show the machine's mailbox status: prompt, response, cost record.
    Status,

    /// Print the generated response, if one is ready.
    Response,

    /// Print the latest published cost record.
    Cost,
}
