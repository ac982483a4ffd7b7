// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Structure
//!
//! `clap`-derived argument structure. Kept intentionally thin: the full
//! product-grade CLI front-end is an external collaborator, this is just
//! enough surface to drive the engine for runs, resumes, and manifest
//! inspection.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "wayfarer", version, about = "Travel-discovery pipeline runner")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose (debug-level) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a RunConfig TOML file. Defaults layer under CLI flags.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Root data directory. Overrides WAYFARER_ROOT and the config file.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run all eleven stages for a session from scratch.
    Run {
        /// Path to the session JSON file.
        session: PathBuf,

        /// Plan only; perform no stage I/O.
        #[arg(long)]
        dry_run: bool,

        /// Stop after this stage number (0-10) instead of running to completion.
        #[arg(long)]
        stop_after_stage: Option<u8>,

        /// Record stage failures in the manifest and continue with degraded input
        /// instead of aborting the run.
        #[arg(long)]
        continue_on_error: bool,
    },

    /// Resume a previous run starting from a given stage.
    Resume {
        /// Path to the session JSON file.
        session: PathBuf,

        /// The run id to resume from.
        source_run_id: String,

        /// Stage number (0-10) to resume execution at.
        from_stage: u8,

        #[arg(long)]
        stop_after_stage: Option<u8>,

        #[arg(long)]
        continue_on_error: bool,
    },

    /// Print a previously written run manifest.
    ShowManifest {
        /// Path to the session JSON file.
        session: PathBuf,

        /// The run id whose manifest should be displayed.
        run_id: String,
    },
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
