// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface Module
//!
//! Bootstrap-layer CLI handling with security-first design.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  1. parser::parse()                 │  Parse CLI with clap
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  2. validator::validate()           │  Security validation
//! └─────────────────┬───────────────────┘
//!                   ↓
//! ┌─────────────────────────────────────┐
//! │  3. ValidatedCli                    │  Safe, validated config
//! └─────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `parser` - CLI structure and clap parsing
//! - `validator` - Security validation layer

pub mod parser;
pub mod validator;

pub use parser::{parse_cli, Cli, Commands};
pub use validator::{ParseError, SecureArgParser};

use std::path::PathBuf;

/// Validated CLI configuration: all arguments security-checked and
/// range-checked.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub command: ValidatedCommand,
    pub verbose: bool,
    pub config: Option<PathBuf>,
    pub root: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum ValidatedCommand {
    Run {
        session: PathBuf,
        dry_run: bool,
        stop_after_stage: Option<u8>,
        continue_on_error: bool,
    },
    Resume {
        session: PathBuf,
        source_run_id: String,
        from_stage: u8,
        stop_after_stage: Option<u8>,
        continue_on_error: bool,
    },
    ShowManifest {
        session: PathBuf,
        run_id: String,
    },
}

/// Parses CLI arguments with clap, then runs them through security and
/// range validation.
///
/// # Errors
///
/// Returns `ParseError` if any argument fails validation.
pub fn parse_and_validate() -> Result<ValidatedCli, ParseError> {
    let cli = parse_cli();
    validate_cli(cli)
}

fn validate_cli(cli: Cli) -> Result<ValidatedCli, ParseError> {
    let config = if let Some(ref path) = cli.config {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    let root = if let Some(ref path) = cli.root {
        SecureArgParser::validate_argument(&path.to_string_lossy())?;
        Some(path.clone())
    } else {
        None
    };

    let command = match cli.command {
        Commands::Run {
            session,
            dry_run,
            stop_after_stage,
            continue_on_error,
        } => {
            let validated_session = SecureArgParser::validate_path(&session.to_string_lossy())?;
            if let Some(stage) = stop_after_stage {
                SecureArgParser::validate_stage_number("stop-after-stage", stage)?;
            }
            ValidatedCommand::Run {
                session: validated_session,
                dry_run,
                stop_after_stage,
                continue_on_error,
            }
        }
        Commands::Resume {
            session,
            source_run_id,
            from_stage,
            stop_after_stage,
            continue_on_error,
        } => {
            let validated_session = SecureArgParser::validate_path(&session.to_string_lossy())?;
            SecureArgParser::validate_argument(&source_run_id)?;
            SecureArgParser::validate_stage_number("from-stage", from_stage)?;
            if let Some(stage) = stop_after_stage {
                SecureArgParser::validate_stage_number("stop-after-stage", stage)?;
            }
            ValidatedCommand::Resume {
                session: validated_session,
                source_run_id,
                from_stage,
                stop_after_stage,
                continue_on_error,
            }
        }
        Commands::ShowManifest { session, run_id } => {
            let validated_session = SecureArgParser::validate_path(&session.to_string_lossy())?;
            SecureArgParser::validate_argument(&run_id)?;
            ValidatedCommand::ShowManifest {
                session: validated_session,
                run_id,
            }
        }
    };

    Ok(ValidatedCli {
        command,
        verbose: cli.verbose,
        config,
        root,
    })
}
