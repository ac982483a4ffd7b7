// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the domain/engine layers and
//! provides:
//!
//! - **Entry point** - process lifecycle, exit code mapping
//! - **Platform abstraction** - OS-specific operations (POSIX vs Windows)
//! - **Signal handling** - graceful shutdown (SIGTERM, SIGINT, SIGHUP)
//! - **Argument parsing** - secure CLI argument validation
//!
//! ## Architecture Position
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │          BOOTSTRAP (this crate)              │
//! │  - Entry point                               │
//! │  - Platform abstraction                      │
//! │  - Signal handling                           │
//! │  - Secure arg parsing                        │
//! └─────────────────────────────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │       wayfarer-pipeline (engine crate)       │
//! │  - Application use cases (run/resume)        │
//! │  - Infrastructure (checkpoint store, stages)  │
//! └─────────────────────────────────────────────┘
//!                      ▼
//! ┌─────────────────────────────────────────────┐
//! │     wayfarer-pipeline-domain (domain crate)  │
//! │  - Entities, value objects, trait contracts  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Key Design Principles
//!
//! 1. **Separation from enterprise layers** - bootstrap can see the engine
//!    and domain crates; neither of them knows bootstrap exists.
//! 2. **Platform abstraction** - OS-specific functionality hides behind a
//!    trait, selected at compile time.
//! 3. **Graceful shutdown** - signal handlers feed a cancellation token the
//!    executor checks between stages.
//! 4. **Security first** - every argument is validated before it reaches
//!    the engine.
//!
//! ## Module Structure
//!
//! - `platform` - OS abstraction (Unix/Windows)
//! - `signals` - signal handling (SIGTERM, SIGINT, SIGHUP)
//! - `cli` - secure argument parsing
//! - `exit_code` - exit code enumeration
//! - `logger` - bootstrap-phase logging
//! - `shutdown` - shutdown coordination

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::{parse_and_validate, ValidatedCli, ValidatedCommand};
pub use exit_code::{map_error_to_exit_code, result_to_exit_code, ExitCode};

/// Parses and validates CLI arguments.
///
/// The caller is responsible for running the application logic and
/// mapping the result to an exit code with [`result_to_exit_code`].
///
/// # Errors
///
/// Returns `cli::ParseError` if CLI parsing or validation fails. Clap
/// handles `--help`/`--version` itself and exits the process directly.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
