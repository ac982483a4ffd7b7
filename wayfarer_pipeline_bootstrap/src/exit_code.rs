// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Process Exit Codes
//!
//! Maps pipeline outcomes onto the BSD `sysexits.h` convention so shell
//! callers and CI pipelines can distinguish usage errors from data errors
//! from transient/internal failures without parsing stderr.

/// Standard Unix exit codes (subset of `sysexits.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    /// EX_USAGE - command line usage error.
    Usage = 64,
    /// EX_DATAERR - input data was incorrect in some way.
    DataErr = 65,
    /// EX_NOINPUT - input file did not exist or was unreadable.
    NoInput = 66,
    /// EX_UNAVAILABLE - a required service/resource was unavailable.
    Unavailable = 69,
    /// EX_SOFTWARE - internal software error.
    Software = 70,
    /// EX_IOERR - an I/O error occurred.
    IoErr = 74,
    /// EX_TEMPFAIL - temporary failure, the caller may retry.
    TempFail = 75,
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

/// Maps a `PipelineError` category (see `wayfarer_pipeline_domain::error`)
/// onto the closest exit code.
pub fn map_error_to_exit_code(category: &str) -> ExitCode {
    match category {
        "configuration" => ExitCode::Usage,
        "checkpoint" | "validation" | "integrity" => ExitCode::DataErr,
        "io" => ExitCode::IoErr,
        "external" | "circuit" | "resource" | "timeout" => ExitCode::TempFail,
        "session" => ExitCode::NoInput,
        "cancellation" => ExitCode::Ok,
        _ => ExitCode::Software,
    }
}

/// Converts a `Result` into a process exit code, printing the error to
/// stderr when present.
pub fn result_to_exit_code<E: std::fmt::Display>(result: Result<(), E>) -> std::process::ExitCode {
    match result {
        Ok(()) => std::process::ExitCode::from(ExitCode::Ok),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::ExitCode::from(ExitCode::Software)
        }
    }
}
