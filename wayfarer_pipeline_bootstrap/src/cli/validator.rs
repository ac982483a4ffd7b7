// /////////////////////////////////////////////////////////////////////////////
// Wayfarer Discovery Pipeline
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! # Secure Argument Validation
//!
//! Every string/path that reaches the engine from the command line passes
//! through here first: paths are canonicalized and checked for traversal
//! attempts, free-text arguments are checked against a small deny-list of
//! shell-metacharacter patterns. This is defense in depth, not a parser -
//! `clap` already rejects malformed flag syntax.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    #[error("invalid value for --{arg}: {reason}")]
    InvalidValue { arg: String, reason: String },

    #[error("path does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("path failed security validation: {0}")]
    UnsafePath(String),

    #[error("argument contains disallowed characters: {0}")]
    UnsafeArgument(String),
}

/// Deny-listed substrings that have no legitimate place in a session path,
/// run id, or pipeline argument - shell metacharacters and path traversal
/// markers.
const DENYLIST: &[&str] = &["..", ";", "|", "&", "$(", "`", "\n", "\0"];

pub struct SecureArgParser;

impl SecureArgParser {
    /// Validates a path that is expected to already exist: canonicalizes it
    /// (resolving symlinks and `..` segments) and rejects anything that
    /// fails to resolve.
    pub fn validate_path(raw: &str) -> Result<PathBuf, ParseError> {
        Self::validate_argument(raw)?;
        let path = Path::new(raw);
        path.canonicalize().map_err(|_| ParseError::PathNotFound(path.to_path_buf()))
    }

    /// Validates a free-text argument (including paths that may not exist
    /// yet, such as output paths) against the metacharacter deny-list.
    pub fn validate_argument(raw: &str) -> Result<(), ParseError> {
        if raw.is_empty() {
            return Err(ParseError::UnsafeArgument("argument is empty".into()));
        }
        for pattern in DENYLIST {
            if raw.contains(pattern) {
                return Err(ParseError::UnsafeArgument(format!("contains disallowed sequence '{pattern}'")));
            }
        }
        Ok(())
    }

    /// Validates a stage number against the fixed 0..=10 pipeline range.
    pub fn validate_stage_number(arg_name: &str, value: u8) -> Result<u8, ParseError> {
        if value > 10 {
            return Err(ParseError::InvalidValue {
                arg: arg_name.to_string(),
                reason: "must be between 0 and 10".to_string(),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_sequences() {
        assert!(SecureArgParser::validate_argument("../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(SecureArgParser::validate_argument("session; rm -rf /").is_err());
        assert!(SecureArgParser::validate_argument("$(whoami)").is_err());
    }

    #[test]
    fn accepts_plain_identifiers() {
        assert!(SecureArgParser::validate_argument("2026-07-27-kyoto-trip").is_ok());
    }

    #[test]
    fn stage_number_range_is_enforced() {
        assert!(SecureArgParser::validate_stage_number("from-stage", 10).is_ok());
        assert!(SecureArgParser::validate_stage_number("from-stage", 11).is_err());
    }
}
