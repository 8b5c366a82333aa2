// Error types for sharedlibs
use crate::host::Platform;
use camino::Utf8PathBuf;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Binary parsing error: {0}")]
    Goblin(#[from] goblin::error::Error),

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Invalid UTF-8 in path")]
    InvalidPathUtf8,

    /// A required external tool could not be started.
    #[error("Error, needs '{tool}' on your system. {usage}")]
    ToolMissing {
        tool: &'static str,
        usage: &'static str,
    },

    /// A tool ran but exited non-zero or left stderr output behind.
    #[error("Error, call to '{command}' failed ({}): {stderr}", exit_code_display(.code))]
    ToolFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The input belongs to a class of binaries the logic was never meant to see.
    #[error("Assumption violated for '{path}': {message}")]
    Assumption { path: Utf8PathBuf, message: String },

    #[error("'{operation}' is not supported on {platform}")]
    UnsupportedPlatform {
        operation: &'static str,
        platform: Platform,
    },

    /// The file could not be read as a PE image at all.
    #[error("Not a PE image '{path}': {message}")]
    InvalidImage { path: Utf8PathBuf, message: String },

    #[error("PE resource error: {0}")]
    Resource(String),
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}
