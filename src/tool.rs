//! External tool invocation.
//!
//! Every subprocess goes through a [`ToolRunner`], so the parsing and patching
//! logic can be exercised against canned output without the real tools.

use crate::Error;
use std::fmt;
use std::io;
use std::process::Command;
use tracing::debug;

/// The external tools this crate knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Ldconfig,
    Readelf,
    Otool,
    Chrpath,
    InstallNameTool,
    Codesign,
}

impl Tool {
    pub fn program(self) -> &'static str {
        match self {
            Tool::Ldconfig => "/sbin/ldconfig",
            Tool::Readelf => "readelf",
            Tool::Otool => "otool",
            Tool::Chrpath => "chrpath",
            Tool::InstallNameTool => "install_name_tool",
            Tool::Codesign => "codesign",
        }
    }

    /// Fixed explanation of why the tool is needed, shown when it is missing.
    pub fn usage(self) -> &'static str {
        match self {
            Tool::Ldconfig => {
                "The 'ldconfig' is used to analyse dependencies on ELF using systems and required to be found."
            }
            Tool::Readelf => {
                "The 'readelf' is used to analyse dependencies on ELF using systems and required to be found."
            }
            Tool::Otool => {
                "The 'otool' is used to analyse dependencies on macOS and required to be found."
            }
            Tool::Chrpath => {
                "It is required due to 'RPATH' settings in used shared libraries that need to be removed."
            }
            Tool::InstallNameTool => {
                "The 'install_name_tool' is used to make binaries portable on macOS and required to be found."
            }
            Tool::Codesign => {
                "The 'codesign' is used to remove invalidated signatures on macOS and required to be found."
            }
        }
    }
}

/// A single tool invocation: program plus argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool.program())?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished tool process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    pub fn success(stdout: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: Vec::new(),
        }
    }

    pub fn failure(code: i32, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            code: Some(code),
            stdout: Vec::new(),
            stderr: stderr.into(),
        }
    }
}

/// Capability to run a tool to completion and capture its output.
///
/// Implementations report a missing program as `io::ErrorKind::NotFound`.
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput>;
}

/// Runs tools as real subprocesses, blocking until they exit.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        let output = Command::new(command.tool.program())
            .args(&command.args)
            .output()?;

        Ok(ToolOutput {
            code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

/// Post-processing applied to stderr before it is judged.
pub type StderrFilter = fn(&[u8]) -> Vec<u8>;

/// Run a tool and return its stdout.
///
/// A missing program yields [`Error::ToolMissing`] with the tool's usage text.
/// A non-zero exit, or any stderr left over after `stderr_filter`, yields
/// [`Error::ToolFailed`].
pub fn execute_checked(
    runner: &dyn ToolRunner,
    command: &ToolCommand,
    stderr_filter: Option<StderrFilter>,
) -> Result<Vec<u8>, Error> {
    debug!(target: "postprocessing", "Running '{}'", command);

    let output = match runner.run(command) {
        Ok(output) => output,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::ToolMissing {
                tool: command.tool.program(),
                usage: command.tool.usage(),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let stderr = match stderr_filter {
        Some(filter) => filter(&output.stderr),
        None => output.stderr,
    };

    if output.code != Some(0) || !stderr.is_empty() {
        return Err(Error::ToolFailed {
            command: command.to_string(),
            code: output.code,
            stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Drop the benign `install_name_tool` warning about invalidated signatures,
/// along with empty lines.
pub fn filter_install_name_tool_stderr(stderr: &[u8]) -> Vec<u8> {
    const BENIGN: &[u8] = b"invalidate the code signature";

    let kept: Vec<&[u8]> = stderr
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .filter(|line| !line.windows(BENIGN.len()).any(|w| w == BENIGN))
        .collect();

    kept.join(&b'\n')
}
