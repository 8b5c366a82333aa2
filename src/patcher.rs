//! In-place mutation of shared libraries through the platform tools.
//!
//! Each mutation holds a [`WritableFile`] guard for the duration of the tool
//! call. Code signature removal has to come last: any later byte change would
//! invalidate a signature again.

use crate::host::{HostContext, Platform};
use crate::rpath::get_rpath;
use crate::tool::{
    execute_checked, filter_install_name_tool_stderr, Tool, ToolCommand, ToolRunner,
};
use crate::writable::WritableFile;
use crate::Error;
use camino::Utf8Path;
use tracing::info;

/// Remove the RPATH of `path`, if it declares one.
///
/// Binaries without an RPATH are left untouched, permissions included.
/// Only the entry reported by [`get_rpath`] is targeted on Mach-O.
pub fn remove_rpath(
    ctx: &HostContext,
    runner: &dyn ToolRunner,
    path: &Utf8Path,
) -> Result<(), Error> {
    let Some(rpath) = get_rpath(ctx, runner, path)? else {
        return Ok(());
    };

    if ctx.show_inclusion {
        info!(target: "inclusion", "Removing 'RPATH' setting '{}' from '{}'.", rpath, path);
    }

    let _writable = WritableFile::acquire(path)?;

    match ctx.platform {
        Platform::MacOs => {
            let command = ToolCommand::new(Tool::InstallNameTool).args([
                "-delete_rpath",
                rpath.as_str(),
                path.as_str(),
            ]);
            execute_checked(runner, &command, Some(filter_install_name_tool_stderr))?;
        }
        Platform::Windows | Platform::Alpine | Platform::Posix => {
            let command = ToolCommand::new(Tool::Chrpath).args(["-d", path.as_str()]);
            execute_checked(runner, &command, None)?;
        }
    }

    Ok(())
}

/// Rewrite Mach-O load paths and optionally add an rpath, in one
/// `install_name_tool` call.
///
/// `mapping` holds `(old, new)` load path pairs. `new_rpath` is added as
/// `<dir>/.`.
pub fn rewrite_install_names(
    ctx: &HostContext,
    runner: &dyn ToolRunner,
    path: &Utf8Path,
    mapping: &[(String, String)],
    new_rpath: Option<&Utf8Path>,
) -> Result<(), Error> {
    require_macos(ctx, "install name rewriting")?;

    let mut command = ToolCommand::new(Tool::InstallNameTool);
    for (old_path, new_path) in mapping {
        command = command.args(["-change", old_path.as_str(), new_path.as_str()]);
    }
    if let Some(rpath) = new_rpath {
        command = command.arg("-add_rpath").arg(rpath.join(".").into_string());
    }
    command = command.arg(path.as_str());

    let _writable = WritableFile::acquire(path)?;
    execute_checked(runner, &command, Some(filter_install_name_tool_stderr))?;

    Ok(())
}

/// Remove the code signature of a Mach-O binary.
pub fn strip_code_signature(
    ctx: &HostContext,
    runner: &dyn ToolRunner,
    path: &Utf8Path,
) -> Result<(), Error> {
    require_macos(ctx, "code signature removal")?;

    let command = ToolCommand::new(Tool::Codesign).args(["--remove-signature", path.as_str()]);

    let _writable = WritableFile::acquire(path)?;
    execute_checked(runner, &command, None)?;

    Ok(())
}

fn require_macos(ctx: &HostContext, operation: &'static str) -> Result<(), Error> {
    match ctx.platform {
        Platform::MacOs => Ok(()),
        platform => Err(Error::UnsupportedPlatform {
            operation,
            platform,
        }),
    }
}
