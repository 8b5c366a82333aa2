//! Reading the RPATH of ELF and Mach-O binaries.
//!
//! Only the first RPATH/RUNPATH entry is reported. A binary carrying several
//! independent entries is treated as "has one"; see [`crate::patcher::remove_rpath`].

use crate::host::{HostContext, Platform};
use crate::tool::{execute_checked, Tool, ToolCommand, ToolRunner};
use crate::Error;
use camino::Utf8Path;

/// Return the first RPATH/RUNPATH declared by `path`, if any.
pub fn get_rpath(
    ctx: &HostContext,
    runner: &dyn ToolRunner,
    path: &Utf8Path,
) -> Result<Option<String>, Error> {
    match ctx.platform {
        Platform::MacOs => {
            let command = ToolCommand::new(Tool::Otool).args(["-l", path.as_str()]);
            parse_otool_rpath(&execute_checked(runner, &command, None)?)
        }
        Platform::Windows | Platform::Alpine | Platform::Posix => {
            let command = ToolCommand::new(Tool::Readelf).args(["-d", path.as_str()]);
            parse_readelf_rpath(&execute_checked(runner, &command, None)?)
        }
    }
}

/// Extract the bracketed value of the first `RPATH`/`RUNPATH` row of
/// `readelf -d` output.
///
/// ```text
///  0x000000000000000f (RPATH)              Library rpath: [$ORIGIN/../lib]
///  0x000000000000001d (RUNPATH)            Library runpath: [/opt/lib]
/// ```
pub fn parse_readelf_rpath(output: &[u8]) -> Result<Option<String>, Error> {
    for line in output.split(|&b| b == b'\n') {
        if !contains(line, b"RPATH") && !contains(line, b"RUNPATH") {
            continue;
        }

        let start = line.iter().position(|&b| b == b'[');
        let end = line.iter().rposition(|&b| b == b']');

        // A tagged row without a bracketed value carries nothing to report
        if let (Some(start), Some(end)) = (start, end) {
            if start < end {
                return Ok(Some(String::from_utf8(line[start + 1..end].to_vec())?));
            }
        }
    }

    Ok(None)
}

/// Extract the path of the first `LC_RPATH` load command of `otool -l` output.
///
/// ```text
/// Load command 14
///           cmd LC_RPATH
///       cmdsize 32
///          path @loader_path/../lib (offset 12)
/// ```
pub fn parse_otool_rpath(output: &[u8]) -> Result<Option<String>, Error> {
    let mut cmd: &[u8] = b"";
    let mut last_was_load_command = false;

    for line in output.split(|&b| b == b'\n') {
        let line = line.trim_ascii();

        if cmd == b"LC_RPATH" {
            if let Some(rest) = line.strip_prefix(b"path ") {
                let value = match rest.iter().rposition(|&b| b == b'(') {
                    Some(paren) => rest[..paren].trim_ascii_end(),
                    None => rest,
                };
                return Ok(Some(String::from_utf8(value.to_vec())?));
            }
        }

        if last_was_load_command && line.starts_with(b"cmd ") {
            cmd = line
                .split(|b| b.is_ascii_whitespace())
                .filter(|word| !word.is_empty())
                .nth(1)
                .unwrap_or(b"");
        }

        last_was_load_command = line.starts_with(b"Load command");
    }

    Ok(None)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}
