mod common;

use camino::{Utf8Path, Utf8PathBuf};
use common::{utf8_temp_file, FakeRunner};
use sharedlibs::{
    HostContext, LibraryLoader, Platform, SearchPaths, SystemLoader, Tool, ToolOutput,
};
use std::sync::Mutex;

const LDCONFIG: &str = "3 libs found in cache `/etc/ld.so.cache'
\tlibssl.so.3 (libc6,x86-64) => /usr/lib/x86_64-linux-gnu/libssl.so.3
\tlibffi.so.8 (libc6,x86-64) => /usr/lib/x86_64-linux-gnu/libffi.so.8
\tlibffi.so.7 (libc6,x86-64) => /usr/lib/x86_64-linux-gnu/libffi.so.7
";

// Search variables are process-wide
static ENV: Mutex<()> = Mutex::new(());

/// Run `f` with `variable` pointing at `dirs`, then restore the old value.
fn with_search_path<T>(variable: &str, dirs: &[&Utf8Path], f: impl FnOnce() -> T) -> T {
    let _guard = ENV.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let previous = std::env::var_os(variable);

    std::env::set_var(variable, std::env::join_paths(dirs).unwrap());
    let result = f();

    match previous {
        Some(value) => std::env::set_var(variable, value),
        None => std::env::remove_var(variable),
    }
    result
}

fn host(platform: Platform) -> HostContext {
    HostContext::builder().platform(platform).build()
}

fn ldconfig_runner() -> FakeRunner {
    FakeRunner::new(|command| match command.tool {
        Tool::Ldconfig => Ok(ToolOutput::success(LDCONFIG)),
        other => panic!("unexpected {:?}", other),
    })
}

fn utf8_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
}

#[test]
fn posix_takes_first_cache_row_with_library_prefix() {
    let runner = ldconfig_runner();

    let found = SystemLoader.find_library(&host(Platform::Posix), &runner, "ffi").unwrap();
    assert_eq!(found.as_deref(), Some("libffi.so.8"));

    // "libss.so" is not a prefix of "libssl.so.3"
    let empty = tempfile::tempdir().unwrap();
    let found = with_search_path("LD_LIBRARY_PATH", &[&utf8_dir(&empty)], || {
        SystemLoader.find_library(&host(Platform::Posix), &runner, "ss").unwrap()
    });
    assert_eq!(found, None);
}

#[test]
fn posix_falls_back_to_library_path_without_ldconfig() {
    let dir = tempfile::tempdir().unwrap();
    utf8_temp_file(&dir, "libfoo.so.2", b"elf");
    let first = utf8_temp_file(&dir, "libfoo.so.1", b"elf");
    utf8_temp_file(&dir, "libfoobar.so", b"elf");

    let runner = FakeRunner::without_tools();
    let found = with_search_path("LD_LIBRARY_PATH", &[&utf8_dir(&dir)], || {
        SystemLoader.find_library(&host(Platform::Posix), &runner, "foo").unwrap()
    });

    assert_eq!(found, Some(first.into_string()));
    assert_eq!(runner.calls().len(), 1);
}

#[test]
fn posix_falls_back_to_library_path_when_ldconfig_fails() {
    let missing = tempfile::tempdir().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let library = utf8_temp_file(&dir, "libcustom.so", b"elf");

    let runner = FakeRunner::new(|_| Ok(ToolOutput::failure(1, "ldconfig: cache unreadable")));
    let dirs = [utf8_dir(&missing).join("gone"), utf8_dir(&dir)];
    let found = with_search_path("LD_LIBRARY_PATH", &[&dirs[0], &dirs[1]], || {
        SystemLoader.find_library(&host(Platform::Posix), &runner, "custom").unwrap()
    });

    assert_eq!(found, Some(library.into_string()));
}

#[test]
fn posix_cache_miss_also_searches_library_path() {
    let dir = tempfile::tempdir().unwrap();
    let library = utf8_temp_file(&dir, "libpython3.12.so.1.0", b"elf");

    let runner = ldconfig_runner();
    let found = with_search_path("LD_LIBRARY_PATH", &[&utf8_dir(&dir)], || {
        SystemLoader.find_library(&host(Platform::Posix), &runner, "python3.12").unwrap()
    });

    assert_eq!(found, Some(library.into_string()));
}

#[test]
fn alpine_walk_reports_the_file_name() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_dir(&temp);
    std::fs::create_dir_all(root.join("nested")).unwrap();
    std::fs::write(root.join("nested/libffi.so.8.1.2"), b"elf").unwrap();

    let ctx = HostContext::builder()
        .platform(Platform::Alpine)
        .library_dirs(SearchPaths::new(vec![root.join("missing"), root]))
        .build();

    let runner = FakeRunner::without_tools();
    let found = SystemLoader.find_library(&ctx, &runner, "ffi").unwrap();
    assert_eq!(found.as_deref(), Some("libffi.so.8.1.2"));
    assert_eq!(SystemLoader.find_library(&ctx, &runner, "ssl").unwrap(), None);
    assert!(runner.calls().is_empty());
}

#[test]
fn macos_tries_dylib_and_framework_candidates() {
    let dir = tempfile::tempdir().unwrap();
    let root = utf8_dir(&dir);
    let dylib = utf8_temp_file(&dir, "libzstd.dylib", b"macho");
    std::fs::create_dir_all(root.join("Tcl.framework")).unwrap();
    let framework = utf8_temp_file(&dir, "Tcl.framework/Tcl", b"macho");
    let plain = utf8_temp_file(&dir, "gdbm.dylib", b"macho");

    let runner = FakeRunner::without_tools();
    let ctx = host(Platform::MacOs);
    let found = with_search_path("DYLD_LIBRARY_PATH", &[&root], || {
        [
            SystemLoader.find_library(&ctx, &runner, "zstd").unwrap(),
            SystemLoader.find_library(&ctx, &runner, "Tcl").unwrap(),
            SystemLoader.find_library(&ctx, &runner, "gdbm").unwrap(),
        ]
    });

    assert_eq!(
        found,
        [
            Some(dylib.into_string()),
            Some(framework.into_string()),
            Some(plain.into_string()),
        ]
    );
}

#[test]
fn windows_searches_path_and_appends_dll() {
    let dir = tempfile::tempdir().unwrap();
    let dll = utf8_temp_file(&dir, "python3.dll", b"pe");

    let runner = FakeRunner::without_tools();
    let ctx = host(Platform::Windows);
    let found = with_search_path("PATH", &[&utf8_dir(&dir)], || {
        [
            SystemLoader.find_library(&ctx, &runner, "python3").unwrap(),
            SystemLoader.find_library(&ctx, &runner, "python3.dll").unwrap(),
            SystemLoader.find_library(&ctx, &runner, "vcruntime140").unwrap(),
        ]
    });

    assert_eq!(found, [Some(dll.to_string()), Some(dll.into_string()), None]);
}
