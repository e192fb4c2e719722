//! The panic hook is process-wide, so each scenario runs in a fresh copy of
//! this test binary and the parent inspects its stderr.

use bugboy_core::panic::{catch_panic, install_panic_hook};
use std::process::Command;

const CHILD_ENV: &str = "BUGBOY_PANIC_HOOK_CHILD";

/// Re-run this binary restricted to `test_name`, returning the child's stderr.
fn run_child(test_name: &str) -> String {
    let output = Command::new(std::env::current_exe().expect("test binary path"))
        .args([test_name, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, "1")
        .output()
        .expect("failed to run child test");
    assert!(output.status.success(), "child test failed: {output:?}");
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn is_child() -> bool {
    std::env::var_os(CHILD_ENV).is_some()
}

#[test]
fn test_panic_outside_boundary_reaches_stderr() {
    if is_child() {
        install_panic_hook();
        let joined = std::thread::spawn(|| panic!("worker thread died unobserved")).join();
        assert!(joined.is_err());
        return;
    }

    let stderr = run_child("test_panic_outside_boundary_reaches_stderr");
    assert!(
        stderr.contains("worker thread died unobserved"),
        "stderr was: {stderr:?}"
    );
}

#[test]
fn test_panic_inside_boundary_is_left_to_the_boundary() {
    if is_child() {
        install_panic_hook();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime");
        let caught = runtime.block_on(catch_panic(async {
            panic!("handled by the boundary");
        }));
        assert!(caught.is_err());
        return;
    }

    let stderr = run_child("test_panic_inside_boundary_is_left_to_the_boundary");
    assert!(
        !stderr.contains("handled by the boundary"),
        "stderr was: {stderr:?}"
    );
}
