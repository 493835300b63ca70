// E2E Test Framework for loadprof

pub mod harness;

pub use harness::{HarnessOptions, LoadprofRun, RunOutcome};

use std::env;
use std::net::TcpListener;
use std::path::PathBuf;

fn sibling_binary(name: &str) -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }

    #[cfg(windows)]
    path.push(format!("{}.exe", name));

    #[cfg(not(windows))]
    path.push(name);

    if !path.exists() {
        panic!("{} binary not found at: {}", name, path.display());
    }

    path
}

/// Get the path to the loadprof binary
pub fn get_loadprof_path() -> PathBuf {
    sibling_binary("loadprof")
}

/// Get the path to the TESTEXE (testexe) binary
pub fn get_testexe_path() -> PathBuf {
    sibling_binary("testexe")
}

/// Create a temporary test directory
pub fn create_test_dir(test_name: &str) -> PathBuf {
    // Use target/tmp instead of system temp to avoid path issues
    let workspace_root = env::current_exe()
        .expect("Failed to get current exe path")
        .parent().expect("Failed to get parent")
        .parent().expect("Failed to get parent")
        .parent().expect("Failed to get workspace root")
        .to_path_buf();

    let temp_dir = workspace_root.join("target").join("tmp").join(format!("e2e-test-{}", test_name));

    if temp_dir.exists() {
        std::fs::remove_dir_all(&temp_dir).ok();
    }
    std::fs::create_dir_all(&temp_dir).expect("Failed to create test directory");
    temp_dir
}

/// Clean up test directory
pub fn cleanup_test_dir(dir: &PathBuf) {
    if dir.exists() {
        std::fs::remove_dir_all(dir).ok();
    }
}

/// A localhost port nothing is listening on right now
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("Failed to reserve a port")
}
