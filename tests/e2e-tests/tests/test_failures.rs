//! Test Scenario 2.x: Fatal failures
//!
//! A server that cannot start aborts before anything is profiled; a failing
//! report tool propagates its exit code and leaves the capture behind.

use e2e_tests::{create_test_dir, cleanup_test_dir, free_port, HarnessOptions, LoadprofRun};
use std::time::Duration;

#[test]
fn test_invalid_server_aborts_early() {
    println!("\n========================================");
    println!("TEST: Invalid server command");
    println!("========================================\n");

    let test_dir = create_test_dir("invalid-server");
    let options = HarnessOptions {
        port: free_port(),
        server: Some("/no/such/game_server --port 8080".to_string()),
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&[]).expect("loadprof should start");
    let outcome = run.wait(Duration::from_secs(30)).expect("loadprof should finish");

    assert_eq!(outcome.code(), Some(1));
    assert!(outcome.stdout.trim().is_empty());
    assert!(outcome.has_log_matching("server_starting"));
    assert!(!run.path("perf.data").exists(), "profiler must never start");
    assert!(!run.path("graph.svg").exists());

    cleanup_test_dir(&test_dir);
    println!("✓ TEST PASSED: Invalid server command");
}

#[test]
fn test_failing_render_propagates_exit_code() {
    println!("\n========================================");
    println!("TEST: Failing render stage");
    println!("========================================\n");

    let test_dir = create_test_dir("failing-render");
    let options = HarnessOptions {
        port: free_port(),
        shots: 3,
        render: "sh -c 'cat > /dev/null; exit 3'".to_string(),
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&[]).expect("loadprof should start");
    let outcome = run.wait(Duration::from_secs(60)).expect("loadprof should finish");

    assert_eq!(outcome.code(), Some(3), "stderr:\n{}", outcome.stderr);
    assert!(outcome.has_log_matching("render"));
    assert!(run.path("perf.data").exists(), "capture must be kept for inspection");

    cleanup_test_dir(&test_dir);
    println!("✓ TEST PASSED: Failing render stage");
}

#[test]
fn test_invalid_config_is_rejected() {
    let test_dir = create_test_dir("invalid-config");
    let options = HarnessOptions {
        port: free_port(),
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&["--shots", "not-a-number"]).expect("loadprof should start");
    let outcome = run.wait(Duration::from_secs(30)).expect("loadprof should finish");

    assert_ne!(outcome.code(), Some(0));
    assert!(!run.path("ready").exists(), "server must never start");

    cleanup_test_dir(&test_dir);
}
