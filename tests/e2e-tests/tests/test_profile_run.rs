//! Test Scenario 1.1: Full profiling run
//!
//! Starts the testexe map server under loadprof, attaches the testexe fake
//! profiler, fires the configured shots and checks that the report pipeline
//! turned the capture into the artifact.

use e2e_tests::harness::read_trimmed;
use e2e_tests::{create_test_dir, cleanup_test_dir, free_port, HarnessOptions, LoadprofRun};
use std::time::Duration;

#[test]
fn test_profile_run_creates_artifact() {
    println!("\n========================================");
    println!("TEST: Full profiling run");
    println!("========================================\n");

    let test_dir = create_test_dir("profile-run");
    let options = HarnessOptions {
        port: free_port(),
        shots: 10,
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&[]).expect("loadprof should start");
    let outcome = run.wait(Duration::from_secs(60)).expect("loadprof should finish");

    assert_eq!(outcome.code(), Some(0), "stderr:\n{}", outcome.stderr);
    // Server and profiler both print to stdout; none of it may leak through.
    assert_eq!(outcome.stdout, "graph.svg created\n");
    assert!(outcome.has_log_matching("Shooting complete"));

    // Every shot reached the server, nothing else did.
    assert_eq!(read_trimmed(&run.path("hits.txt")), "10");

    // The capture went through export | collapse | render.
    let capture = std::fs::read_to_string(run.path("perf.data")).unwrap();
    let artifact = std::fs::read_to_string(run.path("graph.svg")).unwrap();
    assert!(!capture.is_empty());
    assert_eq!(artifact.lines().count(), capture.lines().count());
    assert!(artifact.lines().all(|line| line.starts_with("testexe;sample;pid_")));

    // The server removed its ready file, so it was stopped gracefully.
    assert!(!run.path("ready").exists());

    cleanup_test_dir(&test_dir);
    println!("✓ TEST PASSED: Full profiling run");
}

#[test]
fn test_readiness_probe_covers_slow_startup() {
    println!("\n========================================");
    println!("TEST: Readiness probe after warm-up");
    println!("========================================\n");

    let test_dir = create_test_dir("readiness");
    let port = free_port();
    let testexe = e2e_tests::get_testexe_path();
    let options = HarnessOptions {
        port,
        shots: 5,
        warm_up_ms: 100,
        readiness: true,
        // Binds only after 2s, well past the warm-up delay.
        server: Some(format!(
            "'{}' serve --port {} --startup-delay 2 --hits-file hits.txt",
            testexe.display(),
            port
        )),
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&[]).expect("loadprof should start");
    let outcome = run.wait(Duration::from_secs(60)).expect("loadprof should finish");

    assert_eq!(outcome.code(), Some(0), "stderr:\n{}", outcome.stderr);
    assert!(outcome.has_log_matching("Server ready"));

    // Five shots plus exactly one successful readiness request.
    assert_eq!(read_trimmed(&run.path("hits.txt")), "6");

    cleanup_test_dir(&test_dir);
    println!("✓ TEST PASSED: Readiness probe after warm-up");
}

#[test]
fn test_output_override() {
    let test_dir = create_test_dir("output-override");
    let options = HarnessOptions {
        port: free_port(),
        shots: 3,
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&["--output", "flame.svg", "--shots", "2"]).expect("loadprof should start");
    let outcome = run.wait(Duration::from_secs(60)).expect("loadprof should finish");

    assert_eq!(outcome.code(), Some(0), "stderr:\n{}", outcome.stderr);
    assert_eq!(outcome.stdout.trim(), "flame.svg created");
    assert!(run.path("flame.svg").exists());
    assert!(!run.path("graph.svg").exists());
    assert_eq!(read_trimmed(&run.path("hits.txt")), "2");

    cleanup_test_dir(&test_dir);
}
