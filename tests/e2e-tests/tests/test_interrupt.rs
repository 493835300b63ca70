//! Test Scenario 3.1: Interrupted session
//!
//! SIGTERM to loadprof mid-load must take the server and profiler down with
//! it instead of leaving them running; during report generation it must take
//! the pipeline stages down.

#![cfg(unix)]

use e2e_tests::harness::read_trimmed;
use e2e_tests::{create_test_dir, cleanup_test_dir, free_port, HarnessOptions, LoadprofRun};
use std::thread;
use std::time::Duration;

#[test]
fn test_interrupt_terminates_children() {
    println!("\n========================================");
    println!("TEST: Interrupted session");
    println!("========================================\n");

    let test_dir = create_test_dir("interrupt");
    let options = HarnessOptions {
        port: free_port(),
        shots: 1000,
        cooldown_ms: 100,
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&[]).expect("loadprof should start");

    // Server up, then give the profiler time to attach and the load to begin.
    run.wait_for_file("ready", Duration::from_secs(10)).expect("server should start");
    run.wait_for_file("perf.data", Duration::from_secs(10)).expect("profiler should attach");
    thread::sleep(Duration::from_millis(500));

    run.interrupt().expect("SIGTERM should be delivered");
    let outcome = run.wait(Duration::from_secs(30)).expect("loadprof should exit");

    assert_eq!(outcome.code(), Some(130), "stderr:\n{}", outcome.stderr);
    assert!(outcome.has_log_matching("Interrupted"));

    // The server saw SIGTERM: it wrote its hit count and removed its ready file.
    let hits_file = run
        .wait_for_file("hits.txt", Duration::from_secs(5))
        .expect("server should have been terminated");
    let hits: usize = read_trimmed(&hits_file).parse().unwrap();
    assert!(hits > 0 && hits < 1000);
    thread::sleep(Duration::from_millis(200));
    assert!(!run.path("ready").exists());
    assert!(!run.path("graph.svg").exists());

    cleanup_test_dir(&test_dir);
    println!("✓ TEST PASSED: Interrupted session");
}

#[test]
fn test_interrupt_during_report_kills_stages() {
    println!("\n========================================");
    println!("TEST: Interrupted report generation");
    println!("========================================\n");

    let test_dir = create_test_dir("interrupt-report");
    let options = HarnessOptions {
        port: free_port(),
        shots: 3,
        render: "sh -c 'cat > /dev/null; sleep 3; echo late > render-finished'".to_string(),
        ..Default::default()
    };

    let mut run = LoadprofRun::new(test_dir.clone(), &options);
    run.start(&[]).expect("loadprof should start");

    run.wait_for_log("Generating report", Duration::from_secs(30))
        .expect("session should reach report generation");
    thread::sleep(Duration::from_millis(300));

    run.interrupt().expect("SIGTERM should be delivered");
    let outcome = run.wait(Duration::from_secs(2)).expect("loadprof should exit promptly");

    assert_eq!(outcome.code(), Some(130), "stderr:\n{}", outcome.stderr);

    // The render stage was killed before it could finish.
    thread::sleep(Duration::from_secs(4));
    assert!(!run.path("render-finished").exists());

    cleanup_test_dir(&test_dir);
    println!("✓ TEST PASSED: Interrupted report generation");
}
