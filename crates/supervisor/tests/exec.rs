//! Subprocess execution behavior, exercised against sh-based stub tools.

use std::time::{Duration, Instant};

use supervisor::{ExecOutcome, LaunchSpec, ProcessEvent, Supervisor, SupervisorConfig};

const RESPONSE: &str = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;

fn sh(tool: &str, script: &str) -> LaunchSpec {
    LaunchSpec::new(tool, "sh").with_args(["-c", script])
}

fn config(timeout_ms: u64) -> SupervisorConfig {
    SupervisorConfig {
        max_concurrent: 8,
        default_timeout: Duration::from_millis(timeout_ms),
        grace_period: Duration::from_millis(200),
    }
}

fn request_frame() -> Vec<u8> {
    let mut bytes = br#"{"jsonrpc":"2.0","id":1,"method":"tool/call","params":{}}"#.to_vec();
    bytes.push(b'\n');
    bytes
}

#[tokio::test]
async fn well_behaved_tool_yields_frame() {
    let supervisor = Supervisor::new(config(5_000));
    let spec = sh("echoer", &format!("read line; echo '{RESPONSE}'"));

    let report = supervisor.execute(&spec, request_frame(), None).await;

    match report.outcome {
        ExecOutcome::Frame(frame) => assert_eq!(frame, RESPONSE.as_bytes()),
        other => panic!("expected frame, got {other:?}"),
    }
    assert_eq!(supervisor.live_count(), 0);
}

#[tokio::test]
async fn incremental_writes_accumulate_into_one_frame() {
    let supervisor = Supervisor::new(config(5_000));
    let script = r#"read line
printf '{"jsonrpc":"2.0",'
sleep 0.2
printf '"id":1,"result":null}\n'"#;
    let spec = sh("dribbler", script);

    let report = supervisor.execute(&spec, request_frame(), None).await;

    match report.outcome {
        ExecOutcome::Frame(frame) => {
            assert_eq!(frame, br#"{"jsonrpc":"2.0","id":1,"result":null}"#);
        }
        other => panic!("expected frame, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_executable_is_spawn_failure_not_crash() {
    let supervisor = Supervisor::new(config(5_000));
    let spec = LaunchSpec::new("ghost", "/nonexistent/tool-binary");

    let report = supervisor.execute(&spec, request_frame(), None).await;

    match report.outcome {
        ExecOutcome::SpawnFailed(detail) => assert!(!detail.is_empty()),
        other => panic!("expected spawn failure, got {other:?}"),
    }
    assert_eq!(supervisor.live_count(), 0);
}

#[tokio::test]
async fn early_exit_preserves_partial_output_and_status() {
    let supervisor = Supervisor::new(config(5_000));
    let spec = sh("crasher", "read line; printf '{\"partial'; exit 3");

    let report = supervisor.execute(&spec, request_frame(), None).await;

    match report.outcome {
        ExecOutcome::Exited { status, partial } => {
            assert_eq!(status, Some(3));
            assert_eq!(partial, b"{\"partial");
        }
        other => panic!("expected exit, got {other:?}"),
    }
}

#[tokio::test]
async fn stderr_is_captured_but_not_parsed() {
    let supervisor = Supervisor::new(config(5_000));
    let spec = sh(
        "noisy",
        &format!("read line; echo 'diagnostic chatter' >&2; echo '{RESPONSE}'"),
    );

    let report = supervisor.execute(&spec, request_frame(), None).await;

    assert!(matches!(report.outcome, ExecOutcome::Frame(_)));
    assert!(report.stderr.contains("diagnostic chatter"));
}

#[tokio::test]
async fn unresponsive_tool_times_out_within_bound() {
    let supervisor = Supervisor::new(config(300));
    let spec = sh("sleeper", "sleep 30");

    let started = Instant::now();
    let report = supervisor.execute(&spec, request_frame(), None).await;

    assert!(matches!(report.outcome, ExecOutcome::TimedOut));
    // Deadline plus grace, with scheduling slack.
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(supervisor.live_count(), 0);
}

#[tokio::test]
async fn caller_timeout_overrides_default() {
    let supervisor = Supervisor::new(config(60_000));
    let spec = sh("sleeper", "sleep 30");

    let report = supervisor
        .execute(&spec, request_frame(), Some(Duration::from_millis(200)))
        .await;

    assert!(matches!(report.outcome, ExecOutcome::TimedOut));
}

#[tokio::test]
async fn concurrency_cap_queues_fifo_instead_of_dropping() {
    let supervisor = std::sync::Arc::new(Supervisor::new(SupervisorConfig {
        max_concurrent: 1,
        default_timeout: Duration::from_secs(5),
        grace_period: Duration::from_millis(200),
    }));
    let script = format!("read line; sleep 0.3; echo '{RESPONSE}'");

    let started = Instant::now();
    let mut tasks = Vec::new();
    for i in 0..2 {
        let supervisor = supervisor.clone();
        let spec = sh(&format!("slot-{i}"), &script);
        tasks.push(tokio::spawn(async move {
            supervisor.execute(&spec, request_frame(), None).await
        }));
    }

    for task in tasks {
        let report = task.await.unwrap();
        assert!(matches!(report.outcome, ExecOutcome::Frame(_)));
    }
    // Two 300ms executions through a single slot cannot overlap.
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn failures_do_not_disturb_concurrent_invocations() {
    let supervisor = std::sync::Arc::new(Supervisor::new(config(5_000)));

    let ok = {
        let supervisor = supervisor.clone();
        let spec = sh("steady", &format!("read line; sleep 0.2; echo '{RESPONSE}'"));
        tokio::spawn(async move { supervisor.execute(&spec, request_frame(), None).await })
    };
    let bad = {
        let supervisor = supervisor.clone();
        let spec = sh("flaky", "read line; exit 9");
        tokio::spawn(async move { supervisor.execute(&spec, request_frame(), None).await })
    };

    let bad_report = bad.await.unwrap();
    assert!(matches!(bad_report.outcome, ExecOutcome::Exited { .. }));

    let ok_report = ok.await.unwrap();
    assert!(matches!(ok_report.outcome, ExecOutcome::Frame(_)));
}

#[tokio::test]
async fn terminate_all_reaps_live_handles() {
    let supervisor = std::sync::Arc::new(Supervisor::new(config(60_000)));
    let task = {
        let supervisor = supervisor.clone();
        let spec = sh("lingerer", "sleep 30");
        tokio::spawn(async move { supervisor.execute(&spec, request_frame(), None).await })
    };

    // Let the subprocess come up before signalling.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(supervisor.live_count(), 1);
    supervisor.terminate_all();

    let report = task.await.unwrap();
    assert!(matches!(report.outcome, ExecOutcome::Terminated));
    assert_eq!(supervisor.live_count(), 0);
}

#[tokio::test]
async fn shutdown_bounds_straggler_wait() {
    let supervisor = std::sync::Arc::new(Supervisor::new(config(60_000)));
    let task = {
        let supervisor = supervisor.clone();
        let spec = sh("lingerer", "sleep 30");
        tokio::spawn(async move { supervisor.execute(&spec, request_frame(), None).await })
    };
    tokio::time::sleep(Duration::from_millis(200)).await;

    let started = Instant::now();
    supervisor.shutdown(Duration::from_secs(2)).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(supervisor.live_count(), 0);

    let report = task.await.unwrap();
    assert!(matches!(report.outcome, ExecOutcome::Terminated));
}

#[tokio::test]
async fn lifecycle_events_reach_subscribers() {
    let supervisor = Supervisor::new(config(5_000));
    let mut events = supervisor.subscribe();
    let spec = sh("echoer", &format!("read line; echo '{RESPONSE}'"));

    let report = supervisor.execute(&spec, request_frame(), None).await;
    assert!(matches!(report.outcome, ExecOutcome::Frame(_)));

    match events.recv().await.unwrap() {
        ProcessEvent::Spawned { tool_name, invocation, .. } => {
            assert_eq!(tool_name, "echoer");
            assert_eq!(invocation, report.invocation);
        }
        other => panic!("expected spawn event, got {other:?}"),
    }
    match events.recv().await.unwrap() {
        ProcessEvent::Exited { status, .. } => assert_eq!(status, Some(0)),
        other => panic!("expected exit event, got {other:?}"),
    }
}

#[tokio::test]
async fn oversize_output_is_rejected() {
    let supervisor = Supervisor::new(config(30_000));
    // 2MB of 'x' with no newline: exceeds the frame bound before any frame.
    let spec = sh(
        "flooder",
        "read line; head -c 2097152 /dev/zero | tr '\\0' 'x'",
    );

    let report = supervisor.execute(&spec, request_frame(), None).await;

    match report.outcome {
        ExecOutcome::Oversize { size, max } => assert!(size > max),
        other => panic!("expected oversize, got {other:?}"),
    }
    assert_eq!(supervisor.live_count(), 0);
}
