// tests/lifecycle_termination.rs
#![cfg(unix)]

mod common;

use common::{eventually, init_tracing, with_timeout, TaskConfigBuilder};

use std::error::Error;
use std::io::{self, Write};
use std::os::unix::process::ExitStatusExt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use wwatch::config::TaskConfig;
use wwatch::errors::WwatchError;
use wwatch::exec::{CommandSpec, LifecycleController, LifecycleState};
use wwatch::fs::RealFileSystem;
use wwatch::output::OutletFactory;

type TestResult = Result<(), Box<dyn Error>>;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn controller(cfg: &TaskConfig) -> (LifecycleController, Capture) {
    let capture = Capture::default();
    let outlets = OutletFactory::with_writer(Box::new(capture.clone()), false);
    let ctl = LifecycleController::new(cfg, &outlets, 0, Arc::new(RealFileSystem))
        .with_kill_timeout(Duration::from_millis(300));
    (ctl, capture)
}

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", vec!["-c".to_string(), script.to_string()])
}

/// Whether `pid` is a running process; a zombie nobody reaps doesn't count.
fn is_running_pid(pid: i32) -> bool {
    // SAFETY: kill with signal 0 only checks for existence.
    if unsafe { libc::kill(pid, 0) } != 0 {
        return false;
    }
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => stat
            .rfind(')')
            .and_then(|i| stat[i + 1..].split_whitespace().next())
            .is_some_and(|state| state != "Z"),
        Err(_) => true,
    }
}

fn read_pid(path: &std::path::Path) -> Option<i32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[tokio::test]
async fn stop_without_process_is_a_noop() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("idle", tmp.path()).cmd("sleep 30").build();
    let (ctl, _) = controller(&cfg);

    ctl.stop_process().await?;
    ctl.stop_process().await?;
    assert_eq!(ctl.state(), LifecycleState::Idle);
    assert!(!ctl.is_running().await);
    Ok(())
}

#[tokio::test]
async fn stop_terminates_running_process_and_is_idempotent() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("sleeper", tmp.path()).cmd("sleep 30").build();
    let (ctl, _) = controller(&cfg);

    ctl.start_process().await?;
    assert_eq!(ctl.state(), LifecycleState::Running);
    assert!(ctl.is_running().await);
    assert!(ctl.pid().await.is_some());

    let started = Instant::now();
    with_timeout(ctl.stop_process()).await?;
    // SIGTERM is enough; no escalation needed.
    assert!(started.elapsed() < Duration::from_millis(300));
    assert!(!ctl.is_running().await);
    assert_eq!(ctl.state(), LifecycleState::Idle);

    ctl.stop_process().await?;
    assert_eq!(ctl.state(), LifecycleState::Idle);
    Ok(())
}

#[tokio::test]
async fn subscribers_see_start_and_stop() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("observed", tmp.path()).cmd("sleep 30").build();
    let (ctl, _) = controller(&cfg);

    let mut states = ctl.subscribe();
    assert_eq!(*states.borrow_and_update(), LifecycleState::Idle);

    ctl.start_process().await?;
    with_timeout(states.changed()).await?;
    assert_eq!(*states.borrow_and_update(), LifecycleState::Running);

    with_timeout(ctl.stop_process()).await?;
    with_timeout(states.changed()).await?;
    assert_eq!(*states.borrow_and_update(), LifecycleState::Idle);
    Ok(())
}

#[tokio::test]
async fn process_ignoring_sigterm_is_killed_after_timeout() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let mut cfg = TaskConfigBuilder::new("stubborn", tmp.path()).build();
    cfg.command = sh("trap '' TERM; echo ready; while true; do sleep 0.1; done");
    let (ctl, capture) = controller(&cfg);

    ctl.start_process().await?;
    assert!(eventually(Duration::from_secs(5), || capture.text().contains("ready")).await);

    let started = Instant::now();
    with_timeout(ctl.stop_process()).await?;
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(300), "stopped too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "stopped too late: {elapsed:?}");
    assert!(!ctl.is_running().await);
    Ok(())
}

#[tokio::test]
async fn stop_kills_group_members_that_outlive_the_leader() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let mut cfg = TaskConfigBuilder::new("forked", tmp.path())
        .cwd(tmp.path())
        .build();
    // The leader dies on SIGTERM; its background child ignores it.
    cfg.command = sh(
        r#"sh -c 'trap "" TERM; echo $$ > inner.pid; while :; do sleep 0.1; done' & wait"#,
    );
    let (ctl, _) = controller(&cfg);

    ctl.start_process().await?;
    let pid_path = tmp.path().join("inner.pid");
    assert!(eventually(Duration::from_secs(5), || read_pid(&pid_path).is_some()).await);
    let inner = read_pid(&pid_path).ok_or("inner pid not written")?;
    assert!(is_running_pid(inner));

    let started = Instant::now();
    with_timeout(ctl.stop_process()).await?;
    let elapsed = started.elapsed();

    assert!(!is_running_pid(inner), "group member {inner} survived stop");
    assert!(elapsed >= Duration::from_millis(300), "stopped too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "stopped too late: {elapsed:?}");
    assert_eq!(ctl.state(), LifecycleState::Idle);
    Ok(())
}

#[tokio::test]
async fn pid_file_target_gets_interrupted_too() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    // The "payload" lives outside the supervised process group.
    let mut payload = tokio::process::Command::new("sleep").arg("30").spawn()?;
    let payload_pid = payload.id().ok_or("payload has no pid")?;
    let pid_path = tmp.path().join("payload.pid");
    std::fs::write(&pid_path, format!("{payload_pid}\n"))?;

    // Reap concurrently so the pid disappears as soon as it exits.
    let (status_tx, status_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let _ = status_tx.send(payload.wait().await);
    });

    let cfg = TaskConfigBuilder::new("wrapper", tmp.path())
        .cmd("sleep 30")
        .pid_file(&pid_path)
        .build();
    let (ctl, _) = controller(&cfg);

    ctl.start_process().await?;
    with_timeout(ctl.stop_process()).await?;

    let status = with_timeout(status_rx).await??;
    assert_eq!(status.signal(), Some(libc::SIGINT));
    assert!(!ctl.is_running().await);
    Ok(())
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn unreaped_pid_target_counts_as_gone() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;

    // Nobody waits on this child until the end, so it lingers as a zombie.
    let mut payload = std::process::Command::new("sleep").arg("30").spawn()?;
    let pid_path = tmp.path().join("payload.pid");
    std::fs::write(&pid_path, format!("{}\n", payload.id()))?;

    let cfg = TaskConfigBuilder::new("zombie", tmp.path())
        .cmd("sleep 30")
        .pid_file(&pid_path)
        .build();
    let (ctl, _) = controller(&cfg);

    ctl.start_process().await?;
    let started = Instant::now();
    with_timeout(ctl.stop_process()).await?;
    let elapsed = started.elapsed();

    // No force-kill window was needed.
    assert!(elapsed < Duration::from_millis(300), "stop waited on a zombie: {elapsed:?}");
    let status = payload.wait()?;
    assert_eq!(status.signal(), Some(libc::SIGINT));
    Ok(())
}

#[tokio::test]
async fn bad_pid_file_is_reported_after_group_is_stopped() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("orphan", tmp.path())
        .cmd("sleep 30")
        .pid_file(tmp.path().join("missing.pid"))
        .build();
    let (ctl, _) = controller(&cfg);

    ctl.start_process().await?;
    let err = with_timeout(ctl.stop_process()).await.unwrap_err();

    assert!(matches!(err, WwatchError::PidFile { .. }), "{err}");
    assert!(!ctl.is_running().await);
    assert_eq!(ctl.state(), LifecycleState::Idle);
    Ok(())
}

#[tokio::test]
async fn concurrent_starts_never_leave_two_children() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("racer", tmp.path()).cmd("sleep 30").build();
    let (ctl, _) = controller(&cfg);

    let (a, b) = tokio::join!(ctl.start_process(), ctl.start_process());
    let oks = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(oks, 1);
    let err = a.err().or(b.err()).ok_or("expected one failure")?;
    assert!(matches!(err, WwatchError::AlreadyRunning(_)));

    ctl.stop_process().await?;
    Ok(())
}

#[tokio::test]
async fn exited_process_is_replaced_on_next_start() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("oneshot", tmp.path()).cmd("echo hello").build();
    let (ctl, capture) = controller(&cfg);

    ctl.start_process().await?;
    let mut gone = false;
    for _ in 0..250 {
        if !ctl.is_running().await {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "echo should exit on its own");

    // Stop after exit is a success.
    ctl.stop_process().await?;
    ctl.start_process().await?;
    ctl.stop_process().await?;

    let both_ran = || capture.text().matches("oneshot | hello").count() == 2;
    assert!(eventually(Duration::from_secs(5), both_ran).await);
    Ok(())
}

#[tokio::test]
async fn on_start_runs_once_before_first_start() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("svc", tmp.path())
        .cmd("sleep 30")
        .on_start("echo setup")
        .build();
    let (ctl, capture) = controller(&cfg);

    ctl.start_process().await?;
    ctl.stop_process().await?;
    ctl.start_process().await?;
    ctl.stop_process().await?;

    assert!(eventually(Duration::from_secs(5), || capture.text().contains("svc | setup")).await);
    assert_eq!(capture.text().matches("svc | setup").count(), 1);
    Ok(())
}

#[tokio::test]
async fn spawn_failure_leaves_controller_idle() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let cfg = TaskConfigBuilder::new("broken", tmp.path())
        .cmd("/definitely/not/a/binary")
        .build();
    let (ctl, _) = controller(&cfg);

    let err = ctl.start_process().await.unwrap_err();
    assert!(matches!(err, WwatchError::Spawn { .. }));
    assert_eq!(ctl.state(), LifecycleState::Idle);
    ctl.stop_process().await?;
    Ok(())
}
