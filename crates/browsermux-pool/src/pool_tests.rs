
use super::*;
use std::os::unix::fs::PermissionsExt;

fn fake_binary(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("chromium");
    std::fs::write(&path, "#!/bin/sh\nsleep 60\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn stub_process(binary: &Path, ports: &Arc<PortPool>) -> Arc<ManagedProcess> {
    ManagedProcess::stub(BrowserProcess::new(binary, ports.clone()).unwrap())
}

#[test]
fn session_counter_tracks_adds_and_removes() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));
    let process = stub_process(&fake_binary(&dir), &ports);

    assert_eq!(process.session_count(), 0);
    process.increment_sessions();
    process.increment_sessions();
    process.decrement_sessions();
    assert_eq!(process.session_count(), 1);
}

#[test]
fn metrics_reflect_port_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9300, 1));
    let process = stub_process(&fake_binary(&dir), &ports);
    process.increment_sessions();

    let metrics = process.metrics();
    assert_eq!(metrics.port, 9300);
    assert_eq!(metrics.session_count, 1);
}

#[tokio::test]
async fn find_locates_process_by_port() {
    let dir = tempfile::tempdir().unwrap();
    let binary = fake_binary(&dir);
    let ports = Arc::new(PortPool::new(9222, 3));
    let processes = vec![
        stub_process(&binary, &ports),
        stub_process(&binary, &ports),
    ];
    let pool = ProcessPool::stub(binary, ports, processes);

    assert_eq!(pool.find(9223).await.unwrap().port(), 9223);
    assert!(pool.find(9224).await.is_none());
}

#[tokio::test]
async fn pool_metrics_aggregate_session_counts() {
    let dir = tempfile::tempdir().unwrap();
    let binary = fake_binary(&dir);
    let ports = Arc::new(PortPool::new(9222, 3));
    let processes = vec![
        stub_process(&binary, &ports),
        stub_process(&binary, &ports),
        stub_process(&binary, &ports),
    ];
    processes[0].increment_sessions();
    processes[2].increment_sessions();
    processes[2].increment_sessions();
    let pool = ProcessPool::stub(binary, ports, processes);

    let metrics = pool.metrics().await;
    assert_eq!(metrics.capacity, 3);
    assert_eq!(metrics.total_sessions, 3);
    assert_eq!(metrics.processes.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn launch_starts_capacity_processes_on_distinct_ports() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 4));

    let pool = ProcessPool::launch(fake_binary(&dir), 2, ports.clone())
        .await
        .unwrap();

    let mut seen: Vec<u16> = pool.processes().await.iter().map(|p| p.port()).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![9222, 9223]);
    assert_eq!(ports.stats().available, 2);

    pool.shutdown().await;
    assert_eq!(ports.stats().available, 4);
    assert!(pool.processes().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn failed_launch_rolls_back_started_processes() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));

    // Capacity 2 against a single-port range: the second spawn must fail and
    // the first browser must be stopped with its port returned.
    let err = ProcessPool::launch(fake_binary(&dir), 2, ports.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::PoolExhausted));
    assert_eq!(ports.stats().available, 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));
    let pool = ProcessPool::launch(fake_binary(&dir), 1, ports.clone())
        .await
        .unwrap();

    pool.shutdown().await;
    pool.shutdown().await;
    assert_eq!(ports.stats().available, 1);
}

#[tokio::test(start_paused = true)]
async fn dead_process_is_replaced_on_same_port_with_zero_counter() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));
    let pool = ProcessPool::launch(fake_binary(&dir), 1, ports.clone())
        .await
        .unwrap();

    let original = pool.processes().await[0].clone();
    original.increment_sessions();

    // Kill the underlying subprocess behind the monitor's back.
    original.process.lock().await.stop().await;

    // One health interval later the pool should hold a fresh process on the
    // same port with an inherited count of zero.
    tokio::time::sleep(HEALTH_CHECK_INTERVAL * 2).await;

    let replacement = pool.find(9222).await.expect("port should be repopulated");
    assert!(!Arc::ptr_eq(&replacement, &original));
    assert_eq!(replacement.session_count(), 0);

    pool.shutdown().await;
    assert_eq!(ports.stats().available, 1);
}
