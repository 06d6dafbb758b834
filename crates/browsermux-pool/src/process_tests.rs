
use super::*;
use std::os::unix::fs::PermissionsExt;

fn fake_binary(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("chromium");
    std::fs::write(&path, "#!/bin/sh\nsleep 60\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn new_acquires_port_and_creates_scratch_dir() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 2));

    let process = BrowserProcess::new(fake_binary(&dir), ports.clone()).unwrap();
    assert_eq!(process.port(), 9222);
    assert!(process.user_data_dir().is_dir());
    assert_eq!(ports.stats().available, 1);
    assert_eq!(process.pid(), 0);
}

#[test]
fn rejects_missing_binary() {
    let ports = Arc::new(PortPool::new(9222, 1));
    let err = BrowserProcess::new("/nonexistent/chromium", ports.clone()).unwrap_err();
    assert!(matches!(err, PoolError::BinaryNotFound(_)));
    // Validation happens before acquire, so nothing leaked.
    assert_eq!(ports.stats().available, 1);
}

#[test]
fn rejects_non_executable_binary() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chromium");
    std::fs::write(&path, "").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

    let ports = Arc::new(PortPool::new(9222, 1));
    let err = BrowserProcess::new(path, ports).unwrap_err();
    assert!(matches!(err, PoolError::BinaryNotExecutable(_)));
}

#[test]
fn drop_without_start_releases_port_and_dir() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));

    let scratch = {
        let process = BrowserProcess::new(fake_binary(&dir), ports.clone()).unwrap();
        process.user_data_dir().to_path_buf()
    };

    assert_eq!(ports.stats().available, 1);
    assert!(!scratch.exists());
}

#[tokio::test]
async fn start_and_stop_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));

    let mut process = BrowserProcess::new(fake_binary(&dir), ports.clone()).unwrap();
    process.start().await.unwrap();
    assert!(process.pid() > 0);
    assert!(process.is_alive());

    let scratch = process.user_data_dir().to_path_buf();
    process.stop().await;
    assert!(!process.is_alive());
    assert_eq!(process.pid(), 0);
    assert_eq!(ports.stats().available, 1);
    assert!(!scratch.exists());
}

#[tokio::test]
async fn stop_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));

    let mut process = BrowserProcess::new(fake_binary(&dir), ports.clone()).unwrap();
    process.start().await.unwrap();
    process.stop().await;
    process.stop().await;
    assert_eq!(ports.stats().available, 1);
}

#[tokio::test]
async fn spawn_failure_releases_resources_before_returning() {
    let dir = tempfile::tempdir().unwrap();
    let ports = Arc::new(PortPool::new(9222, 1));

    // Executable bit set but the file vanishes before start.
    let path = fake_binary(&dir);
    let mut process = BrowserProcess::new(&path, ports.clone()).unwrap();
    let scratch = process.user_data_dir().to_path_buf();
    std::fs::remove_file(&path).unwrap();

    let err = process.start().await.unwrap_err();
    assert!(matches!(err, PoolError::SpawnFailed(_)));
    assert_eq!(ports.stats().available, 1);
    assert!(!scratch.exists());
}

#[tokio::test]
async fn crash_is_observed_by_is_alive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chromium");
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();

    let ports = Arc::new(PortPool::new(9222, 1));
    let mut process = BrowserProcess::new(path, ports).unwrap();
    process.start().await.unwrap();

    // The fake browser exits immediately; give it a moment to be reaped.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!process.is_alive());
}
