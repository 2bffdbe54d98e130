// ABOUTME: Integration tests for the per-root deploy lock.
// ABOUTME: Contention fails immediately and release makes the root available again.

use releasectl::deploy::{DeployLock, LockError};
use std::time::{Duration, Instant};

#[test]
fn second_acquire_fails_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".releasectl.lock");

    let held = DeployLock::acquire(&path, "deploy").unwrap();

    let started = Instant::now();
    let err = DeployLock::acquire(&path, "rollback").unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));

    match &err {
        LockError::AlreadyRunning { path: locked, .. } => assert_eq!(locked, &path),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }
    let holder = err.holder().expect("holder info should be readable");
    assert_eq!(holder.operation, "deploy");
    assert_eq!(holder.pid, std::process::id());

    drop(held);
}

#[test]
fn lock_can_be_reacquired_after_release() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".releasectl.lock");

    DeployLock::acquire(&path, "deploy").unwrap().release();
    let again = DeployLock::acquire(&path, "rollback").unwrap();

    assert_eq!(again.info().operation, "rollback");
    assert_eq!(again.path(), path.as_path());
}

#[test]
fn lock_creates_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app").join(".releasectl.lock");

    let lock = DeployLock::acquire(&path, "deploy").unwrap();

    assert!(path.exists());
    drop(lock);
}

#[test]
fn error_message_names_holder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".releasectl.lock");
    let _held = DeployLock::acquire(&path, "deploy").unwrap();

    let message = DeployLock::acquire(&path, "deploy").unwrap_err().to_string();

    assert!(message.contains("already running"), "{message}");
    assert!(message.contains("deploy"), "{message}");
}
