//! Integration tests for acquire/use/release with real files.
//!
//! These tests verify that a resource is released exactly once whatever
//! happens while it is in use.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use eddy::{Close, Error, ErrorKind, IO};

/// Helper to create a unique temp file path
fn temp_file_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("eddy_resource_test_{}_{}.txt", name, std::process::id()))
}

/// A file handle that counts how often it is closed and can refuse to close.
struct TrackedFile {
    file: File,
    closes: Arc<AtomicUsize>,
    fail_close: bool,
}

impl Close for TrackedFile {
    fn close(self) -> eddy::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.file.sync_all()?;
        if self.fail_close {
            Err(Error::msg("close refused"))
        } else {
            Ok(())
        }
    }
}

fn open(path: PathBuf, closes: Arc<AtomicUsize>, fail_close: bool) -> IO<TrackedFile> {
    IO::lazy(move || {
        let file = File::options()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)?;
        Ok(TrackedFile {
            file,
            closes: Arc::clone(&closes),
            fail_close,
        })
    })
}

#[tokio::test]
async fn from_resource_closes_after_success() {
    let path = temp_file_path("success");
    let closes = Arc::new(AtomicUsize::new(0));

    let effect = IO::from_resource(open(path.clone(), closes.clone(), false), |tracked| {
        let written = (&tracked.file).write_all(b"hello").map(|_| 5);
        IO::from_result(written.map_err(Error::from))
    });

    assert_eq!(effect.run().await.unwrap(), 5);
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    let mut contents = String::new();
    File::open(&path).unwrap().read_to_string(&mut contents).unwrap();
    assert_eq!(contents, "hello");
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn from_resource_closes_after_failure() {
    let path = temp_file_path("failure");
    let closes = Arc::new(AtomicUsize::new(0));

    let effect = IO::<()>::from_resource(open(path.clone(), closes.clone(), false), |_| {
        IO::fail("use failed")
    });

    assert_eq!(effect.run().await.unwrap_err().message(), "use failed");
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn from_resource_closes_after_panic() {
    let path = temp_file_path("panic");
    let closes = Arc::new(AtomicUsize::new(0));

    let effect = IO::<()>::from_resource(open(path.clone(), closes.clone(), false), |_| {
        IO::lazy(|| panic!("use panicked"))
    });

    assert_eq!(effect.run().await.unwrap_err().kind(), ErrorKind::Panicked);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn close_failure_turns_success_into_failure() {
    let path = temp_file_path("close_failure");
    let closes = Arc::new(AtomicUsize::new(0));

    let effect = IO::from_resource(open(path.clone(), closes.clone(), true), |_| IO::succeed(1));

    assert_eq!(effect.run().await.unwrap_err().message(), "close refused");
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn use_failure_wins_over_close_failure() {
    let path = temp_file_path("both_fail");
    let closes = Arc::new(AtomicUsize::new(0));

    let effect = IO::<()>::from_resource(open(path.clone(), closes.clone(), true), |_| {
        IO::fail("use failed")
    });

    assert_eq!(effect.run().await.unwrap_err().message(), "use failed");
    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn failed_acquire_never_releases() {
    let released = Arc::new(AtomicUsize::new(0));
    let counter = released.clone();
    let missing = std::env::temp_dir().join("eddy_no_such_dir").join("nested").join("file.txt");

    let effect = IO::bracket(
        IO::lazy(move || Ok(File::open(&missing)?)),
        |_: &File| IO::succeed(()),
        move |_file: File| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<(), Error>(()) }
        },
    );

    assert_eq!(effect.run().await.unwrap_err().kind(), ErrorKind::Io);
    assert_eq!(released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn every_run_acquires_and_releases_again() {
    let path = temp_file_path("rerun");
    let closes = Arc::new(AtomicUsize::new(0));
    let effect = IO::from_resource(open(path.clone(), closes.clone(), false), |_| IO::unit());

    effect.run().await.unwrap();
    effect.run().await.unwrap();
    effect.run().await.unwrap();

    assert_eq!(closes.load(Ordering::SeqCst), 3);
    std::fs::remove_file(&path).ok();
}
