//! End-to-end coordination tests: executor + lock manager + provider
//! contending from concurrent tasks.

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use holdfast_core::{
    DiskRepoProvider, Error, Executor, LockManager, LockMode, RepoId, Result,
};
use tokio::sync::Barrier;

fn executor_in(dir: &tempfile::TempDir) -> Arc<Executor> {
    let provider = Arc::new(DiskRepoProvider::new(dir.path().join("repos")));
    let locks = LockManager::new(dir.path().join("locks"));
    Arc::new(Executor::new(provider, locks))
}

// Two contenders request Exclusive access to "repo-42" within 100ms of
// each other; the second, given a 1s timeout, succeeds only after the
// first releases.
#[tokio::test]
async fn exclusive_contention_on_repo_42_serializes() -> Result<()> {
    let dir = tempfile::tempdir().map_err(|e| Error::IoError(e.to_string()))?;
    let executor = executor_in(&dir);
    let repo = RepoId::new("repo-42");
    let hold = Duration::from_millis(300);

    let first = {
        let executor = Arc::clone(&executor);
        let repo = repo.clone();
        tokio::spawn(async move {
            executor
                .with_access(
                    &repo,
                    None,
                    LockMode::Exclusive,
                    Duration::from_secs(1),
                    "first-writer",
                    |_| async move {
                        tokio::time::sleep(hold).await;
                        Ok(Instant::now())
                    },
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(100)).await;

    let second_started = Instant::now();
    let second_granted = executor
        .with_access(
            &repo,
            None,
            LockMode::Exclusive,
            Duration::from_secs(1),
            "second-writer",
            |_| async { Ok(Instant::now()) },
        )
        .await?;

    let first_released = first
        .await
        .map_err(|e| Error::IoError(e.to_string()))??;

    assert!(
        second_granted >= first_released,
        "second writer ran before the first released"
    );
    // The second waited out most of the first's hold, not its own timeout.
    let waited = second_started.elapsed();
    assert!(waited >= Duration::from_millis(150), "waited only {waited:?}");
    assert!(waited < Duration::from_secs(1), "waited {waited:?}");
    Ok(())
}

// Many exclusive units of work, never more than one in the critical
// section at a time.
#[tokio::test]
async fn stress_exclusive_keeps_single_holder() -> Result<()> {
    let dir = tempfile::tempdir().map_err(|e| Error::IoError(e.to_string()))?;
    let executor = executor_in(&dir);
    let repo = RepoId::new("cb-stress");

    let task_count = 12usize;
    let barrier = Arc::new(Barrier::new(task_count));
    let in_critical = Arc::new(AtomicUsize::new(0));
    let max_critical = Arc::new(AtomicUsize::new(0));

    let tasks: Vec<_> = (0..task_count)
        .map(|_| {
            let executor = Arc::clone(&executor);
            let repo = repo.clone();
            let barrier = Arc::clone(&barrier);
            let in_critical = Arc::clone(&in_critical);
            let max_critical = Arc::clone(&max_critical);
            tokio::spawn(async move {
                barrier.wait().await;
                executor
                    .with_access(
                        &repo,
                        None,
                        LockMode::Exclusive,
                        Duration::from_secs(10),
                        "stress-writer",
                        |_| async move {
                            let current = in_critical.fetch_add(1, Ordering::SeqCst) + 1;
                            max_critical.fetch_max(current, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            in_critical.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        },
                    )
                    .await
            })
        })
        .collect();

    let joined = futures::future::join_all(tasks).await;
    for task in joined {
        task.map_err(|e| Error::IoError(e.to_string()))??;
    }
    assert_eq!(max_critical.load(Ordering::SeqCst), 1);
    Ok(())
}

// Readers on one repository do not serialize against a writer on another:
// ordering is only guaranteed per-resource.
#[tokio::test]
async fn distinct_repos_do_not_contend() -> Result<()> {
    let dir = tempfile::tempdir().map_err(|e| Error::IoError(e.to_string()))?;
    let executor = executor_in(&dir);

    let writer = {
        let executor = Arc::clone(&executor);
        tokio::spawn(async move {
            executor
                .with_access(
                    &RepoId::new("repo-a"),
                    None,
                    LockMode::Exclusive,
                    Duration::from_secs(1),
                    "slow-writer",
                    |_| async {
                        tokio::time::sleep(Duration::from_millis(300)).await;
                        Ok(())
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // A short-timeout writer on a different repo must not be blocked.
    let other = executor
        .with_access(
            &RepoId::new("repo-b"),
            None,
            LockMode::Exclusive,
            Duration::from_millis(100),
            "other-writer",
            |_| async { Ok(()) },
        )
        .await;
    assert!(other.is_ok(), "unrelated repo was blocked");

    writer.await.map_err(|e| Error::IoError(e.to_string()))??;
    Ok(())
}

// A view and its repository trunk are distinct resources.
#[tokio::test]
async fn view_and_trunk_do_not_contend() -> Result<()> {
    use holdfast_core::ViewId;

    let dir = tempfile::tempdir().map_err(|e| Error::IoError(e.to_string()))?;
    let executor = executor_in(&dir);
    let repo = RepoId::new("cb1");

    let trunk_writer = {
        let executor = Arc::clone(&executor);
        let repo = repo.clone();
        tokio::spawn(async move {
            executor
                .with_access(
                    &repo,
                    None,
                    LockMode::Exclusive,
                    Duration::from_secs(1),
                    "trunk-writer",
                    |_| async {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        Ok(())
                    },
                )
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let view_write = executor
        .with_access(
            &repo,
            Some(&ViewId::new("v1")),
            LockMode::Exclusive,
            Duration::from_millis(100),
            "view-writer",
            |_| async { Ok(()) },
        )
        .await;
    assert!(view_write.is_ok(), "view was blocked by trunk writer");

    trunk_writer.await.map_err(|e| Error::IoError(e.to_string()))??;
    Ok(())
}
