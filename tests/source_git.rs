//! Source fetch tests against a real local git repository.

use std::path::Path;

use binforge::source::SourceFetcher;
use binforge::version::binary_version;
use tokio::process::Command;

async fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args([
            "-c",
            "user.email=ci@binforge.invalid",
            "-c",
            "user.name=binforge-ci",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .await
        .expect("git not runnable");
    assert!(
        output.status.success(),
        "git {:?} failed: {}{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

async fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .await
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Creates a repo on the `master` branch with two commits; returns the
/// first commit's sha.
async fn seed_repo(dir: &Path) -> String {
    git(dir, &["init", "--quiet"]).await;
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/master"]).await;

    std::fs::write(dir.join("VERSION"), "0.1.0\n").unwrap();
    git(dir, &["add", "-A"]).await;
    git(dir, &["commit", "--quiet", "-m", "first"]).await;
    let first = git(dir, &["rev-parse", "HEAD"]).await;

    std::fs::write(dir.join("VERSION"), "0.2.0\n").unwrap();
    git(dir, &["add", "-A"]).await;
    git(dir, &["commit", "--quiet", "-m", "second"]).await;

    first
}

#[tokio::test]
async fn fetch_pins_the_requested_revision() {
    if !git_available().await {
        eprintln!("git not available, skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let origin = tmp.path().join("origin");
    std::fs::create_dir(&origin).unwrap();
    let first = seed_repo(&origin).await;

    // file:// so the shallow depth applies to a local clone too
    let fetcher = SourceFetcher::new();
    let tree = fetcher
        .fetch(
            &format!("file://{}", origin.display()),
            &first,
            &tmp.path().join("tree"),
        )
        .await
        .unwrap();

    assert_eq!(fetcher.head_revision(&tree).await.unwrap(), first);
    // the tree holds the pinned revision's content, not the branch head
    assert_eq!(binary_version(tree.root()).unwrap(), "0.1.0");
    assert_eq!(tree.revision(), first);
}

#[tokio::test]
async fn fetch_of_missing_revision_surfaces_output() {
    if !git_available().await {
        eprintln!("git not available, skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let origin = tmp.path().join("origin");
    std::fs::create_dir(&origin).unwrap();
    seed_repo(&origin).await;

    let err = SourceFetcher::new()
        .fetch(
            &format!("file://{}", origin.display()),
            "0000000000000000000000000000000000000000",
            &tmp.path().join("tree"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        binforge::error::FetchError::CheckoutFailed { .. }
    ));
}

#[tokio::test]
async fn fetch_of_missing_repo_fails_cleanly() {
    if !git_available().await {
        eprintln!("git not available, skipping");
        return;
    }

    let tmp = tempfile::tempdir().unwrap();
    let err = SourceFetcher::new()
        .fetch(
            &format!("file://{}", tmp.path().join("nope").display()),
            "abc123",
            &tmp.path().join("tree"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        binforge::error::FetchError::CloneFailed { .. }
    ));
}
