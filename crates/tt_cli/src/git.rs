//! Committing generated content back to the repository.

use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{info, warn};
use tt_core::{Error, Result};

async fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new("git").current_dir(dir).args(args).output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::External(anyhow::anyhow!(
            "git {} failed: {}",
            args.join(" "),
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Stages `paths`, commits them and optionally pushes.
///
/// Returns `false` when there was nothing to commit.
pub async fn commit_paths(dir: &Path, paths: &[PathBuf], message: &str, push: bool) -> Result<bool> {
    let paths: Vec<String> = paths
        .iter()
        .filter(|p| p.exists())
        .map(|p| p.to_string_lossy().into_owned())
        .collect();
    if paths.is_empty() {
        return Ok(false);
    }

    let mut add = vec!["add", "--"];
    add.extend(paths.iter().map(String::as_str));
    git(dir, &add).await?;

    if git(dir, &["diff", "--cached", "--quiet"]).await.is_ok() {
        info!("📭 Nothing to commit");
        return Ok(false);
    }

    git(dir, &["commit", "-m", message]).await?;
    info!("📝 Committed: {}", message);

    if push {
        match git(dir, &["push"]).await {
            Ok(_) => info!("🚀 Pushed to remote"),
            Err(e) => warn!("⚠️ Push failed: {}", e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_nothing_to_stage() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.mdx");
        assert!(!commit_paths(dir.path(), &[missing], "msg", false).await.unwrap());
    }
}
