//! Common test utilities and helpers

#![allow(dead_code)]

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Test context builder for setting up scratch datasets
pub struct TestContextBuilder {
    temp_dir: TempDir,
    with_git: bool,
    with_datalad_dir: bool,
    git_user_email: String,
    git_user_name: String,
    initial_files: Vec<(PathBuf, String)>,
}

impl TestContextBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
            with_git: false,
            with_datalad_dir: false,
            git_user_email: "test@example.com".to_string(),
            git_user_name: "Test User".to_string(),
            initial_files: Vec::new(),
        })
    }

    /// Enable git repository initialization
    pub fn with_git(mut self) -> Self {
        self.with_git = true;
        self
    }

    pub fn with_git_user(mut self, email: &str, name: &str) -> Self {
        self.git_user_email = email.to_string();
        self.git_user_name = name.to_string();
        self.with_git = true;
        self
    }

    /// Create an empty `.datalad` directory so the tree opens as a full dataset
    pub fn with_datalad_dir(mut self) -> Self {
        self.with_datalad_dir = true;
        self
    }

    /// Add an initial file (left uncommitted)
    pub fn with_file(mut self, path: impl AsRef<Path>, content: &str) -> Self {
        self.initial_files
            .push((path.as_ref().to_path_buf(), content.to_string()));
        self
    }

    pub fn build(self) -> Result<TestContext> {
        let path = self.temp_dir.path();

        if self.with_git {
            init_git_repo(path)?;
            configure_git_user(path, &self.git_user_email, &self.git_user_name)?;
        }

        if self.with_datalad_dir {
            fs::create_dir_all(path.join(".datalad"))?;
        }

        for (file_path, content) in self.initial_files {
            let full_path = path.join(file_path);
            if let Some(parent) = full_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(full_path, content)?;
        }

        Ok(TestContext {
            temp_dir: self.temp_dir,
            commits: 0,
        })
    }
}

/// Scratch dataset that is removed when dropped
pub struct TestContext {
    temp_dir: TempDir,
    commits: u32,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn create_file(&self, path: impl AsRef<Path>, content: &str) -> Result<PathBuf> {
        let full_path = self.temp_dir.path().join(path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full_path, content)?;
        Ok(full_path)
    }

    pub fn read_file(&self, path: impl AsRef<Path>) -> Result<String> {
        Ok(fs::read_to_string(self.temp_dir.path().join(path))?)
    }

    pub fn file_exists(&self, path: impl AsRef<Path>) -> bool {
        self.temp_dir.path().join(path).exists()
    }

    /// Run a git command in the test directory
    pub fn git_command(&self, args: &[&str]) -> Result<std::process::Output> {
        Ok(Command::new("git")
            .current_dir(self.path())
            .args(args)
            .output()?)
    }

    /// Stage everything and commit it, returning the new commit hash.
    ///
    /// Each commit gets a distinct timestamp one hour after the previous one
    /// so that history ordering does not depend on wall-clock resolution.
    pub fn commit_all(&mut self, message: &str) -> Result<String> {
        self.commits += 1;
        let date = format!("2024-03-01T{:02}:00:00+00:00", self.commits);

        let add = self.git_command(&["add", "-A"])?;
        if !add.status.success() {
            bail!("git add failed: {}", String::from_utf8_lossy(&add.stderr));
        }

        let commit = Command::new("git")
            .current_dir(self.path())
            .args(["-c", "commit.gpgsign=false", "commit", "-q", "-m", message])
            .env("GIT_AUTHOR_DATE", &date)
            .env("GIT_COMMITTER_DATE", &date)
            .output()?;
        if !commit.status.success() {
            bail!(
                "git commit failed: {}",
                String::from_utf8_lossy(&commit.stderr)
            );
        }
        self.head()
    }

    pub fn head(&self) -> Result<String> {
        let output = self.git_command(&["rev-parse", "HEAD"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Subject line of the HEAD commit
    pub fn head_subject(&self) -> Result<String> {
        let output = self.git_command(&["log", "-1", "--pretty=format:%s"])?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Raw bytes of `path` as stored in `revision`
    pub fn show_bytes(&self, revision: &str, path: &str) -> Result<Vec<u8>> {
        let output = self.git_command(&["show", &format!("{revision}:{path}")])?;
        if !output.status.success() {
            bail!("git show failed: {}", String::from_utf8_lossy(&output.stderr));
        }
        Ok(output.stdout)
    }
}

pub fn init_git_repo(path: &Path) -> Result<()> {
    let output = Command::new("git")
        .current_dir(path)
        .args(["init", "-q"])
        .output()?;
    if !output.status.success() {
        bail!("git init failed: {}", String::from_utf8_lossy(&output.stderr));
    }
    Ok(())
}

pub fn configure_git_user(path: &Path, email: &str, name: &str) -> Result<()> {
    Command::new("git")
        .current_dir(path)
        .args(["config", "user.email", email])
        .output()?;

    Command::new("git")
        .current_dir(path)
        .args(["config", "user.name", name])
        .output()?;

    Ok(())
}

/// True when a `git` binary can be executed
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}
