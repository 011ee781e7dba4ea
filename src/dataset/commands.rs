//! Argument vectors for every external command the engine issues.
//!
//! Components never assemble `git` or `datalad` invocations inline; they ask
//! [`Tools`] for the argv so the full command surface lives in one file.

/// Separator between `git log` records
pub const LOG_RECORD_SEPARATOR: char = '\u{1e}';

/// Pretty format for history queries, fields split on `|`
pub const LOG_FORMAT: &str = "--pretty=format:%H|%h|%an|%ae|%ad|%s|%b%x1e";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tools {
    git: String,
    datalad: String,
}

impl Default for Tools {
    fn default() -> Self {
        Self::new("git", "datalad")
    }
}

/// Pathspec that git matches byte for byte, without glob magic
pub fn literal_pathspec(path: &str) -> String {
    format!(":(literal){path}")
}

fn argv<I, S>(program: &str, args: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    std::iter::once(program.to_string())
        .chain(args.into_iter().map(Into::into))
        .collect()
}

impl Tools {
    pub fn new(git: &str, datalad: &str) -> Self {
        Self {
            git: git.to_string(),
            datalad: datalad.to_string(),
        }
    }

    pub fn git_program(&self) -> &str {
        &self.git
    }

    pub fn datalad_program(&self) -> &str {
        &self.datalad
    }

    fn git<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        argv(&self.git, args)
    }

    fn datalad<I, S>(&self, args: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        argv(&self.datalad, args)
    }

    // datalad

    pub fn datalad_status(&self) -> Vec<String> {
        self.datalad(["status"])
    }

    pub fn datalad_status_path(&self, path: &str) -> Vec<String> {
        self.datalad(["status", path])
    }

    pub fn datalad_status_annex(&self) -> Vec<String> {
        self.datalad(["status", "--annex"])
    }

    pub fn datalad_save_recursive(&self, message: &str) -> Vec<String> {
        self.datalad(["save", "-r", "-m", message])
    }

    pub fn datalad_save(&self, message: &str) -> Vec<String> {
        self.datalad(["save", "-m", message])
    }

    pub fn datalad_save_path(&self, message: &str, path: &str) -> Vec<String> {
        self.datalad(["save", "-m", message, path])
    }

    /// `datalad run -m M [-i IN].. [-o OUT].. <command>`
    pub fn datalad_run(
        &self,
        message: &str,
        inputs: &[String],
        outputs: &[String],
        command: &str,
    ) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-m".to_string(), message.to_string()];
        for input in inputs {
            args.push("-i".to_string());
            args.push(input.clone());
        }
        for output in outputs {
            args.push("-o".to_string());
            args.push(output.clone());
        }
        args.push(command.to_string());
        self.datalad(args)
    }

    pub fn datalad_create(&self, path: &str) -> Vec<String> {
        self.datalad(["create", path])
    }

    pub fn datalad_version(&self) -> Vec<String> {
        self.datalad(["--version"])
    }

    // git: working tree and index

    pub fn git_add(&self, path: &str) -> Vec<String> {
        self.git(["add".to_string(), "--".to_string(), literal_pathspec(path)])
    }

    pub fn git_commit(&self, message: &str) -> Vec<String> {
        self.git(["commit", "-m", message])
    }

    /// Commit only `path`, leaving the rest of the index staged
    pub fn git_commit_path(&self, message: &str, path: &str) -> Vec<String> {
        self.git([
            "commit".to_string(),
            "-m".to_string(),
            message.to_string(),
            "--".to_string(),
            literal_pathspec(path),
        ])
    }

    /// Exits 1 when `path` has staged changes, 0 when it has none
    pub fn git_staged_quiet(&self, path: &str) -> Vec<String> {
        self.git([
            "diff".to_string(),
            "--cached".to_string(),
            "--quiet".to_string(),
            "--".to_string(),
            literal_pathspec(path),
        ])
    }

    pub fn git_commit_amend(&self, message: &str) -> Vec<String> {
        self.git(["commit", "--amend", "-m", message])
    }

    pub fn git_status_porcelain(&self) -> Vec<String> {
        self.git(["status", "--porcelain"])
    }

    pub fn git_ls_files_error_unmatch(&self, path: &str) -> Vec<String> {
        self.git([
            "ls-files".to_string(),
            "--error-unmatch".to_string(),
            "--".to_string(),
            literal_pathspec(path),
        ])
    }

    pub fn git_checkout_file(&self, revision: &str, path: &str) -> Vec<String> {
        self.git([
            "checkout".to_string(),
            revision.to_string(),
            "--".to_string(),
            literal_pathspec(path),
        ])
    }

    pub fn git_checkout_new_branch(&self, branch: &str, revision: &str) -> Vec<String> {
        self.git(["checkout", "-b", branch, revision])
    }

    pub fn git_checkout_detached(&self, revision: &str) -> Vec<String> {
        self.git(["checkout", "--detach", revision])
    }

    pub fn git_revert(&self, revision: &str) -> Vec<String> {
        self.git(["revert", "--no-edit", revision])
    }

    // git: object database

    /// `git cat-file -e <rev>^{commit}`
    pub fn git_commit_exists(&self, revision: &str) -> Vec<String> {
        self.git(["cat-file".to_string(), "-e".to_string(), format!("{revision}^{{commit}}")])
    }

    /// `git cat-file -e <rev>:<path>`
    pub fn git_blob_exists(&self, revision: &str, path: &str) -> Vec<String> {
        self.git(["cat-file".to_string(), "-e".to_string(), format!("{revision}:{path}")])
    }

    /// `git cat-file -s <rev>:<path>`
    pub fn git_blob_size(&self, revision: &str, path: &str) -> Vec<String> {
        self.git(["cat-file".to_string(), "-s".to_string(), format!("{revision}:{path}")])
    }

    pub fn git_show_file(&self, revision: &str, path: &str) -> Vec<String> {
        self.git(["show".to_string(), format!("{revision}:{path}")])
    }

    pub fn git_show_file_diff(&self, revision: &str, path: &str) -> Vec<String> {
        self.git(["show", revision, "--", path])
    }

    pub fn git_show_name_status(&self, revision: &str) -> Vec<String> {
        self.git(["show", "-z", "--name-status", "--pretty=format:", revision])
    }

    pub fn git_rev_parse(&self, revision: &str) -> Vec<String> {
        self.git(["rev-parse", revision])
    }

    pub fn git_current_branch(&self) -> Vec<String> {
        self.git(["branch", "--show-current"])
    }

    pub fn git_diff_name_status(&self, from: &str, to: &str) -> Vec<String> {
        self.git(["diff", "-z", "--name-status", from, to])
    }

    // git: history

    pub fn git_log(&self, limit: usize) -> Vec<String> {
        self.git([
            "log".to_string(),
            LOG_FORMAT.to_string(),
            "--date=iso-strict".to_string(),
            "-n".to_string(),
            limit.to_string(),
        ])
    }

    pub fn git_log_file(&self, limit: usize, path: &str, follow: bool) -> Vec<String> {
        let mut args = self.git_log(limit);
        if follow {
            args.push("--follow".to_string());
        }
        args.push("--".to_string());
        args.push(path.to_string());
        args
    }
}
