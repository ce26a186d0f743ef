use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use commitgraph_core::CommitRecord;
use tracing::debug;

use crate::error::{Result, SourceError};
use crate::log_parser::{LOG_FORMAT, parse_git_log_records};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// One page of `git log`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub limit: usize,
    pub skip: usize,
    pub all_refs: bool,
}

impl LogQuery {
    pub fn page(limit: usize, skip: usize) -> Self {
        Self {
            limit,
            skip,
            all_refs: false,
        }
    }

    pub fn next_page(&self) -> Self {
        Self {
            skip: self.skip + self.limit,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitRunner {
    git_binary: String,
}

impl Default for GitRunner {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitRunner {
    pub fn new(git_binary: impl Into<String>) -> Self {
        Self {
            git_binary: git_binary.into(),
        }
    }

    pub fn git_binary(&self) -> &str {
        &self.git_binary
    }

    pub fn validate_repo(&self, repo_path: &Path) -> Result<()> {
        if !repo_path.is_dir() {
            return Err(SourceError::InvalidRepository(repo_path.to_path_buf()));
        }
        let out = self.exec(
            repo_path,
            &["rev-parse".to_string(), "--is-inside-work-tree".to_string()],
            true,
        )?;
        if out.stdout.trim() == "true" {
            return Ok(());
        }
        Err(SourceError::InvalidRepository(repo_path.to_path_buf()))
    }

    pub fn discover_repo_root(&self, start_path: &Path) -> Result<PathBuf> {
        let out = self.exec(
            start_path,
            &["rev-parse".to_string(), "--show-toplevel".to_string()],
            false,
        )?;
        let root = out.stdout.trim();
        if root.is_empty() {
            return Err(SourceError::InvalidRepository(start_path.to_path_buf()));
        }
        Ok(PathBuf::from(root))
    }

    /// Runs `git log` in topological order and parses one page of records.
    pub fn load_page(&self, repo_path: &Path, query: &LogQuery) -> Result<Vec<CommitRecord>> {
        let mut args = vec![
            "-c".to_string(),
            "color.ui=never".to_string(),
            "log".to_string(),
            "--topo-order".to_string(),
            "--decorate=full".to_string(),
            "--color=never".to_string(),
            format!("--pretty=format:{LOG_FORMAT}"),
            "--no-show-signature".to_string(),
            "--no-notes".to_string(),
            "-n".to_string(),
            query.limit.to_string(),
            "--skip".to_string(),
            query.skip.to_string(),
        ];
        if query.all_refs {
            args.push("--all".to_string());
        }

        let out = self.exec(repo_path, &args, true)?;
        if out.exit_code != Some(0) {
            // An unborn branch has no history yet.
            if out.stderr.contains("does not have any commits") {
                return Ok(Vec::new());
            }
            return Err(SourceError::GitCommandFailed {
                program: self.git_binary.clone(),
                args,
                exit_code: out.exit_code,
                stderr: out.stderr,
            });
        }
        let records = parse_git_log_records(&out.stdout)?;
        debug!(
            repo = %repo_path.display(),
            skip = query.skip,
            records = records.len(),
            "loaded git log page"
        );
        Ok(records)
    }

    pub fn exec(
        &self,
        repo_path: &Path,
        args: &[String],
        allow_non_zero: bool,
    ) -> Result<GitOutput> {
        let output = Command::new(&self.git_binary)
            .current_dir(repo_path)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| SourceError::io("running git command", source))?;
        let result = GitOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code(),
        };
        if output.status.success() || allow_non_zero {
            return Ok(result);
        }
        Err(SourceError::GitCommandFailed {
            program: self.git_binary.clone(),
            args: args.to_vec(),
            exit_code: result.exit_code,
            stderr: result.stderr,
        })
    }
}
