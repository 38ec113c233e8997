//! Diff acquisition.
//!
//! A [`DiffSource`] produces the text that goes into a review request plus a
//! per-file summary for previews. [`GitDiffSource`] shells out to `git`.

use crate::config::DiffConfig;
use async_trait::async_trait;
use diffy::Hunk;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Diff acquisition errors.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to run git: {0}")]
    Io(#[from] std::io::Error),

    #[error("git diff timed out after {0:?}")]
    Timeout(Duration),

    #[error("git diff failed: {0}")]
    Git(String),
}

/// Summary of one file in a unified diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffFile {
    pub old_name: String,
    pub new_name: String,
    pub additions: usize,
    pub deletions: usize,
    pub is_new: bool,
    pub is_deleted: bool,
    pub is_rename: bool,
    pub is_binary: bool,
}

impl DiffFile {
    /// Name to show for the file.
    pub fn display_name(&self) -> String {
        if self.is_rename && self.old_name != self.new_name {
            format!("{} → {}", self.old_name, self.new_name)
        } else if self.is_deleted {
            self.old_name.clone()
        } else {
            self.new_name.clone()
        }
    }
}

/// Raw diff text plus its parsed file list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSnapshot {
    pub output: String,
    pub files: Vec<DiffFile>,
}

impl DiffSnapshot {
    pub fn from_output(output: String) -> Self {
        let files = parse_unified_diff(&output);
        Self { output, files }
    }

    pub fn is_empty(&self) -> bool {
        self.output.trim().is_empty()
    }
}

/// Source of the diff to review.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn check_diffs(&self) -> Result<DiffSnapshot, DiffError>;
}

/// Working-tree diff of a git repository against a base revision.
#[derive(Debug, Clone)]
pub struct GitDiffSource {
    repo: PathBuf,
    base: String,
    timeout: Duration,
}

impl GitDiffSource {
    pub fn new(repo: impl Into<PathBuf>, config: &DiffConfig) -> Self {
        Self {
            repo: repo.into(),
            base: config.base.clone(),
            timeout: config.timeout(),
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }
}

#[async_trait]
impl DiffSource for GitDiffSource {
    async fn check_diffs(&self) -> Result<DiffSnapshot, DiffError> {
        let args = [
            "diff",
            self.base.as_str(),
            "--no-color",
            "--no-ext-diff",
            "--no-textconv",
        ];

        let output = timeout(
            self.timeout,
            Command::new("git")
                .args(args)
                .current_dir(&self.repo)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| DiffError::Timeout(self.timeout))??;

        if !output.status.success() {
            return Err(DiffError::Git(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        let snapshot = DiffSnapshot::from_output(text);
        debug!(
            "git diff {} in {}: {} files",
            self.base,
            self.repo.display(),
            snapshot.files.len()
        );
        Ok(snapshot)
    }
}

/// Summarize a unified (`git diff`) diff per file.
///
/// Line counts come from parsing each file's patch; the git extended header
/// lines (mode changes, renames, binary markers) are read separately.
pub fn parse_unified_diff(diff: &str) -> Vec<DiffFile> {
    file_sections(diff).into_iter().map(summarize_file).collect()
}

/// Split `git diff` output into one section per `diff --git` header.
fn file_sections(diff: &str) -> Vec<&str> {
    let starts: Vec<usize> = diff
        .match_indices("diff --git ")
        .map(|(i, _)| i)
        .filter(|&i| i == 0 || diff.as_bytes()[i - 1] == b'\n')
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(diff.len());
            &diff[start..end]
        })
        .collect()
}

fn summarize_file(section: &str) -> DiffFile {
    let (header, body) = section.split_once('\n').unwrap_or((section, ""));
    let (old_name, new_name) = split_git_header(header.trim_start_matches("diff --git "));
    let mut file = DiffFile {
        old_name,
        new_name,
        ..Default::default()
    };

    for line in body.lines() {
        if line.starts_with("--- ") || line.starts_with("@@") {
            break;
        }
        if line.starts_with("new file mode") {
            file.is_new = true;
        } else if line.starts_with("deleted file mode") {
            file.is_deleted = true;
        } else if let Some(name) = line.strip_prefix("rename from ") {
            file.is_rename = true;
            file.old_name = unquote_git_path(name);
        } else if let Some(name) = line.strip_prefix("rename to ") {
            file.is_rename = true;
            file.new_name = unquote_git_path(name);
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            file.is_binary = true;
        }
    }

    let hunks_at = if body.starts_with("@@ ") {
        Some(0)
    } else {
        body.find("\n@@ ").map(|i| i + 1)
    };
    if let Some(at) = hunks_at {
        (file.additions, file.deletions) = count_changes(&body[at..]);
    }
    file
}

/// Count inserted and deleted lines in a file's hunks.
///
/// Paths were already taken from the git header, so the hunks get a plain
/// `---`/`+++` pair; git's quoted names would not survive the patch parser.
fn count_changes(hunks: &str) -> (usize, usize) {
    let patch = format!("--- a\n+++ b\n{}", hunks);
    match diffy::Patch::from_str(&patch) {
        Ok(patch) => patch
            .hunks()
            .iter()
            .flat_map(Hunk::lines)
            .fold((0, 0), |(a, d), line| match line {
                diffy::Line::Insert(_) => (a + 1, d),
                diffy::Line::Delete(_) => (a, d + 1),
                diffy::Line::Context(_) => (a, d),
            }),
        Err(e) => {
            debug!("Unparsable file patch: {}", e);
            (0, 0)
        }
    }
}

/// Old and new path from the text after `diff --git `.
fn split_git_header(rest: &str) -> (String, String) {
    let pair = if rest.starts_with('"') {
        take_quoted(rest).map(|(old, tail)| (old, tail.trim_start()))
    } else if rest.ends_with('"') {
        rest.rfind(" \"").map(|i| (&rest[..i], &rest[i + 1..]))
    } else {
        rest.split_once(" b/")
            .map(|(old, _)| (old, &rest[old.len() + 1..]))
    };

    match pair {
        Some((old, new)) => (strip_side(old, "a/"), strip_side(new, "b/")),
        None => (rest.to_string(), rest.to_string()),
    }
}

/// Leading quoted token and the remainder.
fn take_quoted(s: &str) -> Option<(&str, &str)> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some((&s[..=i], &s[i + 1..])),
            _ => i += 1,
        }
    }
    None
}

fn strip_side(raw: &str, prefix: &str) -> String {
    let path = unquote_git_path(raw);
    match path.strip_prefix(prefix) {
        Some(stripped) => stripped.to_string(),
        None => path,
    }
}

/// Undo git's C-style path quoting (`"a/\303\244.rs"` is `a/ä.rs`).
fn unquote_git_path(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };

    let src = inner.as_bytes();
    let mut out = Vec::with_capacity(src.len());
    let mut i = 0;
    while i < src.len() {
        if src[i] != b'\\' || i + 1 == src.len() {
            out.push(src[i]);
            i += 1;
            continue;
        }

        let octal = &src[i + 1..(i + 4).min(src.len())];
        if octal.len() == 3 && octal.iter().all(|b| (b'0'..=b'7').contains(b)) {
            let value = octal
                .iter()
                .fold(0u16, |acc, b| acc * 8 + u16::from(b - b'0'));
            out.push(value as u8);
            i += 4;
        } else {
            out.push(match src[i + 1] {
                b'n' => b'\n',
                b't' => b'\t',
                b'r' => b'\r',
                b'a' => 0x07,
                b'b' => 0x08,
                b'f' => 0x0c,
                b'v' => 0x0b,
                other => other,
            });
            i += 2;
        }
    }

    String::from_utf8_lossy(&out).into_owned()
}
