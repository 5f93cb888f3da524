//! # Per-run state handed to a task.
//!
//! [`State`] is what a command sees of its process: name, standard streams,
//! logger, environment, options and working directory. The task owns it for
//! the duration of one run; dropping it closes the streams.

use std::fmt;
use std::io;
use std::path::{Component, Path, PathBuf};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::env::Env;
use crate::log::Logger;
use crate::opts::Opts;

/// Boxed input stream.
pub type Reader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed output stream.
pub type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// Everything a run knows about its process.
pub struct State {
    /// Invocation name (`argv[0]`).
    pub name: String,

    pub stdin: Reader,
    pub stdout: Writer,
    pub stderr: Writer,

    pub log: Logger,
    pub env: Env,
    pub opts: Opts,

    /// Working directory relative paths are resolved against.
    pub pwd: PathBuf,
}

impl State {
    /// Reads `fp`, where `-` means standard input.
    pub async fn read_path(&mut self, fp: &str) -> io::Result<Vec<u8>> {
        if fp == "-" {
            let mut buf = Vec::new();
            self.stdin.read_to_end(&mut buf).await?;
            return Ok(buf);
        }
        tokio::fs::read(self.abs_path(fp)).await
    }

    /// Writes `p` to `fp`, where `-` means standard output (closed afterwards).
    pub async fn write_path(&mut self, fp: &str, p: &[u8]) -> io::Result<()> {
        if fp == "-" {
            self.stdout.write_all(p).await?;
            return self.stdout.shutdown().await;
        }
        tokio::fs::write(self.abs_path(fp), p).await
    }

    /// Joins `pwd` with `fp`; `-` and absolute paths are returned unchanged.
    pub fn abs_path(&self, fp: &str) -> PathBuf {
        let path = Path::new(fp);
        if fp == "-" || path.is_absolute() {
            return path.to_path_buf();
        }
        self.pwd.join(path)
    }

    /// Makes `fp` friendlier for humans: `$HOME` becomes `~` and the result is
    /// relative to `pwd` when possible.
    pub fn human_path(&self, fp: &str) -> PathBuf {
        if fp == "-" {
            return PathBuf::from(fp);
        }
        let home = self.env.getenv("HOME").filter(|h| !h.is_empty());
        let fp = tilde(&self.abs_path(fp), home.as_deref());
        let pwd = tilde(&self.pwd, home.as_deref());

        relative_to(&pwd, &fp).unwrap_or(fp)
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("name", &self.name)
            .field("log", &self.log)
            .field("opts", &self.opts)
            .field("pwd", &self.pwd)
            .finish_non_exhaustive()
    }
}

fn tilde(path: &Path, home: Option<&str>) -> PathBuf {
    match home.and_then(|h| path.strip_prefix(h).ok()) {
        Some(rest) => Path::new("~").join(rest),
        None => path.to_path_buf(),
    }
}

/// Lexical `path` relative to `base`; `None` when they have different roots.
fn relative_to(base: &Path, path: &Path) -> Option<PathBuf> {
    let base: Vec<Component<'_>> = base.components().collect();
    let path: Vec<Component<'_>> = path.components().collect();
    if base.first() != path.first() {
        return None;
    }

    let common = base
        .iter()
        .zip(path.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for c in &path[common..] {
        rel.push(c.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    Some(rel)
}
