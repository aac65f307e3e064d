//! Temporary script artifacts.
//!
//! An [`Artifact`] is a uniquely named file holding one generated script.
//! It is owned by exactly one invocation and deleted when the guard is
//! released or dropped, whichever comes first. Concurrent creates never
//! share a path: names combine the process id, a process-wide sequence
//! number and a random token, and the file is opened with create-new
//! semantics so a stale file from another process is never reused.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncWriteExt;

use super::error::InvocationError;

/// Default file name prefix for artifacts.
pub const DEFAULT_PREFIX: &str = "agentdash";

/// Default file extension for artifacts.
pub const DEFAULT_EXTENSION: &str = "sh";

/// How many fresh names `create` tries before giving up on collisions.
const MAX_NAME_ATTEMPTS: usize = 8;

static NEXT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Creates artifacts inside a single directory.
#[derive(Debug, Clone)]
pub struct ArtifactManager {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl ArtifactManager {
    /// Manager writing into `dir` (created on first use).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Write `content` to a fresh unique path and return its guard.
    ///
    /// On failure no file is left behind.
    pub async fn create(&self, content: &str) -> Result<Artifact, InvocationError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| InvocationError::ArtifactWrite {
                path: self.dir.clone(),
                source,
            })?;
        // Absolute, so the interpreter finds it from any working directory.
        let dir = tokio::fs::canonicalize(&self.dir)
            .await
            .map_err(|source| InvocationError::ArtifactWrite {
                path: self.dir.clone(),
                source,
            })?;

        let mut last_collision = None;
        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = self.next_path(&dir);
            let mut file = match open_new(&path).await {
                Ok(file) => file,
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path.display(), "Artifact name collision, retrying");
                    last_collision = Some((path, err));
                    continue;
                }
                Err(source) => return Err(InvocationError::ArtifactWrite { path, source }),
            };

            // From here on the guard owns the file, so a failed write cleans up.
            let artifact = Artifact::new(path);
            let written = async {
                file.write_all(content.as_bytes()).await?;
                file.flush().await
            }
            .await;

            if let Err(source) = written {
                let path = artifact.path().to_path_buf();
                drop(file);
                artifact.release().await;
                return Err(InvocationError::ArtifactWrite { path, source });
            }

            tracing::debug!(path = %artifact.path().display(), bytes = content.len(), "Artifact created");
            return Ok(artifact);
        }

        let (path, source) = last_collision.unwrap_or_else(|| {
            (
                dir.clone(),
                std::io::Error::other("no artifact name attempts were made"),
            )
        });
        Err(InvocationError::ArtifactWrite { path, source })
    }

    fn next_path(&self, dir: &Path) -> PathBuf {
        let seq = NEXT_SEQ.fetch_add(1, Ordering::Relaxed);
        let token: u32 = rand::random();
        let name = format!(
            "{}-{}-{}-{:08x}.{}",
            self.prefix,
            std::process::id(),
            seq,
            token,
            self.extension
        );
        dir.join(name)
    }
}

async fn open_new(path: &Path) -> std::io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

/// Scoped handle to one artifact file.
///
/// The file is removed by [`release`](Self::release) or, failing that, on
/// drop. Removal errors are logged and otherwise ignored so they can never
/// replace the invocation's own result.
#[derive(Debug)]
pub struct Artifact {
    path: PathBuf,
    released: bool,
}

impl Artifact {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file now.
    ///
    /// If this future is dropped before the removal finishes, the guard's
    /// `Drop` removes the file instead.
    pub async fn release(mut self) {
        let result = tokio::fs::remove_file(&self.path).await;
        self.released = true;
        log_removal(&self.path, result);
    }
}

impl Drop for Artifact {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        log_removal(&self.path, std::fs::remove_file(&self.path));
    }
}

fn log_removal(path: &Path, result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::debug!(path = %path.display(), "Artifact released"),
        Err(err) => tracing::warn!(
            path = %path.display(),
            error = %err,
            "Failed to remove artifact"
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
