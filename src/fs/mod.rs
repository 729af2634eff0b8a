//! Static file serving for [`Router::serve_static`](crate::Router::serve_static).

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use thiserror::Error;
use tracing::debug;

use crate::{Response, StatusCode, handler::{Error, HandlerResult}};

const INDEX_FILE: &str = "index.html";

#[derive(Debug, Error)]
pub enum StaticError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("path escapes the served directory: {0}")]
    Forbidden(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<StaticError> for Error {
    fn from(err: StaticError) -> Self {
        match err {
            // Traversal attempts look exactly like misses from the outside.
            StaticError::NotFound(_) | StaticError::Forbidden(_) => {
                Error::not_found(StatusCode::NotFound.canonical_reason())
            }
            StaticError::Io(e) => Error::internal(format!("failed to read file: {e}")),
        }
    }
}

/// A directory whose files are served read-only.
#[derive(Debug, Clone)]
pub struct StaticDir {
    root: PathBuf,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Serves the file at `relative` under the root.
    ///
    /// Directories serve their `index.html`. Paths that try to leave the root
    /// and files that do not exist both answer `404`.
    pub async fn serve(&self, relative: &str) -> HandlerResult {
        let path = self.resolve(relative)?;
        let (path, body) = read(path).await.map_err(|err| {
            debug!(relative, error = %err, "static file not served");
            err
        })?;

        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        Ok(Response::new(StatusCode::Ok)
            .header("Content-Type", mime.essence_str())
            .body_bytes(body))
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf, StaticError> {
        let mut path = self.root.clone();
        for component in Path::new(relative.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(StaticError::Forbidden(relative.to_owned()));
                }
            }
        }
        Ok(path)
    }
}

async fn read(path: PathBuf) -> Result<(PathBuf, Vec<u8>), StaticError> {
    let meta = match tokio::fs::metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StaticError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let path = if meta.is_dir() { path.join(INDEX_FILE) } else { path };
    match tokio::fs::read(&path).await {
        Ok(body) => Ok((path, body)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(StaticError::NotFound(path.display().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}
