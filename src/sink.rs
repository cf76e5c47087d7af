use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::errors::Result;
use crate::net::{BodyStream, Response};

impl Response {
    /// Streams the body into the file at `path`, creating missing parent directories.
    ///
    /// Relative paths are resolved against the current directory; the absolute path written to is
    /// returned. A partially written file is left in place if the body stream or the disk fails.
    pub async fn save_file(self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = std::path::absolute(path.as_ref())?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&path).await?;
        let copied = copy(self.into_stream(), &mut file).await;
        // Whatever was copied before a failure still reaches the disk
        file.flush().await?;
        let written = copied?;

        log::debug!("saved {written} bytes to {}", path.display());
        Ok(path)
    }
}

async fn copy(mut stream: BodyStream, file: &mut tokio::fs::File) -> std::io::Result<u64> {
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    Ok(written)
}
