use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("server returned {status} for {url}")]
    Status { url: String, status: reqwest::StatusCode },

    #[error("failed to write {path}: {source}")]
    Io { path: String, source: std::io::Error },
}

/// Download `url` into `path`, creating parent directories and showing a
/// progress bar on stderr.
pub async fn download_file_from_url(url: &str, path: impl AsRef<Path>) -> Result<(), DownloadError> {
    let path = path.as_ref();
    let io_err = |source| DownloadError::Io {
        path: path.display().to_string(),
        source,
    };
    let http_err = |source| DownloadError::Http {
        url: url.to_string(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    info!("downloading {} to {}", url, path.display());
    let mut response = reqwest::get(url).await.map_err(http_err)?;
    if !response.status().is_success() {
        return Err(DownloadError::Status {
            url: url.to_string(),
            status: response.status(),
        });
    }

    let progress = match response.content_length() {
        Some(total) => ProgressBar::new(total).with_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        ),
        None => ProgressBar::new_spinner(),
    };

    // renamed into place once complete
    let partial = path.with_extension("part");
    let mut file = tokio::fs::File::create(&partial).await.map_err(io_err)?;
    while let Some(chunk) = response.chunk().await.map_err(http_err)? {
        file.write_all(&chunk).await.map_err(io_err)?;
        progress.inc(chunk.len() as u64);
    }
    file.flush().await.map_err(io_err)?;
    drop(file);
    tokio::fs::rename(&partial, path).await.map_err(io_err)?;

    progress.finish_and_clear();
    Ok(())
}
