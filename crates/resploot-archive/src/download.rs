//! Bounded, failure-isolated attachment retrieval.

use std::path::Path;
use std::time::Duration;

use futures_util::{stream, StreamExt};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::AttachmentRecord;

/// Failure of one attachment download. Recorded on the attachment, never
/// propagated.
#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("download timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Downloads pin attachments next to the archive JSON.
///
/// Every fetch carries its own timeout, shorter than the client's overall
/// request timeout, so one stalled CDN response cannot hold the reset past
/// its window. Downloads within one pass run concurrently up to a fixed cap.
pub struct AttachmentDownloader {
    client: reqwest::Client,
    attachment_timeout: Duration,
    concurrency: usize,
}

impl AttachmentDownloader {
    pub fn new(
        request_timeout: Duration,
        attachment_timeout: Duration,
        concurrency: usize,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            client,
            attachment_timeout,
            concurrency: concurrency.max(1),
        })
    }

    /// Fetch every attachment into `dir`, marking each record as downloaded
    /// or recording its failure in place. Never returns an error for an
    /// individual download; only directory creation is fatal to the pass.
    pub async fn fetch_all(
        &self,
        records: &mut [AttachmentRecord],
        dir: &Path,
        stamp: &str,
    ) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        std::fs::create_dir_all(dir)?;

        // Own each job up front so the stream borrows nothing from `records`
        // while the mutable pass below is pending.
        let jobs: Vec<(usize, String, String, std::path::PathBuf)> = records
            .iter()
            .enumerate()
            .map(|(i, rec)| {
                let name = local_name(stamp, &rec.url, &rec.filename);
                let path = dir.join(&name);
                (i, rec.url.clone(), name, path)
            })
            .collect();

        let results: Vec<(usize, String, std::result::Result<usize, DownloadError>)> =
            stream::iter(jobs.into_iter().map(|(i, url, name, path)| async move {
                let outcome = self.fetch_one(&url, &path).await;
                (i, name, outcome)
            }))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for (i, name, outcome) in results {
            let rec = &mut records[i];
            match outcome {
                Ok(bytes) => {
                    debug!(filename = %rec.filename, bytes, "attachment downloaded");
                    rec.downloaded = true;
                    rec.local_filename = Some(name);
                }
                Err(e) => {
                    warn!(filename = %rec.filename, error = %e, "attachment download failed");
                    rec.error = Some(e.to_string());
                }
            }
        }
        Ok(())
    }

    async fn fetch_one(
        &self,
        url: &str,
        path: &Path,
    ) -> std::result::Result<usize, DownloadError> {
        let fetch = async {
            let resp = self.client.get(url).send().await?.error_for_status()?;
            let bytes = resp.bytes().await?;
            tokio::fs::write(path, &bytes).await?;
            Ok(bytes.len())
        };
        match tokio::time::timeout(self.attachment_timeout, fetch).await {
            Ok(outcome) => outcome,
            Err(_) => Err(DownloadError::Timeout(self.attachment_timeout.as_secs())),
        }
    }
}

/// Collision-resistant on-disk name: capture stamp, remote attachment id,
/// original filename. Two pins attaching the same `photo.png` in the same
/// reset still land on distinct ids.
pub(crate) fn local_name(stamp: &str, url: &str, filename: &str) -> String {
    let id = remote_id(url).unwrap_or("0");
    format!("{stamp}_{id}_{filename}")
}

/// Attachment id from a CDN URL of the shape
/// `.../attachments/{channel_id}/{attachment_id}/{filename}`.
fn remote_id(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let mut parts = path.rsplit('/');
    parts.next()?;
    parts.next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_id_comes_from_the_second_to_last_path_segment() {
        assert_eq!(
            remote_id("https://cdn.discordapp.com/attachments/111/222/photo.png"),
            Some("222")
        );
        assert_eq!(
            remote_id("https://cdn.discordapp.com/attachments/111/222/photo.png?ex=abc&is=def"),
            Some("222")
        );
    }

    #[test]
    fn local_name_combines_stamp_id_and_filename() {
        assert_eq!(
            local_name(
                "20240101_043000",
                "https://cdn.discordapp.com/attachments/111/222/photo.png",
                "photo.png"
            ),
            "20240101_043000_222_photo.png"
        );
    }

    #[tokio::test]
    async fn failed_download_is_recorded_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let dl = AttachmentDownloader::new(
            Duration::from_secs(5),
            Duration::from_secs(2),
            2,
        )
        .unwrap();

        let mut records = vec![AttachmentRecord::new(
            "photo.png".into(),
            "not-a-url".into(),
            10,
            None,
        )];
        dl.fetch_all(&mut records, dir.path(), "20240101_043000")
            .await
            .unwrap();

        assert!(!records[0].downloaded);
        assert!(records[0].error.is_some());
        assert_eq!(records[0].local_filename, None);
    }
}
