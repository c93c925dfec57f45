use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::info;

use resploot_core::config::ArchiveConfig;

use crate::download::AttachmentDownloader;
use crate::error::Result;
use crate::types::{ArchiveFile, PinRecord};
use crate::writer::ArchiveWriter;

/// The full capture path run before a channel is destroyed: order the pins,
/// pull their attachments, write the archive document.
pub struct ArchivePipeline {
    writer: ArchiveWriter,
    downloader: AttachmentDownloader,
    attachments_dir: PathBuf,
    tz: Tz,
}

impl ArchivePipeline {
    pub fn new(cfg: &ArchiveConfig, tz: Tz) -> Result<Self> {
        let downloader = AttachmentDownloader::new(
            Duration::from_secs(cfg.request_timeout_secs),
            Duration::from_secs(cfg.attachment_timeout_secs),
            cfg.download_concurrency,
        )?;
        let dir = PathBuf::from(&cfg.dir);
        Ok(Self {
            writer: ArchiveWriter::new(&dir),
            downloader,
            attachments_dir: dir.join("attachments"),
            tz,
        })
    }

    /// Archive one channel's pins. Returns the path of the written document.
    ///
    /// Pins are ordered oldest-first regardless of the order the platform
    /// returned them. Attachment failures are recorded per attachment and the
    /// document is written regardless; only the final write itself can fail.
    pub async fn archive(&self, channel: &str, mut pins: Vec<PinRecord>) -> Result<PathBuf> {
        pins.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let now = Utc::now().with_timezone(&self.tz);
        let stamp = now.format("%Y%m%d_%H%M%S").to_string();

        for pin in &mut pins {
            self.downloader
                .fetch_all(&mut pin.attachments, &self.attachments_dir, &stamp)
                .await?;
        }

        let archive = ArchiveFile {
            channel_name: channel.to_string(),
            reset_timestamp: now.to_rfc3339(),
            pin_count: pins.len(),
            pins,
        };
        let path = self.writer.write(&archive, &stamp)?;
        info!(%channel, pins = archive.pin_count, "pins archived");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttachmentRecord, PinAuthor};

    fn tz() -> Tz {
        "America/Los_Angeles".parse().unwrap()
    }

    fn cfg(dir: &std::path::Path) -> ArchiveConfig {
        ArchiveConfig {
            dir: dir.to_string_lossy().into_owned(),
            forward_channel: None,
            request_timeout_secs: 5,
            attachment_timeout_secs: 2,
            download_concurrency: 2,
        }
    }

    fn pin(id: u64, created_at: &str) -> PinRecord {
        PinRecord {
            id,
            author: PinAuthor {
                name: "Resploot".into(),
                username: "resploot#0".into(),
                id: 7,
                avatar_url: None,
            },
            content: format!("pin {id}"),
            created_at: created_at.into(),
            jump_url: format!("https://discord.com/channels/1/2/{id}"),
            attachments: vec![],
            embeds: vec![],
            reactions: vec![],
        }
    }

    #[tokio::test]
    async fn pins_are_written_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ArchivePipeline::new(&cfg(dir.path()), tz()).unwrap();

        let pins = vec![
            pin(3, "2024-01-03T00:00:00+00:00"),
            pin(1, "2024-01-01T00:00:00+00:00"),
            pin(2, "2024-01-02T00:00:00+00:00"),
        ];
        let path = pipeline.archive("daily-chat", pins).await.unwrap();

        let raw = std::fs::read_to_string(path).unwrap();
        let archive: ArchiveFile = serde_json::from_str(&raw).unwrap();
        let ids: Vec<u64> = archive.pins.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(archive.pin_count, 3);
        assert_eq!(archive.channel_name, "daily-chat");
    }

    #[tokio::test]
    async fn attachment_failure_does_not_abort_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ArchivePipeline::new(&cfg(dir.path()), tz()).unwrap();

        let mut broken = pin(1, "2024-01-01T00:00:00+00:00");
        broken.attachments = vec![AttachmentRecord::new(
            "photo.png".into(),
            "not-a-url".into(),
            10,
            Some("image/png".into()),
        )];
        let intact = pin(2, "2024-01-02T00:00:00+00:00");

        let path = pipeline.archive("daily-chat", vec![broken, intact]).await.unwrap();

        let raw = std::fs::read_to_string(path).unwrap();
        let archive: ArchiveFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(archive.pins.len(), 2);
        assert!(!archive.pins[0].attachments[0].downloaded);
        assert!(archive.pins[0].attachments[0].error.is_some());
    }

    #[tokio::test]
    async fn zero_pins_still_produces_a_document() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = ArchivePipeline::new(&cfg(dir.path()), tz()).unwrap();

        let path = pipeline.archive("quiet", vec![]).await.unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let archive: ArchiveFile = serde_json::from_str(&raw).unwrap();
        assert_eq!(archive.pin_count, 0);
        assert!(archive.pins.is_empty());
    }
}
