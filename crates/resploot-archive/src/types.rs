use serde::{Deserialize, Serialize};

/// Author snapshot taken at archive time. The live account may be renamed or
/// deleted later; the archive keeps what was true when the pin was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinAuthor {
    /// Display name in the guild.
    pub name: String,
    /// Global account handle.
    pub username: String,
    pub id: u64,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRecord {
    pub emoji: String,
    pub count: u64,
}

/// One attachment of a pinned message.
///
/// `downloaded == false` with `error` set is a valid terminal state: the
/// record still points at the remote URL, and the failure never aborts the
/// surrounding pin or archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub filename: String,
    pub url: String,
    pub size: u64,
    pub content_type: Option<String>,
    pub downloaded: bool,
    /// Name of the downloaded copy under the archive's `attachments/`
    /// subdirectory, once `downloaded` is true.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AttachmentRecord {
    pub fn new(filename: String, url: String, size: u64, content_type: Option<String>) -> Self {
        Self {
            filename,
            url,
            size,
            content_type,
            downloaded: false,
            local_filename: None,
            error: None,
        }
    }
}

/// Full capture of one pinned message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinRecord {
    pub id: u64,
    pub author: PinAuthor,
    pub content: String,
    /// RFC 3339 creation time. Kept as text so archives sort and display
    /// without re-parsing.
    pub created_at: String,
    pub jump_url: String,
    pub attachments: Vec<AttachmentRecord>,
    /// Raw embed payloads as the platform reported them.
    pub embeds: Vec<serde_json::Value>,
    pub reactions: Vec<ReactionRecord>,
}

/// One archive document, written once per reset-with-pins event and never
/// overwritten. Field names match the archive files earlier deployments
/// already produced, so existing viewers keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveFile {
    pub channel_name: String,
    pub reset_timestamp: String,
    pub pin_count: usize,
    pub pins: Vec<PinRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_attachment_serializes_error_and_omits_local_name() {
        let mut rec = AttachmentRecord::new(
            "photo.png".into(),
            "https://cdn.example/attachments/1/2/photo.png".into(),
            1024,
            Some("image/png".into()),
        );
        rec.error = Some("timed out".into());

        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["downloaded"], false);
        assert_eq!(json["error"], "timed out");
        assert!(json.get("local_filename").is_none());
    }

    #[test]
    fn archive_file_round_trips() {
        let archive = ArchiveFile {
            channel_name: "daily-chat".into(),
            reset_timestamp: "2024-01-01T04:30:00-08:00".into(),
            pin_count: 1,
            pins: vec![PinRecord {
                id: 42,
                author: PinAuthor {
                    name: "Resploot".into(),
                    username: "resploot#0".into(),
                    id: 7,
                    avatar_url: None,
                },
                content: "remember this".into(),
                created_at: "2023-12-30T10:00:00+00:00".into(),
                jump_url: "https://discord.com/channels/1/2/42".into(),
                attachments: vec![],
                embeds: vec![],
                reactions: vec![ReactionRecord {
                    emoji: "👍".into(),
                    count: 3,
                }],
            }],
        };

        let json = serde_json::to_string(&archive).unwrap();
        let back: ArchiveFile = serde_json::from_str(&json).unwrap();
        assert_eq!(back, archive);
    }
}
