//! `resploot-archive` — pin capture, attachment retrieval and durable JSON
//! export.
//!
//! The pipeline runs before any destructive reset step: pins are snapshotted
//! into [`PinRecord`]s, their attachments downloaded with bounded timeouts
//! and a concurrency cap, and everything written as one append-only
//! [`ArchiveFile`] per reset event. Failures below the document-write level
//! are isolated: a dead attachment URL yields `downloaded: false` with an
//! error note, never a lost archive.

pub mod download;
pub mod error;
pub mod pipeline;
pub mod types;
pub mod writer;

pub use download::AttachmentDownloader;
pub use error::{ArchiveError, Result};
pub use pipeline::ArchivePipeline;
pub use types::{ArchiveFile, AttachmentRecord, PinAuthor, PinRecord, ReactionRecord};
pub use writer::ArchiveWriter;
