use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Object tag the service puts on every file upload it returns.
pub const FILE_UPLOAD_OBJECT: &str = "file_upload";

pub const MIN_PART_NUMBER: u32 = 1;
pub const MAX_PART_NUMBER: u32 = 1000;

// Opaque token assigned by the service. It is only ever echoed back in paths,
// so no structure is assumed (they happen to be UUIDs today).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UploadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UploadId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for UploadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadMode {
    /// Whole file sent with a single `send` call.
    #[default]
    SinglePart,
    /// File split in parts, each sent with its part number, then completed.
    MultiPart,
    /// The service fetches the file itself from a public HTTPS URL.
    ExternalUrl,
}

impl Display for UploadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadMode::SinglePart => write!(f, "single_part"),
            UploadMode::MultiPart => write!(f, "multi_part"),
            UploadMode::ExternalUrl => write!(f, "external_url"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Uploaded,
    Expired,
    Failed,
}

impl UploadStatus {
    /// Terminal states are only ever left by the service, never by the client.
    pub fn is_terminal(self) -> bool {
        !matches!(self, UploadStatus::Pending)
    }
}

impl Display for UploadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadStatus::Pending => write!(f, "pending"),
            UploadStatus::Uploaded => write!(f, "uploaded"),
            UploadStatus::Expired => write!(f, "expired"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Sequence number of a chunk in a multi-part upload.
///
/// Only values accepted by the service (1 to 1000) can be built, so "no part
/// number" is always spelled `Option::None` and never `0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct PartNumber(u32);

impl PartNumber {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for PartNumber {
    type Error = &'static str;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if !(MIN_PART_NUMBER..=MAX_PART_NUMBER).contains(&value) {
            return Err("part number must be between 1 and 1000");
        }

        Ok(PartNumber(value))
    }
}

impl<'de> Deserialize<'de> for PartNumber {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        PartNumber::try_from(value).map_err(serde::de::Error::custom)
    }
}

impl Display for PartNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileImportResultKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileImportError {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
}

/// Outcome of the service fetching an `external_url` upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileImportResult {
    pub imported_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: FileImportResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FileImportError>,
}

/// Snapshot of an upload slot as reported by the service.
///
/// It is never refreshed in place: status transitions driven by the service
/// (expiry, external imports) are only visible by retrieving it again.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadRecord {
    pub object: String,
    pub id: UploadId,
    pub created_time: DateTime<Utc>,
    pub last_edited_time: DateTime<Utc>,
    #[serde(default)]
    pub expiry_time: Option<DateTime<Utc>>,
    pub status: UploadStatus,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub content_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_url: Option<String>,
    #[serde(default)]
    pub file_import_result: Option<FileImportResult>,
}

impl UploadRecord {
    pub fn is_pending(&self) -> bool {
        self.status == UploadStatus::Pending
    }

    /// A pending multi-part upload is the only kind that carries a completion URL.
    pub fn is_multi_part_pending(&self) -> bool {
        self.is_pending() && self.complete_url.as_deref().is_some_and(|u| !u.is_empty())
    }

    pub fn import_failed(&self) -> bool {
        self.file_import_result
            .as_ref()
            .is_some_and(|r| r.kind == FileImportResultKind::Error)
    }
}
