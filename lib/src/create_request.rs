use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::models::{MAX_PART_NUMBER, MIN_PART_NUMBER, UploadMode};

/// Parameters for creating an upload slot.
///
/// Each mode only carries the fields that make sense for it. On the wire the
/// request is the flat object the service expects, with `mode` defaulting to
/// `single_part` when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CreateRequestBody", into = "CreateRequestBody")]
pub enum CreateRequest {
    SinglePart {
        filename: Option<String>,
        content_type: Option<String>,
    },
    MultiPart {
        filename: String,
        content_type: Option<String>,
        number_of_parts: u32,
    },
    ExternalUrl {
        filename: String,
        content_type: Option<String>,
        external_url: String,
    },
}

impl CreateRequest {
    pub fn single_part() -> Self {
        CreateRequest::SinglePart {
            filename: None,
            content_type: None,
        }
    }

    pub fn multi_part(filename: impl Into<String>, number_of_parts: u32) -> Self {
        CreateRequest::MultiPart {
            filename: filename.into(),
            content_type: None,
            number_of_parts,
        }
    }

    pub fn external_url(filename: impl Into<String>, external_url: impl Into<String>) -> Self {
        CreateRequest::ExternalUrl {
            filename: filename.into(),
            content_type: None,
            external_url: external_url.into(),
        }
    }

    /// Sets the file name. For single-part uploads the name is otherwise taken
    /// from the `send` call.
    pub fn with_filename(mut self, name: impl Into<String>) -> Self {
        match &mut self {
            CreateRequest::SinglePart { filename, .. } => *filename = Some(name.into()),
            CreateRequest::MultiPart { filename, .. } | CreateRequest::ExternalUrl { filename, .. } => {
                *filename = name.into()
            }
        }
        self
    }

    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            CreateRequest::SinglePart { content_type, .. }
            | CreateRequest::MultiPart { content_type, .. }
            | CreateRequest::ExternalUrl { content_type, .. } => *content_type = Some(value.into()),
        }
        self
    }

    pub fn mode(&self) -> UploadMode {
        match self {
            CreateRequest::SinglePart { .. } => UploadMode::SinglePart,
            CreateRequest::MultiPart { .. } => UploadMode::MultiPart,
            CreateRequest::ExternalUrl { .. } => UploadMode::ExternalUrl,
        }
    }

    pub fn filename(&self) -> Option<&str> {
        match self {
            CreateRequest::SinglePart { filename, .. } => filename.as_deref(),
            CreateRequest::MultiPart { filename, .. } | CreateRequest::ExternalUrl { filename, .. } => {
                Some(filename)
            }
        }
    }

    /// Checks what can be checked without asking the service. The service
    /// still has the final word, this only avoids pointless round trips.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            CreateRequest::SinglePart { filename, .. } => {
                if filename.as_deref().is_some_and(|f| f.trim().is_empty()) {
                    return Err("filename must not be empty when provided");
                }
            }
            CreateRequest::MultiPart {
                filename,
                content_type,
                number_of_parts,
            } => {
                if !(MIN_PART_NUMBER..=MAX_PART_NUMBER).contains(number_of_parts) {
                    return Err("number_of_parts must be between 1 and 1000");
                }
                validate_filename(filename, content_type.as_deref())?;
            }
            CreateRequest::ExternalUrl {
                filename,
                content_type,
                external_url,
            } => {
                validate_external_url(external_url)?;
                validate_filename(filename, content_type.as_deref())?;
            }
        }

        Ok(())
    }
}

fn validate_filename(filename: &str, content_type: Option<&str>) -> Result<(), &'static str> {
    if filename.trim().is_empty() {
        return Err("filename is required for multi_part and external_url uploads");
    }

    // The service infers the extension from the content type when it is missing
    let has_extension = Path::new(filename)
        .extension()
        .is_some_and(|ext| !ext.is_empty());
    if !has_extension && content_type.is_none_or(|ct| ct.trim().is_empty()) {
        return Err("filename must have an extension unless content_type is provided");
    }

    Ok(())
}

fn validate_external_url(external_url: &str) -> Result<(), &'static str> {
    if external_url.trim().is_empty() {
        return Err("external_url is required for external_url uploads");
    }

    let Ok(url) = Url::parse(external_url) else {
        return Err("external_url must be an absolute URL");
    };

    if url.scheme() != "https" {
        return Err("external_url must use https");
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err("external_url must have a host");
    }

    Ok(())
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct CreateRequestBody {
    #[serde(default)]
    mode: UploadMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    number_of_parts: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    external_url: Option<String>,
}

impl From<CreateRequest> for CreateRequestBody {
    fn from(request: CreateRequest) -> Self {
        match request {
            CreateRequest::SinglePart {
                filename,
                content_type,
            } => CreateRequestBody {
                mode: UploadMode::SinglePart,
                filename,
                content_type,
                ..Default::default()
            },
            CreateRequest::MultiPart {
                filename,
                content_type,
                number_of_parts,
            } => CreateRequestBody {
                mode: UploadMode::MultiPart,
                filename: Some(filename),
                content_type,
                number_of_parts: Some(number_of_parts),
                ..Default::default()
            },
            CreateRequest::ExternalUrl {
                filename,
                content_type,
                external_url,
            } => CreateRequestBody {
                mode: UploadMode::ExternalUrl,
                filename: Some(filename),
                content_type,
                external_url: Some(external_url),
                ..Default::default()
            },
        }
    }
}

// Fields that do not belong to the mode are dropped, the service ignores them too.
impl TryFrom<CreateRequestBody> for CreateRequest {
    type Error = &'static str;

    fn try_from(body: CreateRequestBody) -> Result<Self, Self::Error> {
        match body.mode {
            UploadMode::SinglePart => Ok(CreateRequest::SinglePart {
                filename: body.filename,
                content_type: body.content_type,
            }),
            UploadMode::MultiPart => Ok(CreateRequest::MultiPart {
                filename: body.filename.ok_or("multi_part uploads require filename")?,
                content_type: body.content_type,
                number_of_parts: body
                    .number_of_parts
                    .ok_or("multi_part uploads require number_of_parts")?,
            }),
            UploadMode::ExternalUrl => Ok(CreateRequest::ExternalUrl {
                filename: body.filename.ok_or("external_url uploads require filename")?,
                content_type: body.content_type,
                external_url: body
                    .external_url
                    .ok_or("external_url uploads require external_url")?,
            }),
        }
    }
}
