// The form is assembled with `reqwest::multipart` and drained into memory, so
// the transport gets a finished body it can replay on retries.
use std::pin::pin;

use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use reqwest::multipart::{Form, Part};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::api_client::errors::EncodingError;

const FILE_FIELD_NAME: &str = "file";
const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// A finished form body together with the content type announcing its boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedForm {
    pub body: Bytes,
    pub content_type: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MultipartEncoder;

impl MultipartEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Builds a form holding `content` as the `file` part, followed by the
    /// given text fields in order.
    ///
    /// `content` is read to the end before the form is built, so a read
    /// failure never yields a truncated body.
    pub async fn encode<R>(
        &self,
        content: &mut R,
        file_name: &str,
        fields: &[(&str, String)],
    ) -> Result<EncodedForm, EncodingError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let mut payload = Vec::new();
        content
            .read_to_end(&mut payload)
            .await
            .map_err(EncodingError::ReadContent)?;

        let file = Part::bytes(payload)
            .file_name(file_name.to_owned())
            .mime_str(FILE_CONTENT_TYPE)?;

        let form = fields
            .iter()
            .fold(Form::new().part(FILE_FIELD_NAME, file), |form, (name, value)| {
                form.text(name.to_string(), value.clone())
            });

        let content_type = format!("multipart/form-data; boundary={}", form.boundary());

        let mut body = BytesMut::new();
        let mut chunks = pin!(form.into_stream());
        while let Some(chunk) = chunks.try_next().await? {
            body.extend_from_slice(&chunk);
        }

        Ok(EncodedForm {
            body: body.freeze(),
            content_type,
        })
    }
}
