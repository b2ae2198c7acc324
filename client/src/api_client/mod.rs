// Typed wrapper over the `file_uploads` resource. Nothing here owns a
// connection or caches records: every call goes through the injected
// transport and hands back whatever the service answered.
mod errors;
mod multipart;

use std::{path::Path, sync::Arc};

use file_upload_library::{
    CreateRequest,
    models::{FILE_UPLOAD_OBJECT, PartNumber, UploadId, UploadRecord},
};
use reqwest::{Method, StatusCode};
use tokio::io::AsyncRead;
use tracing::{debug, instrument};

pub use crate::api_client::{
    errors::{EncodingError, Operation, ProtocolError, UploadError},
    multipart::{EncodedForm, MultipartEncoder},
};
use crate::{
    file_manager::{FileOpener, TokioFileOpener},
    transport::{Transport, TransportRequest, TransportResponse},
};

const FILE_UPLOADS_PATH: &str = "file_uploads";
const PART_NUMBER_FIELD: &str = "part_number";

fn upload_path(id: &UploadId, action: Option<&str>) -> String {
    let id = urlencoding::encode(id.as_str());
    match action {
        Some(action) => format!("{FILE_UPLOADS_PATH}/{id}/{action}"),
        None => format!("{FILE_UPLOADS_PATH}/{id}"),
    }
}

#[derive(Clone)]
pub struct FileUploadClient {
    transport: Arc<dyn Transport>,
    file_opener: Arc<dyn FileOpener>,
    encoder: MultipartEncoder,
}

impl FileUploadClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_file_opener(transport, Arc::new(TokioFileOpener))
    }

    pub fn with_file_opener(transport: Arc<dyn Transport>, file_opener: Arc<dyn FileOpener>) -> Self {
        Self {
            transport,
            file_opener,
            encoder: MultipartEncoder::new(),
        }
    }

    /// Creates an upload slot. The returned record is normally `pending` and
    /// carries the URLs needed for the next steps.
    #[instrument(skip(self, request), fields(mode = %request.mode()))]
    pub async fn create(&self, request: &CreateRequest) -> Result<UploadRecord, UploadError> {
        let operation = Operation::new("create");

        request
            .validate()
            .map_err(|reason| UploadError::validation(operation.clone(), reason))?;

        let body = serde_json::to_value(request).map_err(|e| UploadError::Encoding {
            operation: operation.clone(),
            source: EncodingError::from(e),
        })?;

        let resp = self
            .exchange(
                &operation,
                TransportRequest::new(Method::POST, FILE_UPLOADS_PATH).with_json(body),
            )
            .await?;

        let record = decode_record(&operation, &resp)?;
        debug!(id = %record.id, status = %record.status, "upload slot created");

        Ok(record)
    }

    /// Transmits `content` (a whole file, or one part of a multi-part upload)
    /// to the slot `id`.
    ///
    /// The service answers without a body; retrieve the record afterwards to
    /// observe the new status. Parts of the same upload may be sent
    /// concurrently, nothing is serialized here.
    #[instrument(skip(self, content), fields(id = %id, file_name = file_name, part_number = ?part_number))]
    pub async fn send<R>(
        &self,
        id: &UploadId,
        content: &mut R,
        file_name: &str,
        part_number: Option<PartNumber>,
    ) -> Result<(), UploadError>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let operation = Operation::for_upload("send", id);

        if file_name.trim().is_empty() {
            return Err(UploadError::validation(operation, "file name must not be empty"));
        }

        let fields: Vec<(&str, String)> = part_number
            .map(|part| (PART_NUMBER_FIELD, part.to_string()))
            .into_iter()
            .collect();

        let form = self
            .encoder
            .encode(content, file_name, &fields)
            .await
            .map_err(|source| UploadError::Encoding {
                operation: operation.clone(),
                source,
            })?;

        debug!(bytes = form.body.len(), "multipart body encoded");

        let request = TransportRequest::new(Method::POST, upload_path(id, Some("send")))
            .with_bytes(form.body, form.content_type);

        self.exchange(&operation, request).await?;

        Ok(())
    }

    /// Opens `path`, sends it under its base name, and closes it again on
    /// every outcome.
    #[instrument(skip(self), fields(id = %id, path = %path.display()))]
    pub async fn send_file_by_path(
        &self,
        id: &UploadId,
        path: &Path,
        part_number: Option<PartNumber>,
    ) -> Result<(), UploadError> {
        let mut file = self
            .file_opener
            .open(path)
            .await
            .map_err(|source| UploadError::Io {
                operation: Operation::for_upload("send_file_by_path", id),
                path: path.to_path_buf(),
                source,
            })?;

        // `file` is dropped when this returns, closing the handle
        self.send(id, &mut file.reader, &file.name, part_number).await
    }

    /// Fetches the current record, e.g. to observe `uploaded` after `send`.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn retrieve(&self, id: &UploadId) -> Result<UploadRecord, UploadError> {
        let operation = Operation::for_upload("retrieve", id);

        let resp = self
            .exchange(&operation, TransportRequest::new(Method::GET, upload_path(id, None)))
            .await?;

        decode_record(&operation, &resp)
    }

    /// Finalizes a multi-part upload once every part has been sent.
    #[instrument(skip(self), fields(id = %id))]
    pub async fn complete(&self, id: &UploadId) -> Result<UploadRecord, UploadError> {
        let operation = Operation::for_upload("complete", id);

        let request = TransportRequest::new(Method::POST, upload_path(id, Some("complete")))
            .with_json(serde_json::json!({}));
        let resp = self.exchange(&operation, request).await?;

        let record = decode_record(&operation, &resp)?;
        debug!(status = %record.status, "multi-part upload completed");

        Ok(record)
    }

    async fn exchange(
        &self,
        operation: &Operation,
        request: TransportRequest,
    ) -> Result<TransportResponse, UploadError> {
        let resp = self
            .transport
            .request(request)
            .await
            .map_err(|source| UploadError::Transport {
                operation: operation.clone(),
                source,
            })?;

        if resp.status != StatusCode::OK {
            return Err(UploadError::from_response(operation.clone(), resp));
        }

        Ok(resp)
    }
}

fn decode_record(operation: &Operation, resp: &TransportResponse) -> Result<UploadRecord, UploadError> {
    let record: UploadRecord = serde_json::from_slice(&resp.body).map_err(|source| {
        UploadError::protocol(
            operation.clone(),
            ProtocolError::Decode {
                body: resp.body_text(),
                source,
            },
        )
    })?;

    if record.object != FILE_UPLOAD_OBJECT {
        return Err(UploadError::protocol(
            operation.clone(),
            ProtocolError::UnexpectedObject(record.object),
        ));
    }

    Ok(record)
}
