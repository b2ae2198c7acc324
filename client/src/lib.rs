mod api_client;
mod file_manager;
pub mod transport;

pub use crate::api_client::{
    EncodedForm, EncodingError, FileUploadClient, MultipartEncoder, Operation, ProtocolError,
    UploadError,
};
pub use crate::file_manager::{FileOpener, OpenedFile, TokioFileOpener};
pub use file_upload_library::{CreateRequest, models};
