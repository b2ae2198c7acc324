// Local file access for `send_file_by_path`. The opener hands out an owned
// reader, so the handle is closed when the upload call returns, whatever the
// outcome. Tests swap the opener to observe that.
use std::{io, path::Path};

use async_trait::async_trait;
use tokio::{fs, io::AsyncRead};

pub struct OpenedFile {
    /// Base name of the path, used as the uploaded file name.
    pub name: String,
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
}

#[async_trait]
pub trait FileOpener: Send + Sync {
    async fn open(&self, path: &Path) -> io::Result<OpenedFile>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TokioFileOpener;

fn file_name_of(path: &Path) -> io::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            )
        })
}

#[async_trait]
impl FileOpener for TokioFileOpener {
    async fn open(&self, path: &Path) -> io::Result<OpenedFile> {
        let name = file_name_of(path)?;

        let file = fs::File::open(path).await?;
        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        Ok(OpenedFile {
            name,
            reader: Box::new(file),
        })
    }
}
