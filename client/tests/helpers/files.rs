use std::{
    io::{self, Cursor},
    path::Path,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};

use async_trait::async_trait;
use file_upload_client::{FileOpener, OpenedFile};
use tokio::io::{AsyncRead, ReadBuf};

/// Hands out in-memory readers and counts how many were opened and dropped.
#[derive(Clone, Default)]
pub struct CountingFileOpener {
    content: Vec<u8>,
    fail_reads: bool,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl CountingFileOpener {
    pub fn with_content(content: &[u8]) -> Self {
        Self {
            content: content.to_vec(),
            ..Default::default()
        }
    }

    pub fn failing_reads() -> Self {
        Self {
            fail_reads: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

struct TrackedReader {
    inner: Cursor<Vec<u8>>,
    fail_reads: bool,
    closed: Arc<AtomicUsize>,
}

impl AsyncRead for TrackedReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.fail_reads {
            return Poll::Ready(Err(io::Error::other("disk went away")));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl Drop for TrackedReader {
    fn drop(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileOpener for CountingFileOpener {
    async fn open(&self, path: &Path) -> io::Result<OpenedFile> {
        self.opened.fetch_add(1, Ordering::SeqCst);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Ok(OpenedFile {
            name,
            reader: Box::new(TrackedReader {
                inner: Cursor::new(self.content.clone()),
                fail_reads: self.fail_reads,
                closed: Arc::clone(&self.closed),
            }),
        })
    }
}

/// Reader whose every read fails.
pub struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream closed")))
    }
}
