use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use file_upload_client::{
    CreateRequest,
    models::{FILE_UPLOAD_OBJECT, UploadId, UploadMode, UploadRecord, UploadStatus},
};
use tokio::{net::TcpListener, sync::Mutex, task::JoinHandle};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct ReceivedSend {
    pub upload_id: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
    pub part_number: Option<String>,
    pub authorization: Option<String>,
    pub api_version: Option<String>,
}

#[derive(Clone, Default)]
struct SimulatorState {
    base_url: String,
    uploads: Arc<Mutex<HashMap<String, UploadRecord>>>,
    received: Arc<Mutex<Vec<ReceivedSend>>>,
    failing_sends: Arc<AtomicUsize>,
}

/// Tiny stand-in for the remote API, speaking just enough of the
/// `file_uploads` resource to drive the client end to end.
pub struct WebServerSimulator {
    listener: TcpListener,
    state: SimulatorState,
}

impl WebServerSimulator {
    pub async fn new() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let host = listener.local_addr()?;

        Ok(Self {
            listener,
            state: SimulatorState {
                base_url: format!("http://{}/v1/", host),
                ..Default::default()
            },
        })
    }

    pub fn url(&self) -> String {
        self.state.base_url.clone()
    }

    /// The next `count` sends are answered with a 500.
    pub fn fail_next_sends(&self, count: usize) {
        self.state.failing_sends.store(count, Ordering::SeqCst);
    }

    pub fn received(&self) -> Arc<Mutex<Vec<ReceivedSend>>> {
        Arc::clone(&self.state.received)
    }

    pub async fn start(self) -> JoinHandle<()> {
        let server = Router::new()
            .route("/v1/file_uploads", post(create))
            .route("/v1/file_uploads/{id}", get(retrieve))
            .route("/v1/file_uploads/{id}/send", post(send))
            .route("/v1/file_uploads/{id}/complete", post(complete))
            .with_state(self.state);
        let server = axum::serve(self.listener, server.into_make_service());

        tokio::spawn(async move {
            server.await.unwrap();
        })
    }
}

async fn create(
    State(state): State<SimulatorState>,
    Json(request): Json<CreateRequest>,
) -> Json<UploadRecord> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let record = UploadRecord {
        object: FILE_UPLOAD_OBJECT.to_owned(),
        id: UploadId::new(id.clone()),
        created_time: now,
        last_edited_time: now,
        expiry_time: Some(now + chrono::Duration::hours(1)),
        status: UploadStatus::Pending,
        filename: request.filename().map(str::to_owned),
        content_type: None,
        content_length: None,
        upload_url: Some(format!("{}file_uploads/{id}/send", state.base_url)),
        complete_url: (request.mode() == UploadMode::MultiPart)
            .then(|| format!("{}file_uploads/{id}/complete", state.base_url)),
        file_import_result: None,
    };

    state.uploads.lock().await.insert(id, record.clone());

    Json(record)
}

async fn retrieve(State(state): State<SimulatorState>, Path(id): Path<String>) -> Response {
    match state.uploads.lock().await.get(&id) {
        Some(record) => Json(record.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn send(
    State(state): State<SimulatorState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let remaining = state.failing_sends.load(Ordering::SeqCst);
    if remaining > 0 {
        state.failing_sends.store(remaining - 1, Ordering::SeqCst);
        return (StatusCode::INTERNAL_SERVER_ERROR, "simulated failure").into_response();
    }

    let mut received = ReceivedSend {
        upload_id: id.clone(),
        file_name: None,
        data: Vec::new(),
        part_number: None,
        authorization: header(&headers, "authorization"),
        api_version: header(&headers, "notion-version"),
    };

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().map(str::to_owned);
        let file_name = field.file_name().map(str::to_owned);
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };

        match name.as_deref() {
            Some("file") => {
                received.file_name = file_name;
                received.data = bytes.to_vec();
            }
            Some("part_number") => {
                received.part_number = Some(String::from_utf8_lossy(&bytes).into_owned());
            }
            _ => return StatusCode::BAD_REQUEST.into_response(),
        }
    }

    let mut uploads = state.uploads.lock().await;
    let Some(record) = uploads.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if record.status != UploadStatus::Pending {
        return StatusCode::BAD_REQUEST.into_response();
    }
    if record.complete_url.is_none() {
        record.status = UploadStatus::Uploaded;
        record.upload_url = None;
        record.content_length = Some(received.data.len() as u64);
    }
    drop(uploads);

    state.received.lock().await.push(received);

    StatusCode::OK.into_response()
}

async fn complete(State(state): State<SimulatorState>, Path(id): Path<String>) -> Response {
    let mut uploads = state.uploads.lock().await;
    let Some(record) = uploads.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    record.status = UploadStatus::Uploaded;
    record.upload_url = None;
    record.complete_url = None;

    Json(record.clone()).into_response()
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}
