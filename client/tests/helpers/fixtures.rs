use bytes::Bytes;
use file_upload_client::transport::{RequestBody, TransportRequest, TransportResponse};
use reqwest::StatusCode;
use serde_json::{Value, json};

pub const UPLOAD_ID: &str = "b52b8ed6-e029-4707-a671-832549c09de3";

pub fn record_json(status: &str, multi_part: bool) -> Value {
    let mut record = json!({
        "object": "file_upload",
        "id": UPLOAD_ID,
        "created_time": "2025-03-15T20:53:00.000Z",
        "last_edited_time": "2025-03-15T20:53:00.000Z",
        "expiry_time": "2025-03-15T21:53:00.000Z",
        "status": status,
        "filename": null,
        "content_type": null,
        "content_length": null
    });

    if status == "pending" {
        record["upload_url"] = json!(format!("https://api.example.com/v1/file_uploads/{UPLOAD_ID}/send"));
        if multi_part {
            record["filename"] = json!("big.bin");
            record["complete_url"] =
                json!(format!("https://api.example.com/v1/file_uploads/{UPLOAD_ID}/complete"));
        }
    }

    record
}

pub fn ok_json(value: Value) -> TransportResponse {
    TransportResponse::new(StatusCode::OK, Bytes::from(value.to_string()))
}

pub fn ok_empty() -> TransportResponse {
    TransportResponse::new(StatusCode::OK, Bytes::new())
}

pub struct FormPart {
    pub name: String,
    pub file_name: Option<String>,
    pub data: Vec<u8>,
}

/// Reads back the multipart body the client framed.
pub async fn parse_form(request: &TransportRequest) -> Vec<FormPart> {
    let RequestBody::Bytes(body) = &request.body else {
        panic!("expected a byte body, got {:?}", request.body);
    };
    let content_type = request.content_type.as_deref().expect("content type override");
    let boundary = multer::parse_boundary(content_type).expect("multipart content type");

    let body = body.clone();
    let mut multipart = multer::Multipart::new(
        futures_util::stream::iter([Ok::<_, std::io::Error>(body)]),
        boundary,
    );

    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("well-formed multipart body") {
        parts.push(FormPart {
            name: field.name().unwrap_or_default().to_owned(),
            file_name: field.file_name().map(str::to_owned),
            data: field.bytes().await.expect("field bytes").to_vec(),
        });
    }

    parts
}
