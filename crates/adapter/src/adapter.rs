use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};
use tusk_engine::{ErrorKind, UploadError, UploadManager};
use tusk_protocol::constants::{OFFSET_OCTET_STREAM, TUS_RESUMABLE, headers};

use crate::request::{Action, Request, Response};
use crate::token::validate_token;

/// Headers browsers may read from cross-origin responses.
const EXPOSED_HEADERS: &str = "Location, Upload-Offset, Upload-Length, Upload-Metadata, \
     Tus-Resumable, Tus-Version, Tus-Extension, Tus-Max-Size";

/// Methods advertised on OPTIONS.
const ALLOWED_METHODS: &str = "GET,PUT,PATCH,POST,DELETE";

/// Translates typed requests into manager calls and results into
/// protocol responses.
pub struct UploadAdapter {
    manager: Arc<UploadManager>,
    token: RwLock<String>,
    base_path: String,
}

impl UploadAdapter {
    /// `base_path` prefixes the `Location` of every upload, e.g. `/files`.
    pub fn new(
        manager: Arc<UploadManager>,
        token: impl Into<String>,
        base_path: impl Into<String>,
    ) -> Self {
        let base_path = base_path.into().trim_end_matches('/').to_string();
        Self {
            manager,
            token: RwLock::new(token.into()),
            base_path,
        }
    }

    pub fn manager(&self) -> &UploadManager {
        &self.manager
    }

    /// Handles one request. Never fails: every error becomes a status code.
    pub async fn handle(&self, request: Request) -> Response {
        let Request { token, action } = request;
        let name = action.name();

        let authorized = token
            .as_deref()
            .is_some_and(|t| validate_token(t, &self.current_token()));
        if !authorized {
            warn!(action = name, "rejected request without a valid token");
            return Response::new(401).with_header(headers::TUS_RESUMABLE, TUS_RESUMABLE);
        }

        let response = match action {
            Action::Create {
                upload_length,
                metadata,
                mime_type,
            } => {
                self.create(upload_length, metadata.as_deref(), mime_type.as_deref())
                    .await
            }
            Action::Patch {
                id,
                offset,
                content_length,
                content_type,
                body,
            } => {
                if !is_offset_stream(content_type.as_deref()) {
                    warn!(upload_id = %id, content_type = ?content_type, "unsupported chunk content type");
                    Response::new(415)
                } else {
                    match self
                        .manager
                        .apply_chunk(&id, body, offset, content_length)
                        .await
                    {
                        Ok(record) => Response::new(204)
                            .with_header(headers::UPLOAD_OFFSET, record.content_offset),
                        Err(e) => error_response(&e),
                    }
                }
            }
            Action::Head { id } => match self.manager.status_of(&id).await {
                Ok(Some(record)) => Response::new(204)
                    .with_header(headers::LOCATION, self.location(&record.id))
                    .with_header(headers::CACHE_CONTROL, "no-store")
                    .with_header(headers::UPLOAD_LENGTH, record.content_length)
                    .with_header(headers::UPLOAD_OFFSET, record.content_offset),
                Ok(None) => Response::new(404),
                Err(e) => error_response(&e),
            },
            Action::Get { id } => match self.manager.status_of(&id).await {
                Ok(Some(record)) => json_response(&record),
                Ok(None) => Response::new(404),
                Err(e) => error_response(&e),
            },
            Action::List { page, page_size } => {
                match self
                    .manager
                    .list_uploads(page, page_size.unwrap_or(0))
                    .await
                {
                    Ok(page) => json_response(&page),
                    Err(e) => error_response(&e),
                }
            }
            Action::Options => self.options(),
            Action::GetToken => {
                Response::new(200).with_body(json!({ "literal": self.current_token() }))
            }
            Action::SetToken { literal } => self.set_token(literal),
        };

        debug!(action = name, status = response.status, "request handled");
        response.with_header(headers::TUS_RESUMABLE, TUS_RESUMABLE)
    }

    async fn create(
        &self,
        upload_length: u64,
        metadata: Option<&str>,
        mime_type: Option<&str>,
    ) -> Response {
        match self
            .manager
            .create_upload(mime_type.unwrap_or_default(), upload_length, metadata)
            .await
        {
            Ok(record) => Response::new(201)
                .with_header(headers::LOCATION, self.location(&record.id))
                .with_header(headers::EXPOSE_HEADERS, EXPOSED_HEADERS),
            Err(e) => error_response(&e),
        }
    }

    fn options(&self) -> Response {
        let caps = self.manager.capabilities();
        let mut response = Response::new(204)
            .with_header(headers::TUS_VERSION, caps.versions.join(","))
            .with_header(headers::TUS_EXTENSION, caps.extensions.join(","));
        if let Some(max) = caps.max_size {
            response = response.with_header(headers::TUS_MAX_SIZE, max);
        }
        response
            .with_header(headers::ALLOW_METHODS, ALLOWED_METHODS)
            .with_header(headers::EXPOSE_HEADERS, EXPOSED_HEADERS)
    }

    fn current_token(&self) -> String {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_token(&self, literal: String) -> Response {
        if literal.is_empty() {
            warn!("refusing to set an empty access token");
            return Response::new(400).with_body(json!({ "error": "token must not be empty" }));
        }
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = literal.clone();
        info!("access token rotated");
        Response::new(200).with_body(json!({ "literal": literal }))
    }

    fn location(&self, id: &str) -> String {
        format!("{}/{}", self.base_path, id)
    }
}

/// Accepts `application/offset+octet-stream`, with or without parameters.
fn is_offset_stream(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(OFFSET_OCTET_STREAM))
}

fn status_for(err: &UploadError) -> u16 {
    match err {
        UploadError::OffsetMismatch { .. } => 409,
        UploadError::ExceedsLength { .. } | UploadError::TooLarge { .. } => 413,
        _ => match err.kind() {
            ErrorKind::ClientInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Timeout => 408,
            ErrorKind::Storage | ErrorKind::Persistence => 500,
        },
    }
}

fn error_response(err: &UploadError) -> Response {
    let status = status_for(err);
    if status >= 500 {
        error!("request failed: {err}");
    }
    Response::new(status).with_body(json!({ "error": err.to_string() }))
}

fn json_response<T: Serialize>(value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(body) => Response::new(200).with_body(body),
        Err(e) => {
            error!("failed to serialize response body: {e}");
            Response::new(500)
        }
    }
}
