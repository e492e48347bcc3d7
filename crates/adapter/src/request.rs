//! Typed requests and responses exchanged with the adapter.

use std::fmt;

use tusk_transfer::ChunkStream;

/// One already-parsed client request.
#[derive(Debug)]
pub struct Request {
    /// Value of the `X-Token` header, if sent.
    pub token: Option<String>,
    pub action: Action,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Self {
            token: None,
            action,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// The operation a request asks for.
pub enum Action {
    /// POST: start a new upload.
    Create {
        upload_length: u64,
        /// Raw `Upload-Metadata` header.
        metadata: Option<String>,
        mime_type: Option<String>,
    },
    /// PATCH: append one chunk.
    Patch {
        id: String,
        /// `Upload-Offset` header.
        offset: u64,
        /// `Content-Length` of the body.
        content_length: u64,
        content_type: Option<String>,
        body: ChunkStream,
    },
    /// HEAD: resume point of an upload.
    Head { id: String },
    /// GET: the full record as JSON.
    Get { id: String },
    /// GET on the collection: one page of records.
    List { page: usize, page_size: Option<usize> },
    /// OPTIONS: server capabilities.
    Options,
    /// Read the current access token.
    GetToken,
    /// Replace the access token; later requests must present `literal`.
    SetToken { literal: String },
}

impl Action {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Create { .. } => "create",
            Action::Patch { .. } => "patch",
            Action::Head { .. } => "head",
            Action::Get { .. } => "get",
            Action::List { .. } => "list",
            Action::Options => "options",
            Action::GetToken => "get_token",
            Action::SetToken { .. } => "set_token",
        }
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create {
                upload_length,
                metadata,
                mime_type,
            } => f
                .debug_struct("Create")
                .field("upload_length", upload_length)
                .field("metadata", metadata)
                .field("mime_type", mime_type)
                .finish(),
            Action::Patch {
                id,
                offset,
                content_length,
                content_type,
                ..
            } => f
                .debug_struct("Patch")
                .field("id", id)
                .field("offset", offset)
                .field("content_length", content_length)
                .field("content_type", content_type)
                .finish_non_exhaustive(),
            Action::Head { id } => f.debug_struct("Head").field("id", id).finish(),
            Action::Get { id } => f.debug_struct("Get").field("id", id).finish(),
            Action::List { page, page_size } => f
                .debug_struct("List")
                .field("page", page)
                .field("page_size", page_size)
                .finish(),
            Action::Options => f.write_str("Options"),
            Action::GetToken => f.write_str("GetToken"),
            Action::SetToken { .. } => f.debug_struct("SetToken").finish_non_exhaustive(),
        }
    }
}

/// Status, headers and optional JSON body produced for a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: Option<serde_json::Value>,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: &'static str, value: impl ToString) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Looks up a header value, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let resp = Response::new(204).with_header("Upload-Offset", 42);
        assert_eq!(resp.header("upload-offset"), Some("42"));
        assert!(resp.header("Location").is_none());
    }

    #[test]
    fn patch_debug_omits_body() {
        let action = Action::Patch {
            id: "u1".into(),
            offset: 3,
            content_length: 3,
            content_type: None,
            body: tusk_transfer::stream_from_bytes(b"baz".to_vec()),
        };
        let text = format!("{action:?}");
        assert!(text.starts_with("Patch"));
        assert!(text.contains("offset: 3"));
        assert_eq!(action.name(), "patch");
    }

    #[test]
    fn set_token_debug_hides_literal() {
        let action = Action::SetToken {
            literal: "s3cret".into(),
        };
        assert!(!format!("{action:?}").contains("s3cret"));
    }
}
