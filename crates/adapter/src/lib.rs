//! Protocol adapter for the tusk upload engine.
//!
//! Transport code parses a request into a [`Request`], hands it to
//! [`UploadAdapter::handle`] and writes the returned [`Response`] back.
//! Every request is checked against the shared `X-Token` first.

mod adapter;
mod request;
pub mod token;

pub use adapter::UploadAdapter;
pub use request::{Action, Request, Response};
pub use token::{generate_token, validate_token};
