use std::result;

use reqwest::{StatusCode, header::InvalidHeaderValue};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RestApiError {
    #[error("HTTP client build error: {0}")]
    HttpClient(reqwest::Error),

    #[error("Url parse error: {0}")]
    UrlParse(String),

    #[error("Invalid header value: {0}")]
    InvalidHeader(#[from] InvalidHeaderValue),

    #[error("Request send failed: {0}")]
    SendFailed(reqwest::Error),

    #[error("Response decoding error: {0}")]
    ResponseDecoding(reqwest::Error),

    #[error("Error response, status {status}: {text}")]
    ErrorResponse { status: StatusCode, text: String },

    #[error("Response JSON deserialization failed: {e}. Raw response: {raw_response}")]
    ResponseJsonDeserializeFailed {
        raw_response: String,
        e: serde_json::Error,
    },
}

pub(crate) type Result<T> = result::Result<T, RestApiError>;
