use std::path::PathBuf;

use thiserror::Error;

/// Gemini API errors
#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("API Error: {0}")]
    ApiError(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    #[error("Request Error: {0}")]
    RequestError(String),

    #[error("Response Error: {0}")]
    ResponseError(String),

    #[error("Parsing Error: {0}")]
    ParsingError(String),

    #[error("HTTP Error: {status_code} - {message}")]
    HttpError { status_code: u16, message: String },

    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

/// Result type for Gemini operations
pub type GeminiResult<T> = Result<T, GeminiError>;

/// Errors building or reading an encoded image
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Not a data URI: {0}")]
    NotDataUri(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} does not look like an image", .0.display())]
    NotAnImage(PathBuf),

    #[error("Failed to encode frame: {0}")]
    Encode(#[from] image::ImageError),
}

/// Camera device errors
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Camera stream has been stopped")]
    StreamStopped,

    #[error("Frame capture failed: {0}")]
    CaptureFailed(String),
}

/// Errors raised by image acquisition
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error("Acquisition listener has gone away")]
    ListenerClosed,
}

/// Reasons an analysis attempt failed
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("No structured data found in model response")]
    NoStructuredData,

    #[error("Malformed response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    #[error("Response does not describe a plant: {0}")]
    SchemaMismatch(#[source] serde_json::Error),

    #[error(transparent)]
    Model(#[from] GeminiError),
}
