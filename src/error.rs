use thiserror::Error;

/// Structural invariant violations in a layout tree. These are programming
/// errors: the mutation engine never produces such a tree.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("row group {group} has no columns")]
    EmptyRowGroup { group: usize },
    #[error("column {col} of row group {group} has no items")]
    EmptyColumn { group: usize, col: usize },
    #[error("{what} {value} is outside the allowed range")]
    InvalidRatio { what: &'static str, value: f64 },
}

/// Errors at the document boundary (JSON import/export, .tfe project files).
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("serialization error: {0}")]
    Serialize(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
}

impl From<Box<bincode::ErrorKind>> for DocumentError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        DocumentError::Serialize(e.to_string())
    }
}

/// Errors from the credential key store.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("unknown key `{0}`")]
    UnknownKey(String),
    #[error("key store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the object-storage upload boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UploadError {
    #[error("file is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("object storage is not configured")]
    NotConfigured,
    #[error("pool image `{0}` is not awaiting an upload")]
    NotUploading(String),
    #[error("upload failed: {0}")]
    Failed(String),
}

/// Errors from the image edit pipeline.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("crop area is empty")]
    EmptyCrop,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
