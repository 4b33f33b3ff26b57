// ============================================================================
// OBJECT STORAGE: upload validation, object keys and the uploader seam
// ============================================================================
//
// The network client itself lives outside this crate. Hosts implement
// `ImageUploader` on top of whatever S3-compatible client they use; everything
// here is pure and testable.

use chrono::{DateTime, Utc};

use crate::error::UploadError;
use crate::keys::{KeyRing, STORAGE_ACCESS_KEY, STORAGE_SECRET_KEY};
use crate::settings::EditorSettings;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Uploads image bytes and returns the public URL of the stored object.
pub trait ImageUploader {
    fn upload(&self, bytes: &[u8], mime: &str, file_name: Option<&str>) -> Result<String, UploadError>;
}

/// Size and type check run before any upload. An empty mime type is
/// accepted (the uploader falls back to JPEG).
pub fn validate_upload(len: usize, mime: &str) -> Result<(), UploadError> {
    if len > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size: len,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    if !mime.is_empty() && !ALLOWED_MIME_TYPES.contains(&mime) {
        return Err(UploadError::UnsupportedType(mime.to_string()));
    }
    Ok(())
}

/// Object key for an upload.
///
/// `{prefix}/{name}_{timestamp}.webp` when a file name is given (anything
/// but letters, digits, `_` and `-` becomes `_`), otherwise
/// `{prefix}/{timestamp}_{random hex}.webp`.
pub fn object_key(prefix: &str, file_name: Option<&str>, timestamp: &str, random: [u8; 4]) -> String {
    let prefix = prefix.trim_matches('/');
    match file_name.filter(|n| !n.is_empty()) {
        Some(name) => {
            let sanitized: String = name
                .chars()
                .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
                .collect();
            format!("{}/{}_{}.webp", prefix, sanitized, timestamp)
        }
        None => {
            let hex: String = random.iter().map(|b| format!("{:02x}", b)).collect();
            format!("{}/{}_{}.webp", prefix, timestamp, hex)
        }
    }
}

/// Object key stamped with the current time.
pub fn new_object_key(prefix: &str, file_name: Option<&str>) -> String {
    object_key(prefix, file_name, &timestamp_now(), random_suffix())
}

/// Public URL of `key` under `base_url` (the bucket's public endpoint).
pub fn public_url(base_url: &str, key: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), key.trim_start_matches('/'))
}

/// Object key and public URL for a new upload under the configured bucket
/// prefix and base URL. Fails when the storage credentials are missing.
pub fn upload_target(settings: &EditorSettings, keys: &KeyRing, file_name: Option<&str>) -> Result<(String, String), UploadError> {
    if !is_configured(keys) {
        return Err(UploadError::NotConfigured);
    }
    let key = new_object_key(&settings.storage_bucket_prefix, file_name);
    let url = public_url(&settings.storage_public_base_url, &key);
    Ok((key, url))
}

/// Four random bytes for anonymous object keys.
pub fn random_suffix() -> [u8; 4] {
    let bytes = uuid::Uuid::new_v4().into_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// Current UTC time as `YYYYMMDDHHMMSS`.
pub fn timestamp_now() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// `unix_secs` as a `YYYYMMDDHHMMSS` UTC timestamp.
pub fn format_timestamp(unix_secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// Both storage credentials are present.
pub fn is_configured(keys: &KeyRing) -> bool {
    !keys.get_key(STORAGE_ACCESS_KEY).is_empty() && !keys.get_key(STORAGE_SECRET_KEY).is_empty()
}
