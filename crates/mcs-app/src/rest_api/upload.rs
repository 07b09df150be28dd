use axum::{body::Bytes, extract::multipart::Field};
use time::{format_description::BorrowedFormatItem, macros::format_description, Date};
use tracing::debug;

use crate::error::{ApiError, ApiResult};

/// Images bigger than this are rejected, whatever the router body limit is.
pub const IMAGE_SIZE_LIMIT: usize = 4 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub struct ImageUpload {
    pub data: Bytes,
    pub ext: &'static str,
}

fn image_extension(mime: &str) -> Option<&'static str> {
    ALLOWED_IMAGE_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == mime)
        .map(|(_, ext)| *ext)
}

/// Reads an image part, enforcing the content-type allow-list and size cap.
pub async fn read_image(field: Field<'_>) -> ApiResult<ImageUpload> {
    let mime = field
        .content_type()
        .ok_or_else(|| ApiError::InvalidRequest("Missing image content type".into()))?
        .to_string();
    let ext = image_extension(&mime).ok_or_else(|| {
        ApiError::UnprocessableRequest(format!("Unsupported image type: {mime}"))
    })?;
    let data = field.bytes().await?;
    if data.len() > IMAGE_SIZE_LIMIT {
        return Err(ApiError::UnprocessableRequest(format!(
            "Image too large, limit is {} bytes",
            IMAGE_SIZE_LIMIT
        )));
    }
    debug!("Received {} byte {mime} upload", data.len());
    Ok(ImageUpload { data, ext })
}

pub fn parse_date(value: &str) -> ApiResult<Date> {
    Date::parse(value, DATE_FORMAT)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid date {value:?}: {e}")))
}

pub fn parse_bool(value: &str) -> ApiResult<bool> {
    value
        .parse()
        .map_err(|_| ApiError::InvalidRequest(format!("Invalid boolean {value:?}")))
}

pub fn parse_json<T: serde::de::DeserializeOwned>(value: &str) -> ApiResult<T> {
    serde_json::from_str(value)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON field: {e}")))
}
