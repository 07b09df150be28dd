use std::str::FromStr;

use error::{StoreError, StoreResult};
use tracing::debug;

pub mod error;
pub mod file_store;

pub use file_store::FileStore;

const ACTORS_PATH_PREFIX: &str = "actors";
const MOVIES_PATH_PREFIX: &str = "movies";

const MAX_PATH_LEN: usize = 1023;
const MAX_SEGMENT_LEN: usize = 255;
const MAX_PATH_DEPTH: usize = 4;
const PATH_INVALID_CHARS: &str = r#"\:"#;

/// Storage container for one kind of uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Actors,
    Movies,
}

impl Container {
    pub fn as_str(&self) -> &'static str {
        match self {
            Container::Actors => ACTORS_PATH_PREFIX,
            Container::Movies => MOVIES_PATH_PREFIX,
        }
    }
}

fn is_segment_invalid(s: &str) -> bool {
    s.is_empty()
        || s.starts_with('.')
        || s.len() > MAX_SEGMENT_LEN
        || s.chars()
            .any(|c| PATH_INVALID_CHARS.contains(c) || c.is_ascii_control())
}

fn validate_path(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::InvalidPath);
    }
    if path.starts_with('/') || path.ends_with('/') {
        return Err(StoreError::InvalidPath);
    }
    if path.len() > MAX_PATH_LEN {
        return Err(StoreError::InvalidPath);
    }
    let segments = path.split('/').collect::<Vec<_>>();
    if segments.len() > MAX_PATH_DEPTH {
        return Err(StoreError::InvalidPath);
    }
    let invalid_path = segments.into_iter().any(is_segment_invalid);
    if invalid_path {
        Err(StoreError::InvalidPath)
    } else {
        Ok(())
    }
}

/// New unique relative path in given container, with random file name.
pub fn media_path(container: Container, ext: &str) -> StoreResult<ValidPath> {
    let id = uuid::Uuid::new_v4();
    ValidPath::new(format!("{}/{}.{}", container.as_str(), id, ext))
}

/// Relative path, utf8, validated not to escape store root via special segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPath(String);

impl ValidPath {
    pub fn new(path: impl Into<String>) -> StoreResult<Self> {
        let path = path.into();
        validate_path(path.as_str()).inspect_err(|_| debug!("Invalid path: {path}"))?;
        Ok(ValidPath(path))
    }
}

impl FromStr for ValidPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidPath::new(s)
    }
}

impl AsRef<str> for ValidPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<ValidPath> for String {
    fn from(value: ValidPath) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert!(ValidPath::new("actors/abc.jpg").is_ok());
        assert!(ValidPath::new("movies/6a7e7b2a.png").is_ok());
    }

    #[test]
    fn test_invalid_paths() {
        for p in ["", "/abs/path", "trailing/", "a//b", "../escape", "a/./b", r"back\slash"] {
            assert!(ValidPath::new(p).is_err(), "should reject {p:?}");
        }
    }

    #[test]
    fn test_media_path() {
        let path = media_path(Container::Actors, "jpg").unwrap();
        let path: String = path.into();
        assert!(path.starts_with("actors/"));
        assert!(path.ends_with(".jpg"));
    }
}
