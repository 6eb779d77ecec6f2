use anyhow::{Result, anyhow};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validates file size against maximum limit
pub fn validate_file_size(size: usize, max_size: usize) -> Result<()> {
    if size == 0 {
        return Err(anyhow!(ValidationError {
            code: "EMPTY_FILE",
            message: "Uploaded file is empty".to_string(),
        }));
    }
    if size > max_size {
        return Err(anyhow!(ValidationError {
            code: "FILE_TOO_LARGE",
            message: format!(
                "File size {} bytes exceeds maximum allowed {} bytes ({} MB)",
                size,
                max_size,
                max_size / 1024 / 1024
            ),
        }));
    }
    Ok(())
}

/// Strips any client-supplied directory components from a filename.
pub fn base_filename(filename: &str) -> Result<String> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim();

    if filename.contains("..") {
        tracing::warn!("Path traversal attempt detected: {}", filename);
    }

    if name.is_empty() || name == "." || name == ".." {
        return Err(anyhow!(ValidationError {
            code: "INVALID_FILENAME",
            message: "Filename cannot be empty".to_string(),
        }));
    }

    Ok(name.to_string())
}

/// Builds the storage key for a user's upload:
/// `user_<id>/<stem>_<uuid><.ext>` where the stem keeps only `[A-Za-z0-9_-]`.
pub fn build_storage_key(user_id: i32, filename: &str) -> Result<String> {
    let name = base_filename(filename)?;

    let (stem, extension) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name.as_str(), ""),
    };

    let safe_stem: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(100)
        .collect();

    let safe_extension: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.')
        .take(16)
        .collect();

    Ok(format!(
        "user_{}/{}_{}{}",
        user_id,
        safe_stem,
        Uuid::new_v4(),
        safe_extension
    ))
}

/// Rejects storage keys that could escape the storage root.
pub fn validate_storage_key(key: &str) -> Result<()> {
    if key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part == ".." || part.is_empty())
    {
        return Err(anyhow!(ValidationError {
            code: "INVALID_STORAGE_KEY",
            message: format!("Storage key '{}' is not valid", key),
        }));
    }
    Ok(())
}

/// True when `key` sits under the prefix `build_storage_key` uses for `user_id`.
pub fn key_belongs_to_user(key: &str, user_id: i32) -> bool {
    key.starts_with(&format!("user_{}/", user_id))
}

/// Picks the MIME type for an upload: the client's declaration unless it is
/// missing or generic, then content sniffing, then `application/octet-stream`.
pub fn resolve_mime_type(declared: Option<&str>, header: &[u8]) -> String {
    let declared = declared
        .map(|c| c.split(';').next().unwrap_or("").trim().to_lowercase())
        .filter(|c| !c.is_empty() && c != mime::APPLICATION_OCTET_STREAM.essence_str());

    if let Some(content_type) = declared {
        return content_type;
    }

    infer::get(header)
        .map(|kind| kind.mime_type().to_string())
        .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
}
