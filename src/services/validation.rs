//! Upload validation: extension allow-list and size ceiling.
//!
//! Runs before any I/O. Checks are ordered (filename, extension, size) so a
//! request that fails several of them always reports the same error.

use thiserror::Error;

/// Extensions accepted when no `ALLOWED_EXTENSIONS` override is configured.
pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 8] =
    ["pdf", "docx", "txt", "png", "jpg", "jpeg", "gif", "md"];

/// 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Filename cannot be empty")]
    InvalidFilename,
    #[error("Unsupported file format. Allowed formats: {}", .allowed.join(", "))]
    UnsupportedFileType {
        extension: String,
        allowed: Vec<String>,
    },
    #[error("File too large: {size} bytes exceeds the limit of {limit} bytes ({} MB)", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },
}

/// Allow-list and size ceiling applied to every upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Lowercase extensions, kept in configuration order for error messages.
    pub allowed_extensions: Vec<String>,
    pub max_file_size: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl UploadPolicy {
    pub fn new(allowed_extensions: Vec<String>, max_file_size: u64) -> Self {
        Self {
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            max_file_size,
        }
    }

    /// Filename and extension checks only. The upload handler calls this as
    /// soon as the multipart headers arrive, before reading any bytes.
    pub fn validate_name(&self, filename: Option<&str>) -> Result<String, ValidationError> {
        let filename = match filename {
            Some(name) if !name.is_empty() => name,
            _ => return Err(ValidationError::InvalidFilename),
        };

        let extension = file_extension(filename);
        // a dotless name reports itself as the extension and is never accepted
        if !filename.contains('.') || !self.allowed_extensions.iter().any(|ext| *ext == extension)
        {
            return Err(ValidationError::UnsupportedFileType {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(extension)
    }

    /// Size ceiling only.
    pub fn validate_size(&self, size: u64) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Full decision: filename presence, then extension, then size.
    /// Returns the lowercase extension on success.
    pub fn validate(&self, filename: Option<&str>, size: u64) -> Result<String, ValidationError> {
        let extension = self.validate_name(filename)?;
        self.validate_size(size)?;
        Ok(extension)
    }
}

/// Lowercase text after the last `.`, or the whole name when it has no dot.
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit('.')
        .next()
        .unwrap_or(filename)
        .to_ascii_lowercase()
}
