use crate::error::ValidationError;
use crate::utils::file_extension;

pub const ACCEPTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Checks a receipt file name against the image allow-list. Returns the
/// normalized (lowercase) extension on success.
pub fn validate(file_name: &str) -> Result<String, ValidationError> {
    if file_name.trim().is_empty() {
        return Err(ValidationError::EmptyFileName);
    }
    match file_extension(file_name) {
        Some(ext) if ACCEPTED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        Some(ext) => Err(ValidationError::UnsupportedFileType(ext)),
        None => Err(ValidationError::UnsupportedFileType(String::new())),
    }
}

pub fn content_type(extension: &str) -> &'static str {
    match extension {
        "png" => "image/png",
        _ => "image/jpeg",
    }
}
