use serde::Serialize;
use thiserror::Error;

use super::config::AppConfig;

pub const ALLOWED_MIME_TYPES: &[&str] = &["application/pdf", "text/plain", "text/markdown"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestValidationError {
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    BadRequest(String),
}

/// Input policy applied before any extraction work starts.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IngestLimits {
    pub allowed_types: Vec<String>,
    pub max_files: usize,
    pub max_file_bytes: u64,
    pub estimated_chars_per_byte: f64,
    pub max_total_chars: usize,
}

impl Default for IngestLimits {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for IngestLimits {
    fn from(config: &AppConfig) -> Self {
        Self {
            allowed_types: ALLOWED_MIME_TYPES.iter().map(ToString::to_string).collect(),
            max_files: config.max_files,
            max_file_bytes: config.max_file_bytes,
            estimated_chars_per_byte: config.estimated_chars_per_byte,
            max_total_chars: config.max_total_chars,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationVerdict {
    pub is_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<IngestLimits>,
}

impl ValidationVerdict {
    fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
            limits: None,
        }
    }

    fn invalid(reason: String, limits: &IngestLimits) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
            limits: Some(limits.clone()),
        }
    }
}

/// Resolves the effective mime type, guessing from the file name when the
/// client sent nothing useful.
pub fn effective_mime_type(name: &str, declared_type: &str) -> String {
    let declared = declared_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if declared.is_empty() || declared == "application/octet-stream" {
        return mime_guess::from_path(name)
            .first()
            .map_or(declared, |mime| mime.essence_str().to_string());
    }

    declared
}

pub fn validate_source_file(
    limits: &IngestLimits,
    name: &str,
    declared_type: &str,
    byte_size: u64,
) -> ValidationVerdict {
    let mime_type = effective_mime_type(name, declared_type);

    if !limits.allowed_types.iter().any(|allowed| *allowed == mime_type) {
        return ValidationVerdict::invalid(
            format!(
                "{name}: unsupported file type '{declared_type}'. Allowed types: {}",
                limits.allowed_types.join(", ")
            ),
            limits,
        );
    }

    if byte_size == 0 {
        return ValidationVerdict::invalid(format!("{name}: file is empty"), limits);
    }

    if byte_size > limits.max_file_bytes {
        return ValidationVerdict::invalid(
            format!(
                "{name}: file is too large ({byte_size} bytes). Maximum allowed is {} bytes",
                limits.max_file_bytes
            ),
            limits,
        );
    }

    ValidationVerdict::valid()
}

pub fn validate_file_count(
    limits: &IngestLimits,
    file_count: usize,
) -> Result<(), IngestValidationError> {
    if file_count == 0 {
        return Err(IngestValidationError::BadRequest(
            "At least one file is required".to_string(),
        ));
    }

    if file_count > limits.max_files {
        return Err(IngestValidationError::BadRequest(format!(
            "Too many files. Maximum allowed is {}",
            limits.max_files
        )));
    }

    Ok(())
}

/// Conservative character estimate for a batch, computed from byte sizes alone.
pub fn estimate_total_chars(limits: &IngestLimits, byte_sizes: &[u64]) -> u64 {
    let total_bytes = byte_sizes
        .iter()
        .fold(0_u64, |acc, size| acc.saturating_add(*size));

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let estimate = (total_bytes as f64 * limits.estimated_chars_per_byte).ceil() as u64;
    estimate
}

pub fn check_estimated_size(
    limits: &IngestLimits,
    byte_sizes: &[u64],
) -> Result<u64, IngestValidationError> {
    let estimate = estimate_total_chars(limits, byte_sizes);
    if estimate > limits.max_total_chars as u64 {
        return Err(IngestValidationError::PayloadTooLarge(format!(
            "Uploaded documents are too large: an estimated {estimate} characters exceeds the limit of {} characters. Please upload fewer or smaller files",
            limits.max_total_chars
        )));
    }

    Ok(estimate)
}
