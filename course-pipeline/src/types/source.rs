use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{error::AppError, utils::ingest_limits::effective_mime_type};
use serde::Serialize;

/// An uploaded document, held in memory until the extractor has consumed it.
#[derive(Clone)]
pub struct SourceFile {
    pub name: String,
    pub declared_mime_type: String,
    pub byte_size: u64,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("name", &self.name)
            .field("declared_mime_type", &self.declared_mime_type)
            .field("byte_size", &self.byte_size)
            .finish_non_exhaustive()
    }
}

impl SourceFile {
    pub fn new(name: impl Into<String>, declared_mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_mime_type: declared_mime_type.into(),
            byte_size: data.len() as u64,
            data,
        }
    }

    /// Decodes a base64 payload, accepting both bare base64 and `data:` URLs.
    pub fn from_base64(
        name: impl Into<String>,
        declared_mime_type: impl Into<String>,
        encoded: &str,
    ) -> Result<Self, AppError> {
        let payload = match encoded.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => encoded,
        };
        let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        let data = STANDARD.decode(cleaned)?;

        Ok(Self::new(name, declared_mime_type, data))
    }

    pub fn mime_type(&self) -> String {
        effective_mime_type(&self.name, &self.declared_mime_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub source_name: String,
    pub text: String,
    pub char_length: usize,
}

impl ExtractedText {
    pub fn new(source_name: impl Into<String>, text: String) -> Self {
        let char_length = text.chars().count();
        Self {
            source_name: source_name.into(),
            text,
            char_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    pub source_name: String,
    pub reason: String,
}

/// Header line that tags the start of a source's text in any prompt body.
pub fn source_header(source_name: &str) -> String {
    format!("=== Source: {source_name} ===")
}

/// All usable text for one run, kept per source in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    pub sources: Vec<ExtractedText>,
    pub total_char_length: usize,
    pub source_count: usize,
    pub per_source_failures: Vec<SourceFailure>,
}

impl Corpus {
    /// Only the extracted text counts toward `total_char_length`; source
    /// headers do not.
    pub fn assemble(sources: Vec<ExtractedText>, per_source_failures: Vec<SourceFailure>) -> Self {
        let total_char_length = sources
            .iter()
            .fold(0_usize, |acc, text| acc.saturating_add(text.char_length));

        Self {
            source_count: sources.len(),
            sources,
            total_char_length,
            per_source_failures,
        }
    }

    /// The whole corpus as one body, each source under its header.
    pub fn combined_text(&self) -> String {
        self.sources
            .iter()
            .map(|entry| format!("{}\n{}", source_header(&entry.source_name), entry.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn is_empty(&self) -> bool {
        self.source_count == 0
    }
}
