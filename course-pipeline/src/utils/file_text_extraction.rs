use common::error::AppError;

use crate::types::SourceFile;

pub async fn extract_text_from_source(file: &SourceFile) -> Result<String, AppError> {
    match file.mime_type().as_str() {
        "text/plain" | "text/markdown" => Ok(String::from_utf8_lossy(&file.data).into_owned()),
        "application/pdf" => extract_pdf_text(file.data.clone()).await,
        other => Err(AppError::Extraction(format!(
            "no extractor available for '{other}'"
        ))),
    }
}

/// Runs `pdf-extract` off the async executor and restores paragraph structure.
async fn extract_pdf_text(pdf_bytes: Vec<u8>) -> Result<String, AppError> {
    let extraction = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&pdf_bytes).map(|s| s.replace('\r', ""))
    })
    .await
    .map_err(|err| AppError::Extraction(format!("PDF extraction task failed: {err}")))?
    .map_err(|err| AppError::Extraction(format!("Failed to extract text from PDF: {err}")))?;

    Ok(reflow_paragraphs(extraction.trim()))
}

/// Joins hard-wrapped lines into paragraphs while keeping list items and
/// headings on their own lines.
fn reflow_paragraphs(input: &str) -> String {
    let mut paragraphs = Vec::new();
    let mut buffer: Vec<&str> = Vec::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join(" "));
                buffer.clear();
            }
            continue;
        }

        if is_structural_line(trimmed) {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join(" "));
                buffer.clear();
            }
            paragraphs.push(trimmed.to_string());
            continue;
        }

        buffer.push(trimmed);
    }

    if !buffer.is_empty() {
        paragraphs.push(buffer.join(" "));
    }

    paragraphs.join("\n\n")
}

fn is_structural_line(line: &str) -> bool {
    let starts_numbered = line
        .split_once(['.', ')'])
        .is_some_and(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()));

    line.starts_with('#')
        || line.starts_with("- ")
        || line.starts_with("* ")
        || line.starts_with('•')
        || starts_numbered
}
