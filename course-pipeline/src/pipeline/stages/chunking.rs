use std::ops::Range;

use common::error::AppError;
use text_splitter::{ChunkConfig, TextSplitter};

use crate::types::{source_header, Chunk, ExtractedText};

pub fn expected_chunk_count(total_chars: usize, target_size: usize) -> usize {
    total_chars.div_ceil(target_size.max(1))
}

/// Largest piece the packer ever places as a whole: the most a chunk may run
/// past its target.
pub fn boundary_unit_size(target_size: usize) -> usize {
    (target_size / 10).max(1)
}

/// A boundary-aligned slice of one source.
#[derive(Debug)]
struct Unit {
    source: usize,
    bytes: Range<usize>,
    opens_source: bool,
    /// Char offset, across all sources without headers, where this unit ends.
    end_char: usize,
}

/// Splits the corpus into exactly `ceil(total_chars / target_size)` ordered
/// chunks. Each source is cut into paragraph, then sentence, then word aligned
/// units no longer than [`boundary_unit_size`], and a chunk closes on the
/// first unit that reaches its share of the corpus, so no chunk runs more than
/// one unit past the target. Headers are repeated at the start of every
/// source segment and are not counted toward the target.
pub fn split_into_chunks(
    sources: &[ExtractedText],
    total_chars: usize,
    target_size: usize,
    max_chunks: usize,
) -> Result<Vec<Chunk>, AppError> {
    if target_size == 0 {
        return Err(AppError::InternalError(
            "chunk target size must be greater than zero".into(),
        ));
    }

    let expected = expected_chunk_count(total_chars, target_size);
    if expected > max_chunks {
        return Err(chunk_limit_error(expected, max_chunks));
    }

    let units = boundary_units(sources, boundary_unit_size(target_size));

    let mut chunks = Vec::with_capacity(expected);
    let mut pending: Vec<&Unit> = Vec::new();
    for unit in &units {
        pending.push(unit);
        let share_end = target_size.saturating_mul(chunks.len().saturating_add(1));
        if unit.end_char >= share_end {
            chunks.push(Chunk::new(chunks.len(), render_chunk(sources, &pending)));
            pending.clear();
        }
    }
    if !pending.is_empty() {
        chunks.push(Chunk::new(chunks.len(), render_chunk(sources, &pending)));
    }

    if chunks.len() > max_chunks {
        return Err(chunk_limit_error(chunks.len(), max_chunks));
    }

    Ok(chunks)
}

fn boundary_units(sources: &[ExtractedText], unit_size: usize) -> Vec<Unit> {
    let splitter = TextSplitter::new(ChunkConfig::new(unit_size));
    let mut units = Vec::new();
    let mut source_base = 0_usize;

    for (source, entry) in sources.iter().enumerate() {
        let mut scanned_bytes = 0_usize;
        let mut scanned_chars = 0_usize;

        for (position, (offset, piece)) in splitter.chunk_indices(&entry.text).enumerate() {
            let end = offset.saturating_add(piece.len());
            let advanced = entry
                .text
                .get(scanned_bytes..end)
                .map_or(0, |span| span.chars().count());
            scanned_chars = scanned_chars.saturating_add(advanced);
            scanned_bytes = end;

            units.push(Unit {
                source,
                bytes: offset..end,
                opens_source: position == 0,
                end_char: source_base.saturating_add(scanned_chars),
            });
        }

        source_base = source_base.saturating_add(entry.char_length);
    }

    units
}

/// Joins consecutive units, starting a new headed segment whenever the source
/// changes.
fn render_chunk(sources: &[ExtractedText], units: &[&Unit]) -> String {
    let mut segments: Vec<String> = Vec::new();

    for group in units.chunk_by(|a, b| a.source == b.source) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let Some(entry) = sources.get(first.source) else {
            continue;
        };

        let header = if first.opens_source {
            source_header(&entry.source_name)
        } else {
            source_header(&format!("{} (continued)", entry.source_name))
        };
        let body = entry
            .text
            .get(first.bytes.start..last.bytes.end)
            .unwrap_or_default();

        segments.push(format!("{header}\n{body}"));
    }

    segments.join("\n\n")
}

fn chunk_limit_error(count: usize, max_chunks: usize) -> AppError {
    AppError::BudgetExceeded(format!(
        "Documents would need {count} sections to process, more than the limit of {max_chunks}. Please upload less content"
    ))
}
