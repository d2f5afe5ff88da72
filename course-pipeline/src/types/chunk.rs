use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub char_length: usize,
}

impl Chunk {
    pub fn new(index: usize, text: String) -> Self {
        let char_length = text.chars().count();
        Self {
            index,
            text,
            char_length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChunkStatus {
    Succeeded,
    Failed,
}

/// Final result of the map stage for one chunk. Created once the chunk either
/// succeeds or runs out of attempts; never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkOutcome {
    pub chunk_index: usize,
    pub status: ChunkStatus,
    pub summary_text: Option<String>,
    pub attempts_used: u32,
}

impl ChunkOutcome {
    pub fn succeeded(chunk_index: usize, summary_text: String, attempts_used: u32) -> Self {
        Self {
            chunk_index,
            status: ChunkStatus::Succeeded,
            summary_text: Some(summary_text),
            attempts_used,
        }
    }

    pub fn failed(chunk_index: usize, attempts_used: u32) -> Self {
        Self {
            chunk_index,
            status: ChunkStatus::Failed,
            summary_text: None,
            attempts_used,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ChunkStatus::Succeeded
    }
}
