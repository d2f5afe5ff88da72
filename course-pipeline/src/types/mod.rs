mod chunk;
mod course;
mod generation;
mod source;

pub use chunk::{Chunk, ChunkOutcome, ChunkStatus};
pub use course::{
    CourseMetadata, CourseOutput, CourseRequest, DifficultyLevel, PipelineResult, PipelineStatus,
    RunReport, RunStats,
};
pub use generation::{ErrorClass, GenerationOutcome, GenerationRequest, GenerationStage};
pub use source::{source_header, Corpus, ExtractedText, SourceFailure, SourceFile};
