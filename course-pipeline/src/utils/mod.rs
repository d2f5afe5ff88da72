pub mod error_classification;
pub mod file_text_extraction;
pub mod llm_instructions;
