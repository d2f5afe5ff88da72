use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    // Input policy
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    #[serde(default = "default_estimated_chars_per_byte")]
    pub estimated_chars_per_byte: f64,
    #[serde(default = "default_max_total_chars")]
    pub max_total_chars: usize,
    #[serde(default = "default_min_source_chars")]
    pub min_source_chars: usize,
    #[serde(default = "default_min_total_chars")]
    pub min_total_chars: usize,

    // Chunking and generation policy
    #[serde(default = "default_chunk_trigger_threshold")]
    pub chunk_trigger_threshold: usize,
    #[serde(default = "default_chunk_target_size")]
    pub chunk_target_size: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_min_summary_chars")]
    pub min_summary_chars: usize,
    #[serde(default = "default_section_char_limit")]
    pub section_char_limit: usize,
    #[serde(default = "default_map_max_attempts")]
    pub map_max_attempts: u32,
    #[serde(default = "default_transient_backoff_ms")]
    pub transient_backoff_ms: u64,
    #[serde(default = "default_transient_max_delay_ms")]
    pub transient_max_delay_ms: u64,
    #[serde(default = "default_rate_limit_backoff_ms")]
    pub rate_limit_backoff_ms: u64,
    #[serde(default = "default_rate_limit_max_delay_ms")]
    pub rate_limit_max_delay_ms: u64,
    #[serde(default = "default_inter_chunk_delay_ms")]
    pub inter_chunk_delay_ms: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_generation_timeout_secs() -> u64 {
    120
}

fn default_http_port() -> u16 {
    3000
}

fn default_max_body_bytes() -> usize {
    // base64 inflates uploads by a third; leave headroom over the file ceiling
    64 * 1024 * 1024
}

fn default_max_files() -> usize {
    10
}

fn default_max_file_bytes() -> u64 {
    20 * 1024 * 1024
}

fn default_estimated_chars_per_byte() -> f64 {
    0.5
}

fn default_max_total_chars() -> usize {
    1_000_000
}

fn default_min_source_chars() -> usize {
    50
}

fn default_min_total_chars() -> usize {
    100
}

fn default_chunk_trigger_threshold() -> usize {
    50_000
}

fn default_chunk_target_size() -> usize {
    40_000
}

fn default_max_chunks() -> usize {
    20
}

fn default_min_summary_chars() -> usize {
    20
}

fn default_section_char_limit() -> usize {
    1_500
}

fn default_map_max_attempts() -> u32 {
    3
}

fn default_transient_backoff_ms() -> u64 {
    1_000
}

fn default_transient_max_delay_ms() -> u64 {
    30_000
}

fn default_rate_limit_backoff_ms() -> u64 {
    5_000
}

fn default_rate_limit_max_delay_ms() -> u64 {
    60_000
}

fn default_inter_chunk_delay_ms() -> u64 {
    1_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_base_url: default_base_url(),
            generation_model: default_generation_model(),
            generation_timeout_secs: default_generation_timeout_secs(),
            http_port: default_http_port(),
            max_body_bytes: default_max_body_bytes(),
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            estimated_chars_per_byte: default_estimated_chars_per_byte(),
            max_total_chars: default_max_total_chars(),
            min_source_chars: default_min_source_chars(),
            min_total_chars: default_min_total_chars(),
            chunk_trigger_threshold: default_chunk_trigger_threshold(),
            chunk_target_size: default_chunk_target_size(),
            max_chunks: default_max_chunks(),
            min_summary_chars: default_min_summary_chars(),
            section_char_limit: default_section_char_limit(),
            map_max_attempts: default_map_max_attempts(),
            transient_backoff_ms: default_transient_backoff_ms(),
            transient_max_delay_ms: default_transient_max_delay_ms(),
            rate_limit_backoff_ms: default_rate_limit_backoff_ms(),
            rate_limit_max_delay_ms: default_rate_limit_max_delay_ms(),
            inter_chunk_delay_ms: default_inter_chunk_delay_ms(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
