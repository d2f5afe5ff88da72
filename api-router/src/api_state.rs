use std::sync::Arc;

use common::utils::config::AppConfig;
use course_pipeline::CoursePipeline;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub pipeline: Arc<CoursePipeline>,
}

impl ApiState {
    pub fn new(config: &AppConfig, pipeline: Arc<CoursePipeline>) -> Self {
        Self {
            config: config.clone(),
            pipeline,
        }
    }
}
