use std::{sync::Arc, time::Duration};

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, ResponseFormat,
        ResponseFormatJsonSchema,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use common::{error::AppError, utils::config::AppConfig};
use tracing::{debug, warn};

use crate::{
    types::{ErrorClass, GenerationOutcome, GenerationRequest, GenerationStage, SourceFile},
    utils::{
        error_classification::classify_openai_error,
        file_text_extraction::extract_text_from_source,
        llm_instructions::{
            get_course_schema, SUMMARIZE_SYSTEM_MESSAGE, SYNTHESIZE_SYSTEM_MESSAGE,
        },
    },
};

/// External collaborators of the pipeline: the text extractor and the generation client.
#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn extract_text(&self, file: &SourceFile) -> Result<String, AppError>;

    /// Issues one generation call. Never returns an unclassified failure.
    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome;
}

/// Builds the generation client with its internal retries disabled. Throttling
/// must reach the pipeline as a classified failure so the map-stage retry
/// policy, not the client, decides when to try again.
pub fn build_openai_client(config: &AppConfig) -> Client<OpenAIConfig> {
    let no_retries = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Client::with_config(
        OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    )
    .with_backoff(no_retries)
}

pub struct DefaultPipelineServices {
    openai_client: Arc<Client<OpenAIConfig>>,
    model: String,
    timeout: Duration,
}

impl DefaultPipelineServices {
    pub fn new(openai_client: Arc<Client<OpenAIConfig>>, config: &AppConfig) -> Self {
        Self {
            openai_client,
            model: config.generation_model.clone(),
            timeout: Duration::from_secs(config.generation_timeout_secs),
        }
    }

    fn prepare_llm_request(
        &self,
        request: &GenerationRequest,
    ) -> Result<CreateChatCompletionRequest, AppError> {
        let system_message = match request.stage {
            GenerationStage::Summarize => SUMMARIZE_SYSTEM_MESSAGE,
            GenerationStage::Synthesize => SYNTHESIZE_SYSTEM_MESSAGE,
        };

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&self.model).messages([
            ChatCompletionRequestSystemMessage::from(system_message).into(),
            ChatCompletionRequestUserMessage::from(request.prompt_text.clone()).into(),
        ]);

        if request.stage == GenerationStage::Synthesize {
            builder.response_format(ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    description: Some("Structured training course".into()),
                    name: "training_course".into(),
                    schema: Some(get_course_schema()),
                    strict: Some(true),
                },
            });
        }

        Ok(builder.build()?)
    }

    async fn perform_generation(
        &self,
        request: CreateChatCompletionRequest,
    ) -> GenerationOutcome {
        let response =
            match tokio::time::timeout(self.timeout, self.openai_client.chat().create(request))
                .await
            {
                Ok(Ok(response)) => response,
                Ok(Err(err)) => {
                    let class = classify_openai_error(&err);
                    return GenerationOutcome::failure(class, err.to_string());
                }
                Err(_) => {
                    return GenerationOutcome::failure(
                        ErrorClass::Timeout,
                        format!("no response within {}s", self.timeout.as_secs()),
                    );
                }
            };

        match response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
        {
            Some(content) => GenerationOutcome::Success(content),
            None => GenerationOutcome::failure(
                ErrorClass::Unknown,
                "No content found in LLM response",
            ),
        }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn extract_text(&self, file: &SourceFile) -> Result<String, AppError> {
        extract_text_from_source(file).await
    }

    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        let llm_request = match self.prepare_llm_request(request) {
            Ok(llm_request) => llm_request,
            Err(err) => {
                warn!(stage = request.stage.as_str(), error = %err, "failed to build generation request");
                return GenerationOutcome::failure(ErrorClass::Unknown, err.to_string());
            }
        };

        debug!(
            stage = request.stage.as_str(),
            prompt_chars = request.prompt_text.chars().count(),
            model = %self.model,
            "issuing generation request"
        );

        self.perform_generation(llm_request).await
    }
}
