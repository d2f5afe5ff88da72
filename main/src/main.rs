use api_router::{api_routes_v1, api_state::ApiState};
use axum::{extract::FromRef, Router};
use common::utils::config::{get_config, AppConfig};
use course_pipeline::{pipeline::build_openai_client, CoursePipeline};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    // Get config
    let config = get_config()?;

    let app = build_app(&config);

    info!(
        model = %config.generation_model,
        max_chunks = config.max_chunks,
        chunk_target_size = config.chunk_target_size,
        "Starting server listening on 0.0.0.0:{}",
        config.http_port
    );
    let serve_address = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_app(config: &AppConfig) -> Router {
    let openai_client = Arc::new(build_openai_client(config));
    let pipeline = Arc::new(CoursePipeline::new(openai_client, config));
    let api_state = ApiState::new(config, pipeline);

    Router::new()
        .nest("/api/v1", api_routes_v1(&api_state))
        .with_state(AppState { api_state })
}

#[derive(Clone, FromRef)]
struct AppState {
    api_state: ApiState,
}
