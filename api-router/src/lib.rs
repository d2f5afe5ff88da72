use api_state::ApiState;
use axum::{
    extract::{DefaultBodyLimit, FromRef},
    routing::{get, post},
    Router,
};
use routes::{courses::generate_course, liveness::live};

pub mod api_state;
pub mod error;
mod routes;

/// Router for API functionality, version 1
pub fn api_routes_v1<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    // Public, unauthenticated endpoints (for k8s/systemd probes)
    let public = Router::new().route("/live", get(live));

    let courses = Router::new().route(
        "/courses/generate",
        post(generate_course).layer(DefaultBodyLimit::max(app_state.config.max_body_bytes)),
    );

    public.merge(courses)
}
