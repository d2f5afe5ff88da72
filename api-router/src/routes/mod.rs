pub mod courses;
pub mod liveness;
