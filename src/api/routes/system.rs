// src/api/routes/system.rs
use axum::http::Method;
use axum::routing::get;

use crate::api::handlers::system;
use crate::server::{ServerResult, ServerRuntime};

pub fn register(runtime: &ServerRuntime) -> ServerResult<()> {
    runtime.register_route(Method::GET, "/system/health", get(system::health))
}
