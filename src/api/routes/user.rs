// src/api/routes/user.rs
use axum::http::Method;
use axum::routing::{get, post};

use crate::api::handlers::user;
use crate::server::{ServerResult, ServerRuntime};

pub fn register(runtime: &ServerRuntime) -> ServerResult<()> {
    runtime.register_route(Method::GET, "/user", get(user::query))?;
    runtime.register_route(Method::POST, "/user", post(user::create))?;
    Ok(())
}
