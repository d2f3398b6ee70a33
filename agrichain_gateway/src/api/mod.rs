//! HTTP surface of the gateway
//!
//! Handlers translate requests into record builders, estimator calls and
//! storage operations. Success bodies are `{success: true, data}`; every
//! failure goes through [`errors::ApiError`].

pub mod errors;
pub mod handlers;
pub mod server;
pub mod validation;

pub use errors::{ApiError, ApiResponse, ApiResult, GatewayError};
pub use server::{create_router, start_server, AppState, ENDPOINTS};
