//! API Module
//!
//! HTTP handlers and routing for the gateway REST API.
//!
//! # Endpoints
//! - `POST /api/space/webhook` - Verified webhook intake
//! - `POST /api/auth/revoke` - Revoke a token by id
//! - `GET /api/auth/revoked/:jti` - Check whether a token id is revoked
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
