//! HTTP API for Kubejudge.

mod handlers;
mod routes;
mod types;

pub use routes::build_router;
