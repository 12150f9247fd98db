//! Upload & embedding gateway.
//!
//! Accepts file uploads into an object store, forwards text to an embedding
//! provider, and reports the health of both dependencies.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
