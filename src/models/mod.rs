//! Request/response models for the gateway.
//!
//! Everything here is request-scoped: built for one call, serialized with
//! `serde`, and dropped. Nothing is persisted beyond the object write.

pub mod embedding;
pub mod health;
pub mod upload;
