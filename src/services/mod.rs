pub mod embedding;
pub mod gateway_service;
pub mod local_store;
pub mod object_store;
pub mod s3_store;
pub mod validation;
