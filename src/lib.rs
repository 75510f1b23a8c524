//! Upload Orchestrator Library
//!
//! Accepts chunked file uploads, stages each chunk on local disk under its
//! content checksum, and records file and chunk metadata in a data service.
//!
//! # Modules
//!
//! - `upload`: Chunk staging, quota evaluation and the upload/deletion flows
//! - `metadata`: The metadata store seam (HTTP data service or in-memory)
//! - `auth`: Bearer token verification
//! - `routes`: The HTTP surface

pub mod auth;
pub mod config;
pub mod error;
pub mod metadata;
pub mod routes;
pub mod state;
pub mod upload;
