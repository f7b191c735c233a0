//! API types shared between the gallery server and its clients.
//!
//! This crate contains:
//! - Listing types (`ImageRecord`, `ListImagesResponse`)
//! - Upload types (`UploadResponse`, `UploadedFile`)
//! - Small envelopes used by every endpoint (`ErrorResponse`, `HealthResponse`)

pub mod image;
pub mod response;
pub mod upload;

pub use image::*;
pub use response::*;
pub use upload::*;
