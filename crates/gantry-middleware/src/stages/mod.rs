//! Ready-made filters.

pub mod cors;

pub use cors::{AllowedOrigins, CorsBuilder, CorsConfig, CorsFilter};
