//! # Gantry Test
//!
//! In-process testing for Gantry pipelines: requests go through the full
//! filter chain, dispatcher and interceptors without binding a port.
//!
//! ## Example
//!
//! ```rust
//! use gantry_server::Gantry;
//! use gantry_test::TestClient;
//! use http::StatusCode;
//! use serde_json::json;
//!
//! let pipeline = Gantry::new()
//!     .routes(|mapper| {
//!         mapper.get("/secure").header("Token").handle(|token: String| token.len());
//!     })
//!     .build()
//!     .unwrap();
//! let client = TestClient::new(pipeline);
//!
//! client
//!     .get("/secure")
//!     .send()
//!     .assert_status(StatusCode::BAD_REQUEST)
//!     .assert_json_field("error.code", &json!("MISSING_PARAMETER"));
//!
//! client
//!     .get("/secure")
//!     .header("Token", "abc")
//!     .send()
//!     .assert_status(StatusCode::OK)
//!     .assert_body_eq("3");
//! ```

#![doc(html_root_url = "https://docs.rs/gantry-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder, MULTIPART_BOUNDARY};
pub use response::TestResponse;
