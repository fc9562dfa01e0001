//! HTTP client module for glue steps
//!
//! Provides the HTTP client API and web-page steps drive.

mod client;

pub use client::{join_url, HttpClient, HttpRequest, HttpResponse};
