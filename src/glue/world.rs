//! Per-scenario state
//!
//! Every scenario gets a fresh `World`; steps of the same scenario share it.

use std::collections::HashMap;

use crate::http::{join_url, HttpClient, HttpResponse};

/// Mutable state threaded through the steps of one scenario
#[derive(Debug)]
pub struct World {
    http: HttpClient,
    /// Base URL for relative request paths
    pub base_url: Option<String>,
    /// Named values set by steps, referenced as `${name}` in arguments
    pub vars: HashMap<String, String>,
    /// Headers sent with every request of this scenario
    pub headers: HashMap<String, String>,
    /// Last API response
    pub response: Option<HttpResponse>,
    /// Last page opened by a web step
    pub page: Option<HttpResponse>,
}

impl World {
    pub fn new(http: HttpClient, base_url: Option<String>) -> Self {
        Self {
            http,
            base_url,
            vars: HashMap::new(),
            headers: HashMap::new(),
            response: None,
            page: None,
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Resolve a request path against the scenario's base URL
    pub fn url(&self, path: &str) -> anyhow::Result<String> {
        Ok(join_url(self.base_url.as_deref(), path)?)
    }

    /// Replace `${name}` references with stored variables.
    ///
    /// Unknown names are left untouched.
    pub fn interpolate(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match self.vars.get(name) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 2 + end + 1]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }

    pub fn last_response(&self) -> anyhow::Result<&HttpResponse> {
        self.response
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No request has been sent in this scenario"))
    }

    pub fn current_page(&self) -> anyhow::Result<&HttpResponse> {
        self.page
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No page has been opened in this scenario"))
    }
}

#[cfg(test)]
pub(crate) fn test_world() -> World {
    let http = HttpClient::with_timeout(5).expect("http client");
    World::new(http, None)
}
