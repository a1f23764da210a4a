// src/config.rs

use std::{env, net::SocketAddr};

use dotenvy::dotenv;
use url::Url;

/// Default countdown budget for a quiz attempt (30 minutes).
pub const DEFAULT_QUIZ_DURATION_SECS: u32 = 1800;

/// Default upper bound for an uploaded source document (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    /// Base URL of the content-indexing / generation service (`/upload`, `/retrieve`).
    pub rag_base_url: Url,
    pub http_timeout_secs: u64,
    pub quiz_duration_secs: u32,
    pub max_upload_bytes: usize,
    pub bind_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let rag_base_url = env::var("RAG_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let rag_base_url = Url::parse(&rag_base_url)
            .map(as_base_url)
            .expect("RAG_BASE_URL must be a valid URL");

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .expect("BIND_ADDR must be a socket address, e.g. 0.0.0.0:3000");

        Self {
            database_url,
            rust_log,
            rag_base_url,
            http_timeout_secs: parse_or("HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS),
            quiz_duration_secs: parse_or("QUIZ_DURATION_SECS", DEFAULT_QUIZ_DURATION_SECS),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            bind_addr,
        }
    }
}

/// Ensures the path ends with `/`, so `join("upload")` appends a segment
/// instead of replacing the last one.
pub fn as_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_path_prefix_when_joined() {
        let base = as_base_url(Url::parse("http://rag.internal/rag").unwrap());

        assert_eq!(base.as_str(), "http://rag.internal/rag/");
        assert_eq!(
            base.join("retrieve").unwrap().as_str(),
            "http://rag.internal/rag/retrieve"
        );
    }

    #[test]
    fn test_base_url_with_slash_is_unchanged() {
        let base = as_base_url(Url::parse("http://localhost:8000/").unwrap());
        assert_eq!(base.as_str(), "http://localhost:8000/");
        assert_eq!(base.join("upload").unwrap().path(), "/upload");
    }
}
