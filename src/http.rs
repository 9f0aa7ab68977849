//! Request and response snapshot types shared by the store and the worker.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;

/// HTTP method of an intercepted request.
///
/// Only GET requests ever touch the cache; the other variants exist so the
/// worker can recognize and pass them through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Method {
  Get,
  Head,
  Post,
  Put,
  Delete,
  Patch,
  Options,
}

impl Method {
  pub fn is_get(&self) -> bool {
    matches!(self, Method::Get)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Head => "HEAD",
      Method::Post => "POST",
      Method::Put => "PUT",
      Method::Delete => "DELETE",
      Method::Patch => "PATCH",
      Method::Options => "OPTIONS",
    }
  }
}

/// An outgoing request as seen by the fetch interceptor.
#[derive(Debug, Clone)]
pub struct Request {
  pub method: Method,
  pub url: Url,
}

impl Request {
  pub fn new(method: Method, url: Url) -> Self {
    Self { method, url }
  }

  pub fn get(url: Url) -> Self {
    Self::new(Method::Get, url)
  }

  /// Stable, fixed-length cache identity for this request.
  pub fn cache_hash(&self) -> String {
    let input = format!("{}:{}", self.method.as_str(), self.url);

    // SHA256 hash for stable, fixed-length keys
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }
}

/// A response captured for storage: status, headers and full body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
  pub status: u16,
  pub headers: Vec<(String, String)>,
  pub body: Vec<u8>,
}

impl ResponseSnapshot {
  pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
    Self {
      status,
      headers: Vec::new(),
      body: body.into(),
    }
  }

  /// Whether the status is in the 2xx range.
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// First header value with the given name (case-insensitive).
  pub fn header(&self, name: &str) -> Option<&str> {
    self
      .headers
      .iter()
      .find(|(n, _)| n.eq_ignore_ascii_case(name))
      .map(|(_, v)| v.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_cache_hash_stable() {
    let a = Request::get(url("https://app.example/index.html"));
    let b = Request::get(url("https://app.example/index.html"));
    assert_eq!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_cache_hash_differs_by_url() {
    let a = Request::get(url("https://app.example/a.html"));
    let b = Request::get(url("https://app.example/b.html"));
    assert_ne!(a.cache_hash(), b.cache_hash());
  }

  #[test]
  fn test_cache_hash_differs_by_method() {
    let u = url("https://app.example/a.html");
    let get = Request::get(u.clone());
    let head = Request::new(Method::Head, u);
    assert_ne!(get.cache_hash(), head.cache_hash());
  }

  #[test]
  fn test_is_success() {
    assert!(ResponseSnapshot::new(200, "").is_success());
    assert!(ResponseSnapshot::new(204, "").is_success());
    assert!(!ResponseSnapshot::new(304, "").is_success());
    assert!(!ResponseSnapshot::new(404, "").is_success());
    assert!(!ResponseSnapshot::new(206, "").is_success());
  }

  #[test]
  fn test_header_lookup_case_insensitive() {
    let mut snapshot = ResponseSnapshot::new(200, "body");
    snapshot
      .headers
      .push(("Content-Type".to_string(), "text/html".to_string()));
    assert_eq!(snapshot.header("content-type"), Some("text/html"));
    assert_eq!(snapshot.header("etag"), None);
  }
}
