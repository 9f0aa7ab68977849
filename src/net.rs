//! Network seam and the reqwest-backed implementation.

use color_eyre::{eyre::eyre, Result};
use std::future::Future;

use crate::http::{Request, ResponseSnapshot};

/// Live-fetch interface used by the worker for precaching, misses and
/// background revalidation.
///
/// Implementations must be cheap to share behind an `Arc`; many fetch
/// handlers can be in flight at once.
pub trait Network: Send + Sync + 'static {
  fn fetch(&self, request: Request) -> impl Future<Output = Result<ResponseSnapshot>> + Send;
}

/// reqwest-backed network.
#[derive(Clone)]
pub struct HttpNetwork {
  client: reqwest::Client,
}

impl HttpNetwork {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;
    Ok(Self { client })
  }
}

impl Network for HttpNetwork {
  fn fetch(&self, request: Request) -> impl Future<Output = Result<ResponseSnapshot>> + Send {
    let client = self.client.clone();
    async move {
      // The worker only fetches GET requests; everything else passes
      // through untouched before reaching the network seam.
      let response = client
        .get(request.url.clone())
        .send()
        .await
        .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

      let status = response.status().as_u16();
      let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
          value
            .to_str()
            .ok()
            .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
      let body = response
        .bytes()
        .await
        .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?
        .to_vec();

      Ok(ResponseSnapshot {
        status,
        headers,
        body,
      })
    }
  }
}
