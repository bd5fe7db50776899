//! services/api/src/adapters/image_search.rs
//!
//! This module contains the adapter for the image search used by learning
//! journeys. It implements the `ImageSearchService` port with `reqwest`.
//!
//! The endpoint takes `{ "queries": [..], "maxResultsPerQuery": 1 }` and answers
//! with a list of results carrying `imageUrl`, the shape of a synchronous
//! Apify Google Images run.

use std::time::Duration;

use async_trait::async_trait;
use learning_session_core::ports::{ImageSearchService, PortError, PortResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct HttpImageSearchAdapter {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpImageSearchAdapter {
    /// Creates a new `HttpImageSearchAdapter`. The token, when present, is sent as a bearer token.
    pub fn new(
        url: impl Into<String>,
        token: Option<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.into(),
            token,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchBody<'a> {
    queries: [&'a str; 1],
    max_results_per_query: u32,
    save_images: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchHit {
    #[serde(default)]
    image_url: Option<String>,
}

//=========================================================================================
// `ImageSearchService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageSearchService for HttpImageSearchAdapter {
    async fn find_image(&self, descriptor: &str) -> PortResult<Option<String>> {
        let mut request = self.client.post(&self.url).json(&SearchBody {
            queries: [descriptor],
            max_results_per_query: 1,
            save_images: false,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PortError::TimedOut
            } else {
                PortError::Unexpected(e.to_string())
            }
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!("Image search responded with {}.", status);
            return Err(PortError::Rejected {
                status: status.as_u16(),
                message: String::new(),
            });
        }
        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| PortError::Malformed(e.to_string()))?;

        let url = hits
            .into_iter()
            .filter_map(|hit| hit.image_url)
            .find(|url| !url.trim().is_empty());
        debug!("Image search for '{}' found {:?}.", descriptor, url);
        Ok(url)
    }
}
