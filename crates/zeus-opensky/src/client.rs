//! OpenSky REST client.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeus_core::FlightBatch;

use crate::states::StatesResponse;

pub const DEFAULT_OPENSKY_URL: &str = "https://opensky-network.org/api/states/all";

#[derive(Debug, Error)]
pub enum OpenSkyError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to OpenSky failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("OpenSky rate limit hit")]
    RateLimited,
    #[error("OpenSky returned status {0}")]
    Status(StatusCode),
    #[error("failed to decode OpenSky response: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Geographic query window in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub lamin: f64,
    pub lomin: f64,
    pub lamax: f64,
    pub lomax: f64,
}

impl BoundingBox {
    /// California.
    pub const CALIFORNIA: BoundingBox = BoundingBox {
        lamin: 32.5,
        lomin: -124.5,
        lamax: 42.0,
        lomax: -114.0,
    };

    /// Parse `lamin,lomin,lamax,lomax`.
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<f64> = value
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .ok()?;
        let [lamin, lomin, lamax, lomax] = parts.as_slice() else {
            return None;
        };
        if lamin >= lamax || lomin >= lomax {
            return None;
        }
        Some(Self {
            lamin: *lamin,
            lomin: *lomin,
            lamax: *lamax,
            lomax: *lomax,
        })
    }

    fn query(&self) -> [(&'static str, f64); 4] {
        [
            ("lamin", self.lamin),
            ("lomin", self.lomin),
            ("lamax", self.lamax),
            ("lomax", self.lomax),
        ]
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::CALIFORNIA
    }
}

/// HTTP client for the OpenSky states endpoint.
pub struct OpenSkyClient {
    client: Client,
    url: String,
}

impl OpenSkyClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, OpenSkyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(OpenSkyError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch raw state vectors inside the bounding box.
    pub async fn fetch_states(&self, bbox: &BoundingBox) -> Result<StatesResponse, OpenSkyError> {
        let response = self
            .client
            .get(&self.url)
            .query(&bbox.query())
            .send()
            .await
            .map_err(OpenSkyError::Request)?;

        match response.status() {
            StatusCode::OK => response.json().await.map_err(OpenSkyError::Decode),
            StatusCode::TOO_MANY_REQUESTS => Err(OpenSkyError::RateLimited),
            status => Err(OpenSkyError::Status(status)),
        }
    }

    /// Fetch one polling cycle as a batch.
    ///
    /// `Ok(None)` means the upstream answered but had no aircraft to report.
    pub async fn fetch_batch(
        &self,
        bbox: &BoundingBox,
    ) -> Result<Option<FlightBatch>, OpenSkyError> {
        let states = self.fetch_states(bbox).await?;
        let now = Utc::now().timestamp_millis() as f64 / 1000.0;
        Ok(states.into_batch(now))
    }
}
