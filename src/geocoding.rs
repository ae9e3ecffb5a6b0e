// Geocoding Adapter - place search and reverse lookup behind one trait
// Reverse lookups are cosmetic: their failures become an empty label

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ClientError;

pub const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub lat: f64,
    pub lon: f64,
    pub label: String,
}

#[allow(async_fn_in_trait)]
pub trait Geocoder {
    /// First match for a free-text query
    async fn forward(&self, query: &str) -> Result<Place, ClientError>;
    /// Display name for a point, or an empty string when none is available
    async fn reverse(&self, lat: f64, lon: f64) -> String;
}

/// Policy for reverse lookups: any failure degrades to an empty label
pub fn label_or_empty(lookup: Result<String, ClientError>) -> String {
    match lookup {
        Ok(label) => label,
        Err(e) => {
            debug!("reverse geocoding fell back to coordinates: {}", e);
            String::new()
        }
    }
}

fn coordinate(value: Option<&Value>) -> Option<f64> {
    let v = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    v.is_finite().then_some(v)
}

/// Turn a search response body into the first place it names
pub fn first_place(body: &Value, query: &str) -> Result<Place, ClientError> {
    let first = body
        .as_array()
        .and_then(|hits| hits.first())
        .ok_or_else(|| ClientError::NotFound(format!("No location found for '{}'", query)))?;

    let (Some(lat), Some(lon)) = (coordinate(first.get("lat")), coordinate(first.get("lon"))) else {
        return Err(ClientError::Transport(format!(
            "Geocoding returned an unusable location for '{}'",
            query
        )));
    };

    let label = first
        .get("display_name")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(query)
        .to_string();

    Ok(Place { lat, lon, label })
}

// =============================================================================
// NOMINATIM
// =============================================================================

pub struct NominatimClient {
    base_url: String,
    accept_language: String,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(base_url: impl Into<String>, accept_language: impl Into<String>) -> Self {
        Self::with_client(base_url, accept_language, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: impl Into<String>,
        accept_language: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            accept_language: accept_language.into(),
            client,
        }
    }

    /// Reverse lookup with its failure intact
    pub async fn lookup_reverse(&self, lat: f64, lon: f64) -> Result<String, ClientError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("format", "json".to_string()),
            ])
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.accept_language)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Transport(format!(
                "Reverse geocoding HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: Value = response.json().await?;
        Ok(body
            .get("display_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }
}

impl Geocoder for NominatimClient {
    async fn forward(&self, query: &str) -> Result<Place, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ClientError::NotFound("Enter a place to search for".to_string()));
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("format", "json"), ("q", query)])
            .header(reqwest::header::ACCEPT_LANGUAGE, &self.accept_language)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "geocoding search failed");
            return Err(ClientError::Transport(format!(
                "Geocoding HTTP {}",
                status.as_u16()
            )));
        }

        let body: Value = response.json().await?;
        first_place(&body, query)
    }

    async fn reverse(&self, lat: f64, lon: f64) -> String {
        label_or_empty(self.lookup_reverse(lat, lon).await)
    }
}

// =============================================================================
// TESTS
// =============================================================================
