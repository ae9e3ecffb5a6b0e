// Simulation Client - POST /simulate and narrow the response
// The service is a black box; every field it returns is treated as optional

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::input_model::ImpactRequest;
use crate::renderer::Overpressure;

// =============================================================================
// RESPONSE TYPES
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub energy_mt: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub crater_radius_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RingRadii {
    #[serde(rename = "1psi", default, deserialize_with = "lenient_f64")]
    pub psi1: Option<f64>,
    #[serde(rename = "3psi", default, deserialize_with = "lenient_f64")]
    pub psi3: Option<f64>,
    #[serde(rename = "5psi", default, deserialize_with = "lenient_f64")]
    pub psi5: Option<f64>,
    #[serde(rename = "10psi", default, deserialize_with = "lenient_f64")]
    pub psi10: Option<f64>,
}

impl RingRadii {
    pub fn get(&self, level: Overpressure) -> Option<f64> {
        match level {
            Overpressure::Psi1 => self.psi1,
            Overpressure::Psi3 => self.psi3,
            Overpressure::Psi5 => self.psi5,
            Overpressure::Psi10 => self.psi10,
        }
    }
}

/// One sample of the expanding blast
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeFrame {
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time_sec: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub shockwave_radius_km: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub crater_diameter_km: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMeta {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub units: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub source: Option<String>,
}

/// Decoded section by section: a malformed section reads as absent
/// instead of failing the whole response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawResult")]
pub struct SimulationResult {
    pub kpis: Option<Kpis>,
    pub rings_m: Option<RingRadii>,
    pub geojson: Option<Value>,
    pub time_series: Option<Vec<TimeFrame>>,
    pub meta: Option<ResultMeta>,
}

#[derive(Deserialize)]
struct RawResult {
    #[serde(default)]
    kpis: Option<Value>,
    #[serde(default)]
    rings_m: Option<Value>,
    #[serde(default)]
    geojson: Option<Value>,
    #[serde(default)]
    time_series: Option<Value>,
    #[serde(default)]
    meta: Option<Value>,
}

fn section<T: DeserializeOwned>(value: Option<Value>) -> Option<T> {
    match value? {
        v @ Value::Object(_) => serde_json::from_value(v).ok(),
        _ => None,
    }
}

impl From<RawResult> for SimulationResult {
    fn from(raw: RawResult) -> Self {
        // entries that are not frame objects are dropped
        let time_series = match raw.time_series {
            Some(Value::Array(items)) => Some(
                items
                    .into_iter()
                    .filter_map(|item| section::<TimeFrame>(Some(item)))
                    .collect(),
            ),
            _ => None,
        };

        Self {
            kpis: section(raw.kpis),
            rings_m: section(raw.rings_m),
            geojson: raw.geojson.filter(|g| !g.is_null()),
            time_series,
            meta: section(raw.meta),
        }
    }
}

pub(crate) fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl SimulationResult {
    pub fn energy_mt(&self) -> Option<f64> {
        finite(self.kpis.as_ref().and_then(|k| k.energy_mt))
    }

    pub fn crater_radius_m(&self) -> Option<f64> {
        finite(self.kpis.as_ref().and_then(|k| k.crater_radius_m))
    }

    pub fn ring_m(&self, level: Overpressure) -> Option<f64> {
        finite(self.rings_m.as_ref().and_then(|r| r.get(level)))
    }

    pub fn frames(&self) -> &[TimeFrame] {
        self.time_series.as_deref().unwrap_or(&[])
    }

    pub fn meta_name(&self) -> Option<&str> {
        self.meta
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Numbers, numeric strings and null; anything else reads as unknown
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Strings as-is, numbers and booleans as their text; anything else reads as absent
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// =============================================================================
// CLIENT
// =============================================================================

/// Anything that can run a simulation for a request
#[allow(async_fn_in_trait)]
pub trait ImpactSimulator {
    async fn simulate(&self, request: &ImpactRequest) -> Result<SimulationResult, ClientError>;
}

/// Map a non-success response to the error shown to the user
pub fn failure_from_response(status: u16, body: &str) -> ClientError {
    let server_message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty());

    match server_message {
        Some(msg) => ClientError::Simulation(format!("HTTP {}: {}", status, msg)),
        None => ClientError::Simulation(format!("HTTP {}", status)),
    }
}

pub struct SimulationClient {
    endpoint: String,
    client: reqwest::Client,
}

impl SimulationClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, reqwest::Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// `/health` on the same service as the simulate endpoint
    pub fn health_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let base = base.strip_suffix("/simulate").unwrap_or(base);
        format!("{}/health", base)
    }

    pub async fn health(&self) -> Result<bool, ClientError> {
        let response = self.client.get(self.health_url()).send().await?;
        if !response.status().is_success() {
            return Ok(false);
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to parse response: {}", e)))?;
        Ok(body.get("status").and_then(Value::as_str) == Some("ok"))
    }
}

impl ImpactSimulator for SimulationClient {
    async fn simulate(&self, request: &ImpactRequest) -> Result<SimulationResult, ClientError> {
        debug!(endpoint = %self.endpoint, mode = ?request.mode(), "sending simulation request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = failure_from_response(status.as_u16(), &body);
            info!("simulation rejected: {}", err);
            return Err(err);
        }

        let result: SimulationResult = response
            .json()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to parse response: {}", e)))?;

        debug!(
            frames = result.frames().len(),
            energy_mt = ?result.energy_mt(),
            "simulation result received"
        );
        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
