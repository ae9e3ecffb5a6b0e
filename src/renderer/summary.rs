// KPI and detail text for a simulation result

use chrono::{DateTime, Utc};
use std::fmt;

use super::UNKNOWN;
use crate::input_model::ImpactRequest;
use crate::simulation_client::SimulationResult;

pub const READY_HINT: &str = "Simulation ready. Adjust the parameters and run again if needed.";

fn known(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Energy in megatons, two decimals
pub fn format_energy_mt(value: Option<f64>) -> String {
    known(value).map_or_else(|| UNKNOWN.to_string(), |v| format!("{:.2}", v))
}

/// Crater radius in whole metres
pub fn format_crater_m(value: Option<f64>) -> String {
    known(value).map_or_else(|| UNKNOWN.to_string(), |v| format!("{}", v.round() as i64))
}

/// Metres shown as kilometres, two decimals
pub fn format_km(meters: Option<f64>) -> String {
    known(meters).map_or_else(|| UNKNOWN.to_string(), |v| format!("{:.2}", v / 1000.0))
}

fn format_plain(value: Option<f64>) -> String {
    known(value).map_or_else(|| UNKNOWN.to_string(), |v| format!("{}", v))
}

/// Server name, then the user's name, then the catalog id
pub fn display_name(result: &SimulationResult, request: &ImpactRequest) -> String {
    result
        .meta_name()
        .or_else(|| request.user_name())
        .or_else(|| request.neo_id())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

// =============================================================================
// SUMMARY
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct KpiSummary {
    pub energy_mt: String,
    pub crater_radius_m: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub kpis: KpiSummary,
    pub details: Vec<DetailRow>,
    pub hint: String,
}

impl ResultSummary {
    pub fn detail(&self, label: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|row| row.label == label)
            .map(|row| row.value.as_str())
    }
}

pub fn kpi_summary(result: &SimulationResult) -> KpiSummary {
    KpiSummary {
        energy_mt: format_energy_mt(result.energy_mt()),
        crater_radius_m: format_crater_m(result.crater_radius_m()),
    }
}

pub fn summarize(
    result: &SimulationResult,
    request: &ImpactRequest,
    received_at: DateTime<Utc>,
) -> ResultSummary {
    let kpis = kpi_summary(result);
    let at = request.location();
    let row = |label: &'static str, value: String| DetailRow { label, value };

    let details = vec![
        row("Mode", request.mode().label().to_string()),
        row("Name", display_name(result, request)),
        row("Diameter (m)", format_plain(request.diameter_m())),
        row("Velocity (km/s)", format_plain(request.velocity_kms())),
        row("Density (kg/m³)", format_plain(Some(request.density_kg_m3()))),
        row("Location", format!("{:.4}, {:.4}", at.lat, at.lon)),
        row("Energy (Mt TNT)", kpis.energy_mt.clone()),
        row("Crater (m)", kpis.crater_radius_m.clone()),
        row(
            "Received",
            received_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
    ];

    ResultSummary {
        kpis,
        details,
        hint: READY_HINT.to_string(),
    }
}

impl fmt::Display for ResultSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Energy:       {} Mt TNT", self.kpis.energy_mt)?;
        writeln!(f, "Crater:       {} m", self.kpis.crater_radius_m)?;
        writeln!(f)?;
        for row in &self.details {
            writeln!(f, "  {:<16} {}", format!("{}:", row.label), row.value)?;
        }
        write!(f, "\n{}", self.hint)
    }
}

// =============================================================================
// TESTS
// =============================================================================
