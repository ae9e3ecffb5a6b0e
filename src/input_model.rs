// Input Model - turns the displayed form state into a simulation request
// Pure transform: nothing here touches the network or the map

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::map_surface::LatLng;

/// Density used when the density field is left blank (kg/m³)
pub const DEFAULT_DENSITY_KG_M3: f64 = 3000.0;

// =============================================================================
// REQUEST TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Manual,
    Catalog,
}

impl InputMode {
    pub fn label(&self) -> &'static str {
        match self {
            InputMode::Manual => "Manual",
            InputMode::Catalog => "Asteroid ID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualRequest {
    pub lat: f64,
    pub lon: f64,
    pub diameter_m: f64,
    pub velocity_kms: f64,
    pub density_kg_m3: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_deg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRequest {
    pub lat: f64,
    pub lon: f64,
    pub neo_id: String,
    pub density_kg_m3: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle_deg: Option<f64>,
}

/// Body of `POST /simulate`. Serialized flat; the variant is implied by
/// which impactor fields are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImpactRequest {
    Catalog(CatalogRequest),
    Manual(ManualRequest),
}

impl ImpactRequest {
    pub fn mode(&self) -> InputMode {
        match self {
            ImpactRequest::Manual(_) => InputMode::Manual,
            ImpactRequest::Catalog(_) => InputMode::Catalog,
        }
    }

    pub fn location(&self) -> LatLng {
        match self {
            ImpactRequest::Manual(m) => LatLng::new(m.lat, m.lon),
            ImpactRequest::Catalog(c) => LatLng::new(c.lat, c.lon),
        }
    }

    pub fn density_kg_m3(&self) -> f64 {
        match self {
            ImpactRequest::Manual(m) => m.density_kg_m3,
            ImpactRequest::Catalog(c) => c.density_kg_m3,
        }
    }

    pub fn angle_deg(&self) -> Option<f64> {
        match self {
            ImpactRequest::Manual(m) => m.angle_deg,
            ImpactRequest::Catalog(c) => c.angle_deg,
        }
    }

    pub fn diameter_m(&self) -> Option<f64> {
        match self {
            ImpactRequest::Manual(m) => Some(m.diameter_m),
            ImpactRequest::Catalog(_) => None,
        }
    }

    pub fn velocity_kms(&self) -> Option<f64> {
        match self {
            ImpactRequest::Manual(m) => Some(m.velocity_kms),
            ImpactRequest::Catalog(_) => None,
        }
    }

    /// Name typed by the user (manual mode only)
    pub fn user_name(&self) -> Option<&str> {
        match self {
            ImpactRequest::Manual(m) => m.name.as_deref(),
            ImpactRequest::Catalog(_) => None,
        }
    }

    pub fn neo_id(&self) -> Option<&str> {
        match self {
            ImpactRequest::Manual(_) => None,
            ImpactRequest::Catalog(c) => Some(c.neo_id.as_str()),
        }
    }
}

// =============================================================================
// FORM STATE
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualFields {
    pub diameter: String,
    pub velocity: String,
    pub density: String,
    pub angle: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFields {
    pub neo_id: String,
    pub density: String,
    pub angle: String,
}

/// Raw text of every input, exactly as displayed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormFields {
    pub lat: String,
    pub lon: String,
    pub manual: ManualFields,
    pub catalog: CatalogFields,
}

impl FormFields {
    /// Write a picked location back into the lat/lon inputs
    pub fn set_location(&mut self, lat: f64, lon: f64) {
        self.lat = format_coordinate(lat);
        self.lon = format_coordinate(lon);
    }
}

// =============================================================================
// PAYLOAD BUILDING
// =============================================================================

fn require_number(raw: &str, field: &str) -> Result<f64, ValidationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(ValidationError::missing(field));
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(ValidationError::invalid(field)),
    }
}

/// Blank means "let the server decide"; anything else must be a finite number.
fn optional_number(raw: &str, field: &str) -> Result<Option<f64>, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }
    require_number(raw, field).map(Some)
}

fn density_or_default(raw: &str) -> Result<f64, ValidationError> {
    if raw.trim().is_empty() {
        return Ok(DEFAULT_DENSITY_KG_M3);
    }
    require_number(raw, "Density (kg/m³)")
}

/// Build the request for the active mode from the current form.
///
/// Fails on the first blank or non-finite required field, in display order:
/// latitude, longitude, then the mode's impactor fields.
pub fn build_payload(mode: InputMode, fields: &FormFields) -> Result<ImpactRequest, ValidationError> {
    let lat = require_number(&fields.lat, "Latitude")?;
    let lon = require_number(&fields.lon, "Longitude")?;

    match mode {
        InputMode::Manual => {
            let m = &fields.manual;
            let diameter_m = require_number(&m.diameter, "Diameter (m)")?;
            let velocity_kms = require_number(&m.velocity, "Velocity (km/s)")?;
            let density_kg_m3 = density_or_default(&m.density)?;
            let angle_deg = optional_number(&m.angle, "Angle (deg)")?;
            let name = Some(m.name.trim())
                .filter(|n| !n.is_empty())
                .map(str::to_string);

            Ok(ImpactRequest::Manual(ManualRequest {
                lat,
                lon,
                diameter_m,
                velocity_kms,
                density_kg_m3,
                angle_deg,
                name,
            }))
        }
        InputMode::Catalog => {
            let c = &fields.catalog;
            let neo_id = c.neo_id.trim();
            if neo_id.is_empty() {
                return Err(ValidationError::missing("Asteroid ID"));
            }
            let density_kg_m3 = density_or_default(&c.density)?;
            let angle_deg = optional_number(&c.angle, "Angle (deg)")?;

            Ok(ImpactRequest::Catalog(CatalogRequest {
                lat,
                lon,
                neo_id: neo_id.to_string(),
                density_kg_m3,
                angle_deg,
            }))
        }
    }
}

/// Coordinate text as written into the lat/lon inputs
pub fn format_coordinate(value: f64) -> String {
    format!("{:.4}", value)
}

/// Read typed coordinates back; `None` unless both parse to finite values.
pub fn parse_coordinates(lat: &str, lon: &str) -> Option<LatLng> {
    let lat = lat.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    let lon = lon.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(LatLng::new(lat, lon))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationKind;

    fn manual_form() -> FormFields {
        FormFields {
            lat: "39.7392".into(),
            lon: "-104.9903".into(),
            manual: ManualFields {
                diameter: "150".into(),
                velocity: "19.5".into(),
                density: "".into(),
                angle: "".into(),
                name: "  Test rock ".into(),
            },
            catalog: CatalogFields::default(),
        }
    }

    fn catalog_form() -> FormFields {
        FormFields {
            lat: "35.0".into(),
            lon: "-100.0".into(),
            manual: ManualFields {
                diameter: "999".into(),
                velocity: "20".into(),
                ..Default::default()
            },
            catalog: CatalogFields {
                neo_id: " 3542519 ".into(),
                density: "2600".into(),
                angle: "30".into(),
            },
        }
    }

    #[test]
    fn test_manual_payload_defaults_density_and_omits_angle() {
        let req = build_payload(InputMode::Manual, &manual_form()).unwrap();
        match &req {
            ImpactRequest::Manual(m) => {
                assert!((m.density_kg_m3 - 3000.0).abs() < 1e-10);
                assert_eq!(m.angle_deg, None);
                assert_eq!(m.name.as_deref(), Some("Test rock"));
                assert!((m.diameter_m - 150.0).abs() < 1e-10);
            }
            other => panic!("expected manual request, got {:?}", other),
        }

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("angle_deg").is_none());
        assert!(json.get("neo_id").is_none());
        assert_eq!(json["velocity_kms"], 19.5);
    }

    #[test]
    fn test_catalog_payload_never_carries_manual_fields() {
        let req = build_payload(InputMode::Catalog, &catalog_form()).unwrap();
        assert_eq!(req.neo_id(), Some("3542519"));
        assert_eq!(req.diameter_m(), None);
        assert_eq!(req.velocity_kms(), None);

        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("diameter_m").is_none());
        assert!(json.get("velocity_kms").is_none());
        assert_eq!(json["neo_id"], "3542519");
        assert_eq!(json["angle_deg"], 30.0);
    }

    #[test]
    fn test_blank_coordinates_fail_validation() {
        let mut form = manual_form();
        form.lat = "   ".into();
        let err = build_payload(InputMode::Manual, &form).unwrap_err();
        assert_eq!(err, ValidationError::missing("Latitude"));

        let mut form = catalog_form();
        form.lon = "".into();
        let err = build_payload(InputMode::Catalog, &form).unwrap_err();
        assert_eq!(err, ValidationError::missing("Longitude"));
    }

    #[test]
    fn test_blank_impactor_fields_fail_validation() {
        let mut form = manual_form();
        form.manual.diameter.clear();
        let err = build_payload(InputMode::Manual, &form).unwrap_err();
        assert_eq!(err.field, "Diameter (m)");

        let mut form = manual_form();
        form.manual.velocity = " ".into();
        let err = build_payload(InputMode::Manual, &form).unwrap_err();
        assert_eq!(err.field, "Velocity (km/s)");

        let mut form = catalog_form();
        form.catalog.neo_id = "   ".into();
        let err = build_payload(InputMode::Catalog, &form).unwrap_err();
        assert_eq!(err, ValidationError::missing("Asteroid ID"));
    }

    #[test]
    fn test_non_finite_numbers_are_invalid() {
        let mut form = manual_form();
        form.manual.velocity = "fast".into();
        let err = build_payload(InputMode::Manual, &form).unwrap_err();
        assert_eq!(err.kind, ValidationKind::Invalid);

        let mut form = manual_form();
        form.manual.diameter = "inf".into();
        assert!(build_payload(InputMode::Manual, &form).is_err());

        let mut form = catalog_form();
        form.catalog.angle = "NaN".into();
        let err = build_payload(InputMode::Catalog, &form).unwrap_err();
        assert_eq!(err, ValidationError::invalid("Angle (deg)"));
    }

    #[test]
    fn test_request_json_roundtrips_to_same_variant() {
        let catalog = build_payload(InputMode::Catalog, &catalog_form()).unwrap();
        let text = serde_json::to_string(&catalog).unwrap();
        let back: ImpactRequest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.mode(), InputMode::Catalog);
        assert_eq!(back, catalog);
    }

    #[test]
    fn test_coordinate_text_helpers() {
        let mut form = FormFields::default();
        form.set_location(40.712_776, -74.005_974);
        assert_eq!(form.lat, "40.7128");
        assert_eq!(form.lon, "-74.0060");

        let p = parse_coordinates(&form.lat, &form.lon).unwrap();
        assert!((p.lat - 40.7128).abs() < 1e-10);
        assert!(parse_coordinates("40.0", "").is_none());
        assert!(parse_coordinates("abc", "-90").is_none());
    }
}
