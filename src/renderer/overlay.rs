// Geospatial overlay - style, label and bound the result's feature collection

use serde_json::Value;

use super::{Overpressure, CRATER_COLOR, NEUTRAL_COLOR};
use crate::map_surface::{GeoBounds, LatLng, PathStyle};

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    Crater,
    Ring(Option<Overpressure>),
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFeature {
    pub geometry: Value,
    pub kind: FeatureKind,
    pub style: PathStyle,
    pub label: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub features: Vec<OverlayFeature>,
    pub bounds: GeoBounds,
}

impl Overlay {
    pub fn from_geojson(geojson: Option<&Value>) -> Self {
        build_overlay(geojson)
    }
}

// =============================================================================
// FEATURE PROPERTIES
// =============================================================================

/// The three properties the overlay cares about, normalized
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureProps {
    pub feature_type: Option<String>,
    pub psi: Option<String>,
    pub radius_m: Option<f64>,
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl FeatureProps {
    /// Reads `type`/`psi`/`radius_m`; `kind`/`label` are accepted as older spellings
    pub fn read(properties: Option<&Value>) -> Self {
        let Some(props) = properties.and_then(Value::as_object) else {
            return Self::default();
        };

        let feature_type = props.get("type").and_then(as_text).or_else(|| {
            props.get("kind").and_then(as_text).map(|kind| match kind.as_str() {
                "overpressure" => "ring".to_string(),
                _ => kind,
            })
        });

        let psi = props.get("psi").and_then(as_text).or_else(|| {
            props
                .get("label")
                .and_then(as_text)
                .filter(|l| Overpressure::parse(l).is_some())
        });

        let radius_m = props.get("radius_m").and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        });

        Self {
            feature_type,
            psi,
            radius_m: radius_m.filter(|r| r.is_finite()),
        }
    }

    pub fn level(&self) -> Option<Overpressure> {
        self.psi.as_deref().and_then(Overpressure::parse)
    }

    pub fn kind(&self) -> FeatureKind {
        match self.feature_type.as_deref() {
            Some("crater") => FeatureKind::Crater,
            Some("ring") => FeatureKind::Ring(self.level()),
            _ => FeatureKind::Other,
        }
    }

    /// `None` for features that carry none of the three properties
    pub fn label(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(t) = &self.feature_type {
            parts.push(format!("type: {}", t));
        }
        if let Some(psi) = &self.psi {
            match self.level() {
                Some(level) => parts.push(format!("psi: {}", level.psi())),
                None => parts.push(format!("psi: {}", psi)),
            }
        }
        if let Some(r) = self.radius_m {
            parts.push(format!("radius: {} m", r.round() as i64));
        }
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

pub fn style_for(kind: &FeatureKind) -> PathStyle {
    match kind {
        FeatureKind::Crater => PathStyle {
            color: CRATER_COLOR,
            weight: 3.0,
            fill_opacity: 0.35,
        },
        FeatureKind::Ring(Some(level)) => PathStyle {
            color: level.color(),
            weight: 2.0,
            fill_opacity: 0.2,
        },
        FeatureKind::Ring(None) | FeatureKind::Other => PathStyle {
            color: NEUTRAL_COLOR,
            weight: 2.0,
            fill_opacity: 0.2,
        },
    }
}

// =============================================================================
// BUILD
// =============================================================================

fn extend_with_positions(coords: &Value, bounds: &mut GeoBounds) {
    let Some(items) = coords.as_array() else {
        return;
    };
    match (items.first().and_then(Value::as_f64), items.get(1).and_then(Value::as_f64)) {
        (Some(lon), Some(lat)) => bounds.extend(LatLng::new(lat, lon)),
        _ => items.iter().for_each(|c| extend_with_positions(c, bounds)),
    }
}

fn extend_with_geometry(geometry: &Value, bounds: &mut GeoBounds) {
    if let Some(coords) = geometry.get("coordinates") {
        extend_with_positions(coords, bounds);
    }
    if let Some(parts) = geometry.get("geometries").and_then(Value::as_array) {
        for part in parts {
            extend_with_geometry(part, bounds);
        }
    }
}

fn styled_feature(feature: &Value) -> OverlayFeature {
    let props = FeatureProps::read(feature.get("properties"));
    let kind = props.kind();
    OverlayFeature {
        geometry: feature.get("geometry").cloned().unwrap_or(Value::Null),
        style: style_for(&kind),
        label: props.label(),
        kind,
    }
}

/// Accepts a FeatureCollection or a single Feature; anything else is an empty overlay
pub fn build_overlay(geojson: Option<&Value>) -> Overlay {
    let features: Vec<OverlayFeature> = match geojson {
        Some(v) if v.get("type").and_then(Value::as_str) == Some("Feature") => {
            vec![styled_feature(v)]
        }
        Some(v) => v
            .get("features")
            .and_then(Value::as_array)
            .map(|fs| fs.iter().map(styled_feature).collect())
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let mut bounds = GeoBounds::empty();
    for f in &features {
        extend_with_geometry(&f.geometry, &mut bounds);
    }

    Overlay { features, bounds }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn square(lat: f64, lon: f64, d: f64) -> Value {
        json!({
            "type": "Polygon",
            "coordinates": [[
                [lon - d, lat - d], [lon + d, lat - d], [lon + d, lat + d], [lon - d, lat + d], [lon - d, lat - d]
            ]]
        })
    }

    #[test]
    fn test_feature_styles_by_type_and_psi() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"type": "crater", "radius_m": 452.6}, "geometry": square(40.0, -100.0, 0.01)},
                {"type": "Feature", "properties": {"type": "ring", "psi": 10, "radius_m": 2000.2}, "geometry": square(40.0, -100.0, 0.05)},
                {"type": "Feature", "properties": {"type": "ring", "psi": "3psi"}, "geometry": square(40.0, -100.0, 0.1)},
                {"type": "Feature", "properties": {"type": "debris"}, "geometry": square(40.0, -100.0, 0.2)}
            ]
        });
        let overlay = build_overlay(Some(&fc));
        let f = &overlay.features;

        assert_eq!(f[0].kind, FeatureKind::Crater);
        assert_eq!(f[0].style.color, CRATER_COLOR);
        assert!(f[0].style.weight > f[1].style.weight);
        assert!(f[0].style.fill_opacity > f[1].style.fill_opacity);
        assert_eq!(f[1].style.color, Overpressure::Psi10.color());
        assert_eq!(f[2].style.color, Overpressure::Psi3.color());
        assert_eq!(f[3].style.color, NEUTRAL_COLOR);

        assert_eq!(f[0].label.as_deref(), Some("type: crater, radius: 453 m"));
        assert_eq!(f[1].label.as_deref(), Some("type: ring, psi: 10, radius: 2000 m"));
    }

    #[test]
    fn test_feature_without_properties_gets_no_label() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"name": "x"}, "geometry": {"type": "Point", "coordinates": [-100.0, 40.0]}},
                {"type": "Feature", "geometry": {"type": "Point", "coordinates": [-101.0, 41.0]}}
            ]
        });
        let overlay = build_overlay(Some(&fc));
        assert!(overlay.features.iter().all(|f| f.label.is_none()));
        assert!(overlay.features.iter().all(|f| f.kind == FeatureKind::Other));
    }

    #[test]
    fn test_kind_and_label_spelling_is_normalized() {
        let feature = json!({
            "type": "Feature",
            "properties": {"kind": "overpressure", "label": "5psi", "radius_m": 1800.0},
            "geometry": square(35.0, -90.0, 0.02)
        });
        let overlay = build_overlay(Some(&feature));
        assert_eq!(overlay.features.len(), 1);
        assert_eq!(overlay.features[0].kind, FeatureKind::Ring(Some(Overpressure::Psi5)));
        assert_eq!(overlay.features[0].style.color, Overpressure::Psi5.color());
    }

    #[test]
    fn test_bounds_cover_all_geometry() {
        let fc = json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [-100.0, 40.0]}},
                {"type": "Feature", "properties": {}, "geometry": square(41.0, -99.0, 0.5)},
                {"type": "Feature", "properties": {}, "geometry": {
                    "type": "GeometryCollection",
                    "geometries": [{"type": "Point", "coordinates": [-105.0, 38.0]}]
                }}
            ]
        });
        let b = build_overlay(Some(&fc)).bounds;
        assert!((b.south - 38.0).abs() < 1e-12);
        assert!((b.north - 41.5).abs() < 1e-12);
        assert!((b.west + 105.0).abs() < 1e-12);
        assert!((b.east + 98.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_or_malformed_geojson_is_empty() {
        assert!(build_overlay(None).features.is_empty());
        assert!(!build_overlay(None).bounds.is_valid());
        let overlay = build_overlay(Some(&json!({"type": "FeatureCollection", "features": "nope"})));
        assert!(overlay.features.is_empty());
    }
}
