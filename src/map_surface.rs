// Map Surface - single marker, single result overlay, viewport framing
// The widget itself sits behind `MapBackend`; `HeadlessMap` keeps everything in memory

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::error::ClientError;
use crate::renderer::overlay::Overlay;

/// Metres per degree of latitude (local flat-earth approximation)
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Continental US, south-west and north-east corners
pub const CONUS_BOUNDS: GeoBounds = GeoBounds {
    south: 24.396308,
    west: -124.848974,
    north: 49.384358,
    east: -66.885444,
};

pub const INITIAL_CENTER: LatLng = LatLng {
    lat: 38.9,
    lon: -98.35,
};
pub const INITIAL_ZOOM: u8 = 4;
pub const MIN_ZOOM: u8 = 3;
pub const MAX_ZOOM: u8 = 18;
/// Zoom used when flying to a searched or typed location
pub const POINT_ZOOM: u8 = 8;
/// Padding applied when framing a result overlay (px)
pub const OVERLAY_PADDING_PX: u32 = 20;

// =============================================================================
// GEOGRAPHY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south: south_west.lat,
            west: south_west.lon,
            north: north_east.lat,
            east: north_east.lon,
        }
    }

    /// Inverted box; becomes valid after the first `extend`
    pub fn empty() -> Self {
        Self {
            south: f64::INFINITY,
            west: f64::INFINITY,
            north: f64::NEG_INFINITY,
            east: f64::NEG_INFINITY,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        if !p.is_finite() {
            return;
        }
        self.south = self.south.min(p.lat);
        self.west = self.west.min(p.lon);
        self.north = self.north.max(p.lat);
        self.east = self.east.max(p.lon);
    }

    pub fn is_valid(&self) -> bool {
        self.south.is_finite()
            && self.west.is_finite()
            && self.north.is_finite()
            && self.east.is_finite()
            && self.south <= self.north
            && self.west <= self.east
    }

    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.south && p.lat <= self.north && p.lon >= self.west && p.lon <= self.east
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Box enclosing a circle of `radius_m` around `center`
    pub fn around(center: LatLng, radius_m: f64) -> Self {
        let dlat = radius_m / METERS_PER_DEGREE;
        let m_per_deg_lon = (METERS_PER_DEGREE * center.lat.to_radians().cos()).max(1e-9);
        let dlon = radius_m / m_per_deg_lon;
        Self {
            south: center.lat - dlat,
            west: center.lon - dlon,
            north: center.lat + dlat,
            east: center.lon + dlon,
        }
    }

    /// Nearest point inside the box
    pub fn clamp(&self, p: LatLng) -> LatLng {
        LatLng::new(
            p.lat.clamp(self.south, self.north),
            p.lon.clamp(self.west, self.east),
        )
    }
}

// =============================================================================
// BACKEND INTERFACE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStyle {
    pub color: &'static str,
    pub weight: f64,
    pub fill_opacity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    InvalidBounds,
    UnknownLayer(LayerId),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::InvalidBounds => write!(f, "bounds are empty or not finite"),
            MapError::UnknownLayer(id) => write!(f, "no layer with id {}", id.0),
        }
    }
}

impl std::error::Error for MapError {}

/// What the renderer needs from a map widget
pub trait MapBackend {
    fn set_view(&mut self, center: LatLng, zoom: u8);
    fn set_max_bounds(&mut self, bounds: GeoBounds, min_zoom: u8);
    fn fly_to(&mut self, center: LatLng, zoom: u8);
    fn fit_bounds(&mut self, bounds: &GeoBounds, padding_px: u32) -> Result<(), MapError>;

    fn add_marker(&mut self, at: LatLng, popup: &str) -> LayerId;
    fn add_overlay(&mut self, overlay: &Overlay) -> LayerId;
    fn add_group(&mut self) -> LayerId;
    fn add_circle(
        &mut self,
        group: LayerId,
        center: LatLng,
        radius_m: f64,
        style: PathStyle,
    ) -> LayerId;
    fn set_circle_radius(&mut self, circle: LayerId, radius_m: f64) -> Result<(), MapError>;
    /// Detach a layer; groups take their children with them
    fn remove_layer(&mut self, layer: LayerId);
}

// =============================================================================
// HEADLESS BACKEND
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessLayer {
    Marker { at: LatLng, popup: String },
    Overlay(Overlay),
    Group,
    Circle {
        group: LayerId,
        center: LatLng,
        radius_m: f64,
        style: PathStyle,
    },
}

/// In-memory map: tracks attached layers and the current view
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    layers: BTreeMap<LayerId, HeadlessLayer>,
    next_id: u64,
    center: LatLng,
    zoom: u8,
    max_bounds: Option<GeoBounds>,
    min_zoom: u8,
    viewport_px: (u32, u32),
}

impl HeadlessMap {
    pub fn new() -> Self {
        Self::with_viewport(800, 600)
    }

    pub fn with_viewport(width_px: u32, height_px: u32) -> Self {
        Self {
            layers: BTreeMap::new(),
            next_id: 1,
            center: INITIAL_CENTER,
            zoom: INITIAL_ZOOM,
            max_bounds: None,
            min_zoom: 0,
            viewport_px: (width_px.max(1), height_px.max(1)),
        }
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn layer(&self, id: LayerId) -> Option<&HeadlessLayer> {
        self.layers.get(&id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn marker_count(&self) -> usize {
        self.count(|l| matches!(l, HeadlessLayer::Marker { .. }))
    }

    pub fn overlay_count(&self) -> usize {
        self.count(|l| matches!(l, HeadlessLayer::Overlay(_)))
    }

    pub fn group_count(&self) -> usize {
        self.count(|l| matches!(l, HeadlessLayer::Group))
    }

    pub fn circle_radius(&self, id: LayerId) -> Option<f64> {
        match self.layers.get(&id) {
            Some(HeadlessLayer::Circle { radius_m, .. }) => Some(*radius_m),
            _ => None,
        }
    }

    fn count(&self, pred: impl Fn(&HeadlessLayer) -> bool) -> usize {
        self.layers.values().filter(|l| pred(l)).count()
    }

    fn insert(&mut self, layer: HeadlessLayer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.insert(id, layer);
        id
    }

    fn clamp_view(&mut self) {
        self.zoom = self.zoom.clamp(self.min_zoom, MAX_ZOOM);
        if let Some(bounds) = self.max_bounds {
            self.center = bounds.clamp(self.center);
        }
    }

    /// Largest web-mercator zoom at which `bounds` fits the padded viewport
    fn zoom_for(&self, bounds: &GeoBounds, padding_px: u32) -> u8 {
        let (w, h) = self.viewport_px;
        let usable_w = w.saturating_sub(2 * padding_px).max(1) as f64;
        let usable_h = h.saturating_sub(2 * padding_px).max(1) as f64;
        let lon_span = (bounds.east - bounds.west).max(1e-9);
        let lat_span = (bounds.north - bounds.south).max(1e-9);
        let by_width = (usable_w * 360.0 / (256.0 * lon_span)).log2();
        let by_height = (usable_h * 170.0 / (256.0 * lat_span)).log2();
        by_width.min(by_height).floor().clamp(0.0, MAX_ZOOM as f64) as u8
    }
}

impl Default for HeadlessMap {
    fn default() -> Self {
        Self::new()
    }
}

impl MapBackend for HeadlessMap {
    fn set_view(&mut self, center: LatLng, zoom: u8) {
        self.center = center;
        self.zoom = zoom;
        self.clamp_view();
    }

    fn set_max_bounds(&mut self, bounds: GeoBounds, min_zoom: u8) {
        self.max_bounds = Some(bounds);
        self.min_zoom = min_zoom;
        self.clamp_view();
    }

    fn fly_to(&mut self, center: LatLng, zoom: u8) {
        self.set_view(center, zoom);
    }

    fn fit_bounds(&mut self, bounds: &GeoBounds, padding_px: u32) -> Result<(), MapError> {
        if !bounds.is_valid() {
            return Err(MapError::InvalidBounds);
        }
        self.center = bounds.center();
        self.zoom = self.zoom_for(bounds, padding_px);
        self.clamp_view();
        Ok(())
    }

    fn add_marker(&mut self, at: LatLng, popup: &str) -> LayerId {
        self.insert(HeadlessLayer::Marker {
            at,
            popup: popup.to_string(),
        })
    }

    fn add_overlay(&mut self, overlay: &Overlay) -> LayerId {
        self.insert(HeadlessLayer::Overlay(overlay.clone()))
    }

    fn add_group(&mut self) -> LayerId {
        self.insert(HeadlessLayer::Group)
    }

    fn add_circle(
        &mut self,
        group: LayerId,
        center: LatLng,
        radius_m: f64,
        style: PathStyle,
    ) -> LayerId {
        self.insert(HeadlessLayer::Circle {
            group,
            center,
            radius_m,
            style,
        })
    }

    fn set_circle_radius(&mut self, circle: LayerId, radius: f64) -> Result<(), MapError> {
        match self.layers.get_mut(&circle) {
            Some(HeadlessLayer::Circle { radius_m, .. }) => {
                *radius_m = radius;
                Ok(())
            }
            _ => Err(MapError::UnknownLayer(circle)),
        }
    }

    fn remove_layer(&mut self, layer: LayerId) {
        if let Some(HeadlessLayer::Group) = self.layers.remove(&layer) {
            self.layers.retain(|_, l| {
                !matches!(l, HeadlessLayer::Circle { group, .. } if *group == layer)
            });
        }
    }
}

// =============================================================================
// SURFACE STATE
// =============================================================================

/// Popup text for a marker: the resolved place name, else the raw coordinates
pub fn marker_popup_text(at: LatLng, label: &str) -> String {
    if label.is_empty() {
        format!("Lat: {:.4}, Lon: {:.4}", at.lat, at.lon)
    } else {
        label.to_string()
    }
}

/// Owns the single live marker and the single live result overlay.
/// Every setter detaches the previous instance before attaching the new one.
pub struct MapSurface<M: MapBackend> {
    backend: M,
    allowed: GeoBounds,
    marker: Option<LayerId>,
    overlay: Option<LayerId>,
}

impl<M: MapBackend> MapSurface<M> {
    pub fn new(mut backend: M) -> Self {
        backend.set_view(INITIAL_CENTER, INITIAL_ZOOM);
        backend.set_max_bounds(CONUS_BOUNDS, MIN_ZOOM);
        Self {
            backend,
            allowed: CONUS_BOUNDS,
            marker: None,
            overlay: None,
        }
    }

    pub fn backend(&self) -> &M {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut M {
        &mut self.backend
    }

    pub fn allowed_bounds(&self) -> GeoBounds {
        self.allowed
    }

    pub fn marker(&self) -> Option<LayerId> {
        self.marker
    }

    pub fn overlay(&self) -> Option<LayerId> {
        self.overlay
    }

    /// Accept a map click, or reject it when it falls outside the allowed region
    pub fn check_pick(&self, lat: f64, lon: f64) -> Result<LatLng, ClientError> {
        let at = LatLng::new(lat, lon);
        if !at.is_finite() || !self.allowed.contains(at) {
            return Err(ClientError::OutOfBounds { lat, lon });
        }
        Ok(at)
    }

    pub fn set_marker(&mut self, lat: f64, lon: f64, label: &str) -> LayerId {
        if let Some(old) = self.marker.take() {
            self.backend.remove_layer(old);
        }
        let at = LatLng::new(lat, lon);
        let id = self.backend.add_marker(at, &marker_popup_text(at, label));
        self.marker = Some(id);
        id
    }

    /// Replace the result overlay and frame the view to it.
    /// A framing failure leaves the overlay attached but unframed.
    pub fn set_overlay(&mut self, overlay: &Overlay) -> LayerId {
        self.clear_overlay();
        let id = self.backend.add_overlay(overlay);
        self.overlay = Some(id);
        if let Err(e) = self.backend.fit_bounds(&overlay.bounds, OVERLAY_PADDING_PX) {
            debug!("overlay not framed: {}", e);
        }
        id
    }

    pub fn clear_overlay(&mut self) {
        if let Some(old) = self.overlay.take() {
            self.backend.remove_layer(old);
        }
    }

    pub fn frame_point(&mut self, at: LatLng) {
        self.backend.fly_to(at, POINT_ZOOM);
    }

    pub fn frame_bounds(&mut self, bounds: &GeoBounds, padding_px: u32) -> Result<(), MapError> {
        self.backend.fit_bounds(bounds, padding_px)
    }
}

// =============================================================================
// TESTS
// =============================================================================
