// State Manager - page-lifetime state and the user actions that mutate it
// Network awaits happen outside the lock; results are applied under it

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::export::Download;
use crate::geocoding::{Geocoder, Place};
use crate::input_model::{build_payload, parse_coordinates, FormFields, ImpactRequest, InputMode};
use crate::map_surface::{LatLng, LayerId, MapBackend, MapSurface};
use crate::renderer::animation::{AnimationStep, ReplayPlan, ShockwaveAnimation};
use crate::renderer::canvas::{CanvasSize, RecordingCanvas};
use crate::renderer::diagram::draw_diagram;
use crate::renderer::overlay::Overlay;
use crate::renderer::summary::{summarize, ResultSummary};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::simulation_client::{ImpactSimulator, SimulationResult};

// =============================================================================
// WORKSPACE
// =============================================================================

/// The last successful run and everything rendered from it
#[derive(Debug, Clone)]
pub struct RenderedResult {
    pub request: ImpactRequest,
    pub result: SimulationResult,
    pub summary: ResultSummary,
    pub overlay: Overlay,
    pub received_at: DateTime<Utc>,
}

/// Owner of the single marker, overlay, replay and diagram.
/// Each setter releases the previous resource before installing the next.
pub struct Workspace<M: MapBackend, S: Scheduler> {
    pub mode: InputMode,
    pub form: FormFields,
    surface: MapSurface<M>,
    scheduler: S,
    diagram: RecordingCanvas,
    animation: Option<ShockwaveAnimation>,
    rendered: Option<RenderedResult>,
}

impl<M: MapBackend, S: Scheduler> Workspace<M, S> {
    pub fn new(backend: M, scheduler: S) -> Self {
        Self::with_canvas(backend, scheduler, CanvasSize::default())
    }

    pub fn with_canvas(backend: M, scheduler: S, canvas: CanvasSize) -> Self {
        Self {
            mode: InputMode::default(),
            form: FormFields::default(),
            surface: MapSurface::new(backend),
            scheduler,
            diagram: RecordingCanvas::new(canvas),
            animation: None,
            rendered: None,
        }
    }

    pub fn surface(&self) -> &MapSurface<M> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut MapSurface<M> {
        &mut self.surface
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn diagram(&self) -> &RecordingCanvas {
        &self.diagram
    }

    pub fn animation(&self) -> Option<&ShockwaveAnimation> {
        self.animation.as_ref()
    }

    pub fn rendered(&self) -> Option<&RenderedResult> {
        self.rendered.as_ref()
    }

    /// Resize the diagram surface; takes effect on the next redraw
    pub fn resize_canvas(&mut self, size: CanvasSize) {
        self.diagram = RecordingCanvas::new(size);
        if let Some(view) = &self.rendered {
            draw_diagram(&mut self.diagram, &view.result);
        }
    }

    pub fn set_marker(&mut self, lat: f64, lon: f64, label: &str) -> LayerId {
        self.surface.set_marker(lat, lon, label)
    }

    pub fn set_overlay(&mut self, overlay: &Overlay) -> LayerId {
        let id = self.surface.set_overlay(overlay);
        debug!(layer = id.0, features = overlay.features.len(), "result overlay replaced");
        id
    }

    /// Tear down any running replay, then start `plan` if there is one
    pub fn set_animation(&mut self, plan: Option<ReplayPlan>) {
        self.stop_animation();
        self.animation =
            plan.map(|p| ShockwaveAnimation::start(p, &mut self.surface, &mut self.scheduler));
    }

    pub fn stop_animation(&mut self) {
        if let Some(mut running) = self.animation.take() {
            running.stop(&mut self.surface, &mut self.scheduler);
        }
    }

    /// Deliver a timer tick. Ticks from timers that are no longer current are dropped.
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<AnimationStep> {
        let animation = self.animation.as_mut()?;
        if animation.timer() != Some(handle) {
            debug!(timer = handle.0, "stale timer tick ignored");
            return None;
        }
        let step = animation.tick(&mut self.surface, &mut self.scheduler);
        if step == AnimationStep::Finished {
            self.animation = None;
        }
        Some(step)
    }

    pub fn replay_status(&self) -> Option<&str> {
        self.animation.as_ref().map(|a| a.status_line())
    }

    /// Replace every visual output with those of a new result
    pub fn apply_result(
        &mut self,
        request: ImpactRequest,
        result: SimulationResult,
        received_at: DateTime<Utc>,
    ) {
        self.stop_animation();

        let summary = summarize(&result, &request, received_at);
        draw_diagram(&mut self.diagram, &result);
        let overlay = Overlay::from_geojson(result.geojson.as_ref());
        self.set_overlay(&overlay);
        self.set_animation(ReplayPlan::new(request.location(), &result));

        info!(
            energy = %summary.kpis.energy_mt,
            crater_m = %summary.kpis.crater_radius_m,
            "simulation rendered"
        );
        self.rendered = Some(RenderedResult {
            request,
            result,
            summary,
            overlay,
            received_at,
        });
    }

    /// Typed lat/lon: move the marker and fly there when both parse
    pub fn coordinates_edited(&mut self) -> Option<LatLng> {
        let at = parse_coordinates(&self.form.lat, &self.form.lon)?;
        self.surface.set_marker(at.lat, at.lon, "");
        self.surface.frame_point(at);
        Some(at)
    }

    pub fn download(&self) -> Result<Download, ClientError> {
        self.rendered
            .as_ref()
            .map(|view| Download::geojson(&view.result))
            .ok_or(ClientError::NoResult)
    }
}

// =============================================================================
// APP
// =============================================================================

/// Wires the workspace to the simulation service and the geocoder.
/// Overlapping `simulate` calls are not sequenced: the last response to arrive wins.
pub struct ImpactApp<M: MapBackend, S: Scheduler, Sim, G> {
    workspace: Arc<Mutex<Workspace<M, S>>>,
    simulator: Sim,
    geocoder: G,
}

impl<M, S, Sim, G> ImpactApp<M, S, Sim, G>
where
    M: MapBackend,
    S: Scheduler,
    Sim: ImpactSimulator,
    G: Geocoder,
{
    pub fn new(workspace: Workspace<M, S>, simulator: Sim, geocoder: G) -> Self {
        Self {
            workspace: Arc::new(Mutex::new(workspace)),
            simulator,
            geocoder,
        }
    }

    pub fn workspace(&self) -> Arc<Mutex<Workspace<M, S>>> {
        self.workspace.clone()
    }

    pub fn with_workspace<R>(&self, f: impl FnOnce(&mut Workspace<M, S>) -> R) -> R {
        f(&mut self.workspace.lock())
    }

    pub fn set_mode(&self, mode: InputMode) {
        self.workspace.lock().mode = mode;
    }

    /// Map click: reject points outside the region, otherwise label and mark it
    pub async fn pick_location(&self, lat: f64, lon: f64) -> Result<String, ClientError> {
        {
            let mut ws = self.workspace.lock();
            ws.surface.check_pick(lat, lon)?;
            ws.form.set_location(lat, lon);
        }

        let label = self.geocoder.reverse(lat, lon).await;
        self.workspace.lock().set_marker(lat, lon, &label);
        Ok(label)
    }

    /// Place search: fill the coordinates, mark the place and fly to it.
    /// A blank query does nothing.
    pub async fn search_place(&self, query: &str) -> Result<Option<Place>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(None);
        }
        let place = self.geocoder.forward(query).await?;

        let mut ws = self.workspace.lock();
        ws.form.set_location(place.lat, place.lon);
        ws.set_marker(place.lat, place.lon, &place.label);
        ws.surface.frame_point(LatLng::new(place.lat, place.lon));
        Ok(Some(place))
    }

    /// Validate, send and render. Validation failures never reach the network;
    /// a failed request leaves every visual output as it was.
    pub async fn simulate(&self) -> Result<(), ClientError> {
        let request = {
            let ws = self.workspace.lock();
            build_payload(ws.mode, &ws.form)?
        };

        let result = self.simulator.simulate(&request).await?;
        self.workspace
            .lock()
            .apply_result(request, result, Utc::now());
        Ok(())
    }

    pub fn on_timer(&self, handle: TimerHandle) -> Option<AnimationStep> {
        self.workspace.lock().on_timer(handle)
    }

    pub fn is_replaying(&self) -> bool {
        self.workspace.lock().animation.is_some()
    }

    pub fn download(&self) -> Result<Download, ClientError> {
        self.workspace.lock().download()
    }
}

// =============================================================================
// TESTS
// =============================================================================
