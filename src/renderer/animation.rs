// Shockwave Replay - plays the result's time series as two growing circles
// Idle -> Playing -> Idle; a replay is only ever stopped, never paused

use std::time::Duration;
use tracing::{debug, info};

use super::summary::format_km;
use super::{Overpressure, CRATER_COLOR, SHOCKWAVE_COLOR, UNKNOWN};
use crate::map_surface::{GeoBounds, LatLng, LayerId, MapBackend, MapSurface, PathStyle};
use crate::scheduler::{Scheduler, TimerHandle};
use crate::simulation_client::{finite, SimulationResult, TimeFrame};

/// Wall-clock length of a full replay
pub const PLAYBACK_BUDGET: Duration = Duration::from_secs(8);
/// Shortest allowed tick interval
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(16);
/// Padding when framing the replay area (px)
pub const REPLAY_PADDING_PX: u32 = 20;

const SHOCKWAVE_STYLE: PathStyle = PathStyle {
    color: SHOCKWAVE_COLOR,
    weight: 2.0,
    fill_opacity: 0.08,
};

const CRATER_STYLE: PathStyle = PathStyle {
    color: CRATER_COLOR,
    weight: 2.0,
    fill_opacity: 0.4,
};

// =============================================================================
// PLAN
// =============================================================================

/// Largest overpressure ring; `None` unless strictly positive
pub fn outer_radius_m(result: &SimulationResult) -> Option<f64> {
    let outer = Overpressure::ALL
        .into_iter()
        .filter_map(|level| result.ring_m(level))
        .fold(0.0, f64::max);
    (outer > 0.0).then_some(outer)
}

/// Factor that lands the last frame's shockwave exactly on `outer_m`
pub fn normalizing_scale(outer_m: f64, frames: &[TimeFrame]) -> f64 {
    let last_m = frames
        .last()
        .and_then(|f| finite(f.shockwave_radius_km))
        .map(|km| km * 1000.0)
        .unwrap_or(0.0);
    if last_m > 0.0 {
        outer_m / last_m
    } else {
        1.0
    }
}

pub fn frame_interval(frame_count: usize) -> Duration {
    let n = frame_count.max(1) as u32;
    (PLAYBACK_BUDGET / n).max(MIN_FRAME_INTERVAL)
}

/// Shockwave and crater radii for one frame, each `None` unless strictly positive
pub fn frame_radii(frame: &TimeFrame, scale: f64, outer_m: f64) -> (Option<f64>, Option<f64>) {
    let positive = |v: f64| (v.is_finite() && v > 0.0).then_some(v);
    let shockwave = finite(frame.shockwave_radius_km)
        .map(|km| (km * 1000.0 * scale).min(outer_m))
        .and_then(positive);
    let crater = finite(frame.crater_diameter_km)
        .map(|km| (km * 1000.0 / 2.0).min(outer_m))
        .and_then(positive);
    (shockwave, crater)
}

/// Everything a replay needs, computed once from a result
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayPlan {
    pub center: LatLng,
    pub outer_m: f64,
    pub scale: f64,
    pub interval: Duration,
    pub frames: Vec<TimeFrame>,
}

impl ReplayPlan {
    /// `None` when there is no time series or nothing to bound the replay against
    pub fn new(center: LatLng, result: &SimulationResult) -> Option<Self> {
        let frames = result.frames();
        if frames.is_empty() {
            return None;
        }
        let outer_m = outer_radius_m(result)?;
        Some(Self {
            center,
            outer_m,
            scale: normalizing_scale(outer_m, frames),
            interval: frame_interval(frames.len()),
            frames: frames.to_vec(),
        })
    }
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Live resources of a replay; all empty once stopped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnimationState {
    pub timer: Option<TimerHandle>,
    pub overlay_group: Option<LayerId>,
    pub shockwave_shape: Option<LayerId>,
    pub crater_shape: Option<LayerId>,
    pub frame_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStep {
    Advanced,
    Finished,
}

#[derive(Debug)]
pub struct ShockwaveAnimation {
    plan: ReplayPlan,
    state: AnimationState,
    shockwave_m: f64,
    crater_m: f64,
    status: String,
}

impl ShockwaveAnimation {
    /// Frame the replay area, attach the circles and start ticking
    pub fn start<M: MapBackend, S: Scheduler + ?Sized>(
        plan: ReplayPlan,
        surface: &mut MapSurface<M>,
        scheduler: &mut S,
    ) -> Self {
        let area = GeoBounds::around(plan.center, plan.outer_m);
        if let Err(e) = surface.frame_bounds(&area, REPLAY_PADDING_PX) {
            debug!("replay area not framed: {}", e);
        }

        let map = surface.backend_mut();
        let group = map.add_group();
        let shockwave = map.add_circle(group, plan.center, 0.0, SHOCKWAVE_STYLE);
        let crater = map.add_circle(group, plan.center, 0.0, CRATER_STYLE);
        let timer = scheduler.start_interval(plan.interval);

        info!(
            frames = plan.frames.len(),
            outer_m = plan.outer_m,
            scale = plan.scale,
            "shockwave replay started"
        );

        Self {
            state: AnimationState {
                timer: Some(timer),
                overlay_group: Some(group),
                shockwave_shape: Some(shockwave),
                crater_shape: Some(crater),
                frame_index: 0,
            },
            plan,
            shockwave_m: 0.0,
            crater_m: 0.0,
            status: String::new(),
        }
    }

    pub fn plan(&self) -> &ReplayPlan {
        &self.plan
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.timer.is_some()
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.state.timer
    }

    pub fn frame_index(&self) -> usize {
        self.state.frame_index
    }

    pub fn shockwave_radius_m(&self) -> f64 {
        self.shockwave_m
    }

    pub fn crater_radius_m(&self) -> f64 {
        self.crater_m
    }

    pub fn status_line(&self) -> &str {
        &self.status
    }

    /// Show the next frame, or stop once every frame has been shown
    pub fn tick<M: MapBackend, S: Scheduler + ?Sized>(
        &mut self,
        surface: &mut MapSurface<M>,
        scheduler: &mut S,
    ) -> AnimationStep {
        if !self.is_playing() {
            return AnimationStep::Finished;
        }
        let Some(frame) = self.plan.frames.get(self.state.frame_index) else {
            self.stop(surface, scheduler);
            return AnimationStep::Finished;
        };

        let (shockwave, crater) = frame_radii(frame, self.plan.scale, self.plan.outer_m);
        let map = surface.backend_mut();
        if let (Some(r), Some(shape)) = (shockwave, self.state.shockwave_shape) {
            self.shockwave_m = r;
            if let Err(e) = map.set_circle_radius(shape, r) {
                debug!("shockwave circle update skipped: {}", e);
            }
        }
        if let (Some(r), Some(shape)) = (crater, self.state.crater_shape) {
            self.crater_m = r;
            if let Err(e) = map.set_circle_radius(shape, r) {
                debug!("crater circle update skipped: {}", e);
            }
        }

        self.status = status_line(frame.time_sec, self.shockwave_m, self.crater_m);
        self.state.frame_index += 1;
        AnimationStep::Advanced
    }

    /// Cancel the timer and detach the circles. Safe to call more than once.
    pub fn stop<M: MapBackend, S: Scheduler + ?Sized>(
        &mut self,
        surface: &mut MapSurface<M>,
        scheduler: &mut S,
    ) {
        let state = std::mem::take(&mut self.state);
        if let Some(timer) = state.timer {
            scheduler.cancel(timer);
        }
        if let Some(group) = state.overlay_group {
            surface.backend_mut().remove_layer(group);
        }
        if state.timer.is_some() {
            info!(frames_shown = state.frame_index, "shockwave replay stopped");
        }
    }
}

pub fn status_line(time_sec: Option<f64>, shockwave_m: f64, crater_m: f64) -> String {
    let elapsed = finite(time_sec).map_or_else(|| UNKNOWN.to_string(), |t| format!("{:.1}", t));
    format!(
        "t = {} s | shockwave {} km | crater {} km",
        elapsed,
        format_km(Some(shockwave_m)),
        format_km(Some(crater_m))
    )
}

// =============================================================================
// TESTS
// =============================================================================
