// ImpactMap - asteroid impact simulation client for the continental US
// Headless core: input model, providers, map surface, renderers and state

pub mod config;
pub mod error;
pub mod export;
pub mod geocoding;
pub mod input_model;
pub mod map_surface;
pub mod renderer;
pub mod scheduler;
pub mod simulation_client;
pub mod state_manager;

pub use config::AppConfig;
pub use error::{ClientError, ValidationError, ValidationKind};
pub use export::Download;
pub use geocoding::{Geocoder, NominatimClient, Place};
pub use input_model::{build_payload, FormFields, ImpactRequest, InputMode};
pub use map_surface::{GeoBounds, HeadlessMap, LatLng, MapBackend, MapSurface};
pub use renderer::Overpressure;
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TokioScheduler};
pub use simulation_client::{ImpactSimulator, SimulationClient, SimulationResult};
pub use state_manager::{ImpactApp, RenderedResult, Workspace};
