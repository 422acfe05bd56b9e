use std::time::Duration;

use serde::Deserialize;

use crate::geocode::DEFAULT_GEOCODE_URL;
use crate::geometry::{CourseShape, LocalProjection};
use crate::mapbox::DEFAULT_MAPBOX_URL;
use crate::overpass::DEFAULT_OVERPASS_URL;

/// Process configuration, read from the environment (and `.env` when present).
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub mapbox_api_key: String,
    pub gmaps_api_key: String,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_overpass_url")]
    pub overpass_url: String,
    #[serde(default = "default_mapbox_base_url")]
    pub mapbox_base_url: String,
    #[serde(default = "default_geocode_url")]
    pub geocode_url: String,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_snap_budget_secs")]
    pub snap_budget_secs: u64,
    #[serde(default = "default_waypoint_count")]
    pub waypoint_count: usize,
    #[serde(default = "default_shrink_factor")]
    pub shrink_factor: f64,
    /// Scale longitude by the start latitude instead of the Stockholm calibration.
    #[serde(default)]
    pub adaptive_projection: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_overpass_url() -> String {
    DEFAULT_OVERPASS_URL.to_string()
}

fn default_mapbox_base_url() -> String {
    DEFAULT_MAPBOX_URL.to_string()
}

fn default_geocode_url() -> String {
    DEFAULT_GEOCODE_URL.to_string()
}

fn default_http_timeout_secs() -> u64 {
    15
}

fn default_snap_budget_secs() -> u64 {
    60
}

fn default_waypoint_count() -> usize {
    6
}

fn default_shrink_factor() -> f64 {
    0.7
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("WAYPOINT_COUNT must be an even number of at least 2, got {0}")]
    WaypointCount(usize),
    #[error("SHRINK_FACTOR must lie in (0, 1], got {0}")]
    ShrinkFactor(f64),
}

/// Tuning knobs for the planner that do not involve any service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlannerSettings {
    pub shape: CourseShape,
    pub adaptive_projection: bool,
    /// Zero disables the snapping budget.
    pub snap_budget: Duration,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            shape: CourseShape::default(),
            adaptive_projection: false,
            snap_budget: Duration::from_secs(default_snap_budget_secs()),
        }
    }
}

impl PlannerSettings {
    pub fn projection_for(&self, start_lat: f64) -> LocalProjection {
        if self.adaptive_projection {
            LocalProjection::at_latitude(start_lat)
        } else {
            LocalProjection::calibrated()
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.waypoint_count < 2 || self.waypoint_count % 2 != 0 {
            return Err(ConfigError::WaypointCount(self.waypoint_count));
        }
        if !(self.shrink_factor > 0.0 && self.shrink_factor <= 1.0) {
            return Err(ConfigError::ShrinkFactor(self.shrink_factor));
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            shape: CourseShape {
                shrink_factor: self.shrink_factor,
                waypoint_count: self.waypoint_count,
            },
            adaptive_projection: self.adaptive_projection,
            snap_budget: Duration::from_secs(self.snap_budget_secs),
        }
    }
}
