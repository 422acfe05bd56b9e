use thiserror::Error;

use crate::geocode::GeocodeError;
use crate::mapbox::RouteServiceError;

#[derive(Debug, Error)]
pub enum CourseError {
    #[error("course distance must be a positive number of kilometers, got {0}")]
    InvalidDistance(f64),
    #[error("could not locate \"{location}\": {source}")]
    Geocode {
        location: String,
        #[source]
        source: GeocodeError,
    },
    #[error("routing service error: {0}")]
    Route(#[from] RouteServiceError),
    #[error("failed to build GPX document: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

impl CourseError {
    /// True when the location itself could not be resolved, as opposed to the service failing.
    pub fn is_unresolvable_location(&self) -> bool {
        matches!(
            self,
            CourseError::Geocode {
                source: GeocodeError::NotFound(_),
                ..
            }
        )
    }
}
