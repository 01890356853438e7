//! Spatial Primitives
//!
//! Geodesic distance, line-of-contact geometry, direction axes, and
//! series clustering. All inputs are WGS84; metric-space work is an
//! internal detail of the frontline queries.

mod axis;
mod clustering;
mod distance;
mod frontline;
pub mod geojson;

pub use axis::{AxisProjection, DirectionAxis};
pub use clustering::flag_cluster_outliers;
pub use distance::{haversine_km, haversine_m};
pub use frontline::Frontline;

/// Web-mercator transforms shared by the geometry queries.
pub(crate) mod metric {
    pub(crate) use super::frontline::{to_metric, to_wgs84};
}

/// Spatial error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SpatialError {
    /// Malformed geographic-JSON source
    #[error("geometry JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
