use anyhow::{bail, Context, Result};
use survey_core::models::GeoCoordinate;

/// Both flags or neither. Out-of-range values are rejected before any work starts.
pub fn parse_coordinate(lat: Option<f64>, lon: Option<f64>) -> Result<Option<GeoCoordinate>> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => {
            let geo = GeoCoordinate::new(lat, lon).context("invalid coordinate")?;
            Ok(Some(geo))
        }
        _ => bail!("--lat and --lon must be given together"),
    }
}
