//! MRT/LRT station reference points from the sg-rail GeoJSON

use crate::config::StationsConfig;
use crate::error::HcError;
use crate::models::ReferencePoint;
use serde::Deserialize;
use serde_json::Value;
use sgdata_common::Coordinates;
use std::time::Duration;
use tracing::{debug, info};

/// `stop_type` of features that are stations (as opposed to exits, depots...)
const STATION_STOP_TYPE: &str = "station";

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: serde_json::Map<String, Value>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

/// Extract station points from a GeoJSON document
///
/// Only `Point` features with `stop_type == "station"` are kept. GeoJSON
/// positions are `[lon, lat]`.
pub fn parse_stations(body: &str) -> Result<Vec<ReferencePoint>, HcError> {
    let collection: FeatureCollection =
        serde_json::from_str(body).map_err(|e| HcError::Parse(e.to_string()))?;

    let stations: Vec<ReferencePoint> = collection
        .features
        .iter()
        .filter_map(station_point)
        .collect();

    debug!(
        features = collection.features.len(),
        stations = stations.len(),
        "Parsed station GeoJSON"
    );
    Ok(stations)
}

fn station_point(feature: &Feature) -> Option<ReferencePoint> {
    let geometry = feature.geometry.as_ref()?;
    if geometry.kind != "Point" {
        return None;
    }
    if feature.properties.get("stop_type").and_then(Value::as_str) != Some(STATION_STOP_TYPE) {
        return None;
    }

    let name = feature.properties.get("name").and_then(Value::as_str)?.trim();
    if name.is_empty() {
        return None;
    }

    let position = geometry.coordinates.as_array()?;
    let lon = position.first()?.as_f64()?;
    let lat = position.get(1)?.as_f64()?;

    Some(ReferencePoint {
        name: name.to_string(),
        location: Coordinates::new(lat, lon)?,
    })
}

/// HTTP client for the station dataset
pub struct StationsClient {
    http: reqwest::Client,
    url: String,
}

impl StationsClient {
    pub fn new(config: &StationsConfig) -> Result<Self, HcError> {
        Ok(Self {
            http: super::http_client(Duration::from_secs(config.timeout_secs))?,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Download and parse the station list
    pub async fn fetch_stations(&self) -> Result<Vec<ReferencePoint>, HcError> {
        info!(url = %self.url, "Fetching MRT stations");

        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HcError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body = response.text().await?;
        let stations = parse_stations(&body)?;
        info!(count = stations.len(), "Found MRT stations");
        Ok(stations)
    }
}
