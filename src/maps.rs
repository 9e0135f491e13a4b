//! HTTP adapter for the hosted maps collaborator.
//!
//! Implements geocoding, pairwise distance, and directions against a
//! Google-style REST API. Logical errors arrive as a `status` field in a
//! 200 response and are never retried; HTTP/transport failures surface as
//! [`PlannerError::Transport`] so the oracle's retry policy applies.

use serde::Deserialize;

use crate::error::{CollaboratorKind, PlannerError};
use crate::geo::Coordinate;
use crate::polyline;
use crate::traits::{
    DirectionsLeg, DirectionsProvider, DistanceProvider, GeocodedAddress, Geocoder,
    TravelEstimate,
};

#[derive(Debug, Clone)]
pub struct MapsConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    /// Optional response language, e.g. `pt-BR`.
    pub language: Option<String>,
}

impl MapsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://maps.googleapis.com/maps/api".to_string(),
            api_key: api_key.into(),
            timeout_secs: 10,
            language: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MapsClient {
    config: MapsConfig,
    client: reqwest::blocking::Client,
}

impl MapsClient {
    pub fn new(config: MapsConfig) -> Result<Self, PlannerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| PlannerError::transport(&err))?;

        Ok(Self { config, client })
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlannerError> {
        let url = format!("{}/{}/json", self.config.base_url, path);
        let mut request = self.client.get(url).query(query);
        request = request.query(&[("key", self.config.api_key.as_str())]);
        if let Some(language) = &self.config.language {
            request = request.query(&[("language", language.as_str())]);
        }

        request
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<T>())
            .map_err(|err| PlannerError::transport(&err))
    }
}

fn status_error(status: &str, message: Option<String>) -> PlannerError {
    PlannerError::Collaborator {
        kind: CollaboratorKind::from_status(status),
        message: message.unwrap_or_else(|| status.to_string()),
    }
}

impl Geocoder for MapsClient {
    fn geocode(&self, address: &str) -> Result<GeocodedAddress, PlannerError> {
        let response: GeocodeResponse =
            self.get_json("geocode", &[("address", address.to_string())])?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(PlannerError::AddressNotFound(address.to_string())),
            status => return Err(status_error(status, response.error_message)),
        }

        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| PlannerError::AddressNotFound(address.to_string()))?;

        Ok(GeocodedAddress {
            coordinates: Coordinate::new(
                result.geometry.location.lat,
                result.geometry.location.lng,
            ),
            formatted_address: result.formatted_address,
        })
    }
}

impl DistanceProvider for MapsClient {
    fn distance(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<TravelEstimate, PlannerError> {
        let response: MatrixResponse = self.get_json(
            "distancematrix",
            &[
                ("origins", origin.wire_format()),
                ("destinations", destination.wire_format()),
            ],
        )?;

        if response.status != "OK" {
            return Err(status_error(&response.status, response.error_message));
        }

        let element = response
            .rows
            .into_iter()
            .next()
            .and_then(|row| row.elements.into_iter().next())
            .ok_or_else(|| status_error("ZERO_RESULTS", None))?;

        if element.status != "OK" {
            return Err(status_error(&element.status, None));
        }

        let (distance, duration) = element
            .distance
            .zip(element.duration)
            .ok_or_else(|| status_error("ZERO_RESULTS", None))?;

        Ok(TravelEstimate {
            distance_meters: distance.value,
            duration_seconds: duration.value,
        })
    }
}

impl DirectionsProvider for MapsClient {
    fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<DirectionsLeg, PlannerError> {
        let response: DirectionsResponse = self.get_json(
            "directions",
            &[
                ("origin", origin.wire_format()),
                ("destination", destination.wire_format()),
            ],
        )?;

        if response.status != "OK" {
            return Err(status_error(&response.status, response.error_message));
        }

        let route = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| status_error("ZERO_RESULTS", None))?;
        if route.legs.is_empty() {
            return Err(status_error("ZERO_RESULTS", None));
        }

        let distance_meters = route.legs.iter().map(|leg| leg.distance.value).sum();
        let duration_seconds = route.legs.iter().map(|leg| leg.duration.value).sum();
        let start_address = route.legs.first().map_or_else(String::new, |leg| {
            leg.start_address.clone().unwrap_or_default()
        });
        let end_address = route.legs.last().map_or_else(String::new, |leg| {
            leg.end_address.clone().unwrap_or_default()
        });

        Ok(DirectionsLeg {
            distance_meters,
            duration_seconds,
            polyline: polyline::decode(&route.overview_polyline.points),
            start_address,
            end_address,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct MatrixResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    rows: Vec<MatrixRow>,
}

#[derive(Debug, Deserialize)]
struct MatrixRow {
    #[serde(default)]
    elements: Vec<MatrixElement>,
}

#[derive(Debug, Deserialize)]
struct MatrixElement {
    status: String,
    distance: Option<ValueField>,
    duration: Option<ValueField>,
}

#[derive(Debug, Deserialize)]
struct ValueField {
    value: u32,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    legs: Vec<ApiLeg>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    distance: ValueField,
    duration: ValueField,
    start_address: Option<String>,
    end_address: Option<String>,
}
