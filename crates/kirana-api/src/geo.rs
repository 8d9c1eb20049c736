//! Coarse IP-based geolocation.
//!
//! Used only to seed a sensible default delivery location before the user
//! picks a real address. Best-effort: any failure is logged and reported
//! as absent, never as an error.

use std::time::Duration;

use serde::Deserialize;

const GEO_ENDPOINT: &str = "http://ip-api.com/json/";
const GEO_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Deserialize)]
pub struct GeoLocation {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
    pub city: Option<String>,
    #[serde(rename = "regionName")]
    pub region: Option<String>,
}

/// Look up the machine's approximate location from its public IP.
pub async fn detect_location() -> Option<GeoLocation> {
    let client = reqwest::Client::builder()
        .timeout(GEO_TIMEOUT)
        .build()
        .ok()?;
    match client.get(GEO_ENDPOINT).send().await {
        Ok(response) => match response.json::<GeoLocation>().await {
            Ok(location) => {
                tracing::debug!(
                    lat = location.latitude,
                    lon = location.longitude,
                    city = location.city.as_deref().unwrap_or("unknown"),
                    "detected approximate location"
                );
                Some(location)
            }
            Err(e) => {
                tracing::debug!(error = %e, "geolocation response not understood");
                None
            }
        },
        Err(e) => {
            tracing::debug!(error = %e, "geolocation lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_ip_api_shape() {
        let raw = r#"{"lat": 12.97, "lon": 77.59, "city": "Bengaluru", "regionName": "Karnataka"}"#;
        let location: GeoLocation = serde_json::from_str(raw).expect("parse");
        assert!((location.latitude - 12.97).abs() < f64::EPSILON);
        assert_eq!(location.city.as_deref(), Some("Bengaluru"));
        assert_eq!(location.region.as_deref(), Some("Karnataka"));
    }
}
