use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::blocking::Client;
use serde::Deserialize;
use url::Url;

use crate::collect::global_variables::{DEFAULT_TIMEOUT_SECS, GSV_METADATA_URL};
use crate::error::CollectError;
use crate::geo_core::GeographicCoordinate;

/// Metadata of one Google Street View panorama, as reported by the
/// service for a queried location.
#[derive(Debug, Clone, PartialEq)]
pub struct PanoramaRecord {
    pub pano_id: String,
    pub pano_date: String,
    pub longitude: f64,
    pub latitude: f64,
}

impl PanoramaRecord {
    /// Render the record as one output line, trailing newline included.
    pub fn to_line(&self) -> String {
        format!(
            "panoID: {} panoDate: {} longitude: {} latitude: {}\n",
            self.pano_id, self.pano_date, self.longitude, self.latitude
        )
    }
}

/// Outcome of a metadata lookup. A location with no imagery is a
/// normal result, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataResponse {
    Panorama(PanoramaRecord),
    NoPanorama,
}

/// Capability to look up panorama metadata for a geographic
/// coordinate.
pub trait MetadataFetcher {
    fn fetch_metadata(
        &self,
        coordinate: &GeographicCoordinate,
    ) -> Result<MetadataResponse, CollectError>;
}

/// Client for the Google Street View metadata endpoint.
///
/// One blocking request per lookup, no retries. Pacing between
/// requests is the caller's responsibility.
pub struct GsvCollect {
    client: Client,
    base_url: Url,
}

impl GsvCollect {
    pub fn new() -> Result<Self, CollectError> {
        Self::with_config(GSV_METADATA_URL, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_config(base_url: &str, timeout: Duration) -> Result<Self, CollectError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CollectError::Configuration(format!("invalid metadata endpoint {}: {}", base_url, e))
        })?;
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            CollectError::Configuration(format!("failed to build HTTP client: {}", e))
        })?;
        Ok(GsvCollect { client, base_url })
    }

    /// Request URL for a coordinate. The service expects the location
    /// as `ll=latitude,longitude`.
    pub fn metadata_url(&self, coordinate: &GeographicCoordinate) -> String {
        let mut url = self.base_url.clone();
        url.set_query(Some(&format!("output=xml&ll={}", coordinate)));
        url.to_string()
    }

    /// Query the service for the panorama closest to `coordinate`.
    pub fn fetch_metadata(
        &self,
        coordinate: &GeographicCoordinate,
    ) -> Result<MetadataResponse, CollectError> {
        let url = self.metadata_url(coordinate);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| CollectError::Network(format!("request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(CollectError::Network(format!(
                "{} returned {}",
                url,
                response.status()
            )));
        }

        let body = response.text().map_err(|e| {
            CollectError::Network(format!("failed to read response body from {}: {}", url, e))
        })?;

        parse_metadata(&body)
    }
}

impl MetadataFetcher for GsvCollect {
    fn fetch_metadata(
        &self,
        coordinate: &GeographicCoordinate,
    ) -> Result<MetadataResponse, CollectError> {
        GsvCollect::fetch_metadata(self, coordinate)
    }
}

/// Response document: `<panorama>` with an optional
/// `<data_properties>` child carrying the metadata as attributes.
#[derive(Debug, Deserialize)]
struct PanoramaDocument {
    data_properties: Option<DataProperties>,
}

/// Fields are looked up by attribute name. The service carries many
/// more attributes than these; unknown ones are ignored.
#[derive(Debug, Deserialize)]
struct DataProperties {
    #[serde(rename = "@pano_id")]
    pano_id: String,
    #[serde(rename = "@image_date")]
    image_date: String,
    #[serde(rename = "@lat")]
    lat: f64,
    #[serde(rename = "@lng")]
    lng: f64,
}

/// Parse a metadata response body.
///
/// An empty `<panorama/>` and a `<panorama>` without
/// `<data_properties>` both mean no imagery at the location. A present
/// `<data_properties>` missing one of the named fields is a parse
/// failure and is surfaced to the caller.
pub fn parse_metadata(xml: &str) -> Result<MetadataResponse, CollectError> {
    ensure_panorama_root(xml)?;

    let document: PanoramaDocument = quick_xml::de::from_str(xml)
        .map_err(|e| CollectError::Parse(format!("unexpected metadata structure: {}", e)))?;

    match document.data_properties {
        Some(properties) => Ok(MetadataResponse::Panorama(PanoramaRecord {
            pano_id: properties.pano_id,
            pano_date: properties.image_date,
            longitude: properties.lng,
            latitude: properties.lat,
        })),
        None => Ok(MetadataResponse::NoPanorama),
    }
}

/// Reject documents whose root element is not `<panorama>`.
///
/// Struct deserialization does not check the root name, so without
/// this an HTML error page would pass for a no-panorama response.
fn ensure_panorama_root(xml: &str) -> Result<(), CollectError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.name().as_ref() == b"panorama" {
                    return Ok(());
                }
                return Err(CollectError::Parse(format!(
                    "unexpected root element <{}> in metadata response",
                    String::from_utf8_lossy(e.name().as_ref())
                )));
            }
            Ok(Event::Eof) => {
                return Err(CollectError::Parse(
                    "metadata response contains no XML element".to_string(),
                ))
            }
            Err(e) => {
                return Err(CollectError::Parse(format!(
                    "malformed metadata response: {}",
                    e
                )))
            }
            Ok(_) => continue,
        }
    }
}
