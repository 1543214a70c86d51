use std::time::Duration;

use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Method;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::{DEFAULT_BASE_URL, load_config};
use crate::error::{MeteoError, Result};
use crate::forecast::{DatesReply, ForecastReply, ForecastResult, select_run_date};
use crate::grid::{Coordinates, GridPoint, parse_conversion};
use crate::request::{Field, ForecastConfig};
use crate::util::{api_path, check_segment, urljoin};

/// Endpoint and credentials, as resolved by [`Client::from_env`].
#[derive(Clone)]
pub struct ClientConfig {
    /// Base model URL, typically `https://api.meteo.pl/api/v1/model/`.
    pub url: String,
    /// meteo.pl API token.
    pub key: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Blocking meteo.pl forecast client.
///
/// Holds read-only defaults (location, forecast config) and an HTTP client;
/// every call is otherwise stateless, so a `Client` can be cloned or shared
/// between threads freely.
#[derive(Debug, Clone)]
pub struct Client {
    url: String,
    auth: HeaderValue,

    latitude: Option<f64>,
    longitude: Option<f64>,
    config: ForecastConfig,

    timeout: Duration,
    progress: bool,

    http: HttpClient,
}

impl Client {
    /// Creates a client for the public endpoint with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig {
            url: DEFAULT_BASE_URL.to_string(),
            key: api_key.into(),
        })
    }

    /// Creates a client from `METEO_API_URL` / `METEO_API_KEY` and/or `.meteorc`.
    ///
    /// This is equivalent to `Client::from_settings(None, None)`.
    pub fn from_env() -> Result<Self> {
        Self::from_settings(None, None)
    }

    /// Creates a client using (in order of precedence):
    /// - explicit `url`/`key` arguments
    /// - environment variables `METEO_API_URL` / `METEO_API_KEY`
    /// - rc file from `METEO_RC`, `./.meteorc` or `~/.meteorc`
    pub fn from_settings(url: Option<String>, key: Option<String>) -> Result<Self> {
        Self::from_config(load_config(url, key)?)
    }

    pub fn from_config(cfg: ClientConfig) -> Result<Self> {
        let key = cfg.key.trim();
        if key.is_empty() {
            return Err(MeteoError::Configuration("api key must not be empty".into()));
        }
        let mut auth = HeaderValue::from_str(&format!("Token {}", key)).map_err(|_| {
            MeteoError::Configuration("api key contains characters not allowed in a header".into())
        })?;
        auth.set_sensitive(true);

        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("meteo-forecast-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("meteo-forecast-rs")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .build()
            .map_err(|e| MeteoError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: cfg.url,
            auth,
            latitude: None,
            longitude: None,
            config: ForecastConfig::default(),
            timeout: Duration::from_secs(60),
            progress: false,
            http,
        })
    }

    /// Default location used when `get_forecast` gets no coordinates.
    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Default forecast config; replaces the built-in one.
    pub fn with_config(mut self, config: ForecastConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Shows a progress bar on stderr while fields are fetched.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Fetches the forecast for a location.
    ///
    /// `latitude`/`longitude` fall back to the client's location and
    /// `config` (used as a whole) falls back to the client's config. The
    /// config and the coordinates are checked before anything is sent.
    ///
    /// For each field, in config order, the newest forecast run that started
    /// within the last 24 hours is located and its time series merged into
    /// the result.
    pub fn get_forecast(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        config: Option<&ForecastConfig>,
    ) -> Result<ForecastResult> {
        let config = config.unwrap_or(&self.config);
        config.validate()?;
        let coords = self.resolve_coordinates(latitude, longitude)?;

        let model = config.model.as_str();
        let point = self.grid_point(coords.latitude, coords.longitude, model, &config.grid)?;
        let field_base = api_path(&[
            model,
            "grid",
            config.grid.as_str(),
            "coordinates",
            point.path_segment().as_str(),
            "field",
        ]);

        let pb = self.progress_bar(config.fields.len() as u64);
        let now = Utc::now();
        let mut result = ForecastResult::default();

        for field in &config.fields {
            if let Some(pb) = &pb {
                pb.set_message(format!("{}@{}", field.name, field.level));
            }
            let run = self.latest_run(&field_base, field, now)?;
            let url = urljoin(
                &self.url,
                &format!(
                    "{}{}",
                    field_base,
                    api_path(&[
                        field.name.as_str(),
                        "level",
                        field.level.to_string().as_str(),
                        "date",
                        run.as_str(),
                        "forecast",
                    ])
                ),
            );
            let reply: ForecastReply = self.api_typed(Method::POST, &url)?;
            if reply.times.len() != reply.data.len() {
                debug!(
                    field = %field.name,
                    times = reply.times.len(),
                    values = reply.data.len(),
                    "forecast series lengths differ, extra entries dropped"
                );
            }
            reply.merge_into(&mut result, &field.name, field.level);
            if let Some(pb) = &pb {
                pb.inc(1);
            }
        }

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        info!(
            model,
            grid = %config.grid,
            fields = config.fields.len(),
            timestamps = result.len(),
            "forecast fetched"
        );
        Ok(result)
    }

    /// Maps a coordinate onto a cell of `model`/`grid`.
    pub fn grid_point(
        &self,
        latitude: f64,
        longitude: f64,
        model: &str,
        grid: &str,
    ) -> Result<GridPoint> {
        check_segment("model", model)?;
        check_segment("grid", grid)?;
        let coords = Coordinates::new(latitude, longitude);
        coords.validate()?;

        let url = urljoin(
            &self.url,
            &api_path(&[model, "grid", grid, "latlon2rowcol", coords.path_segment().as_str()]),
        );
        let body = self.api_json(Method::GET, &url)?;
        let point = parse_conversion(&url, body, &coords)?;
        debug!(latitude, longitude, col = point.col, row = point.row, "resolved grid point");
        Ok(point)
    }

    /// Models offered by the API.
    pub fn available_models(&self) -> Result<Vec<String>> {
        let url = urljoin(&self.url, "");
        self.api_key_of(&url, "models")
    }

    pub fn available_grids(&self, model: &str) -> Result<Vec<String>> {
        check_segment("model", model)?;
        let url = urljoin(&self.url, &api_path(&[model, "grid"]));
        self.api_key_of(&url, "grids")
    }

    /// Fields available at the grid cell nearest to the coordinate.
    pub fn available_fields(
        &self,
        model: &str,
        grid: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<String>> {
        let point = self.grid_point(latitude, longitude, model, grid)?;
        let url = urljoin(
            &self.url,
            &api_path(&[model, "grid", grid, "coordinates", point.path_segment().as_str(), "field"]),
        );
        self.api_key_of(&url, "fields")
    }

    /// Levels of `field`; returned as the API lists them.
    pub fn available_levels(
        &self,
        model: &str,
        grid: &str,
        field: &str,
        latitude: f64,
        longitude: f64,
    ) -> Result<Vec<Value>> {
        check_segment("field name", field)?;
        let point = self.grid_point(latitude, longitude, model, grid)?;
        let url = urljoin(
            &self.url,
            &api_path(&[
                model,
                "grid",
                grid,
                "coordinates",
                point.path_segment().as_str(),
                "field",
                field,
                "level",
            ]),
        );
        self.api_key_of(&url, "levels")
    }

    fn resolve_coordinates(
        &self,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Coordinates> {
        match (latitude.or(self.latitude), longitude.or(self.longitude)) {
            (Some(lat), Some(lon)) => Ok(Coordinates::new(lat, lon)),
            (None, None) => Err(MeteoError::Configuration(
                "no coordinates: pass latitude/longitude or set them with Client::with_location"
                    .into(),
            )),
            (None, Some(_)) => Err(MeteoError::Configuration("latitude is missing".into())),
            (Some(_), None) => Err(MeteoError::Configuration("longitude is missing".into())),
        }
    }

    fn latest_run(
        &self,
        field_base: &str,
        field: &Field,
        now: chrono::DateTime<Utc>,
    ) -> Result<String> {
        let url = urljoin(
            &self.url,
            &format!(
                "{}{}",
                field_base,
                api_path(&[field.name.as_str(), "level", field.level.to_string().as_str(), "date"])
            ),
        );
        let reply: DatesReply = self.api_typed(Method::GET, &url)?;
        let run = select_run_date(&reply.dates, now)?.ok_or_else(|| {
            MeteoError::NoForecastAvailable {
                field: field.name.clone(),
                level: field.level,
            }
        })?;
        debug!(field = %field.name, level = field.level, %run, "selected forecast run");
        Ok(run)
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.progress {
            return None;
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:30}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Some(pb)
    }

    fn api_key_of<T: DeserializeOwned>(&self, url: &str, key: &str) -> Result<T> {
        let mut body = self.api_json(Method::GET, url)?;
        let value = body
            .get_mut(key)
            .map(Value::take)
            .ok_or_else(|| MeteoError::parse(url, format!("missing `{}` key", key)))?;
        serde_json::from_value(value).map_err(|e| MeteoError::parse(url, e))
    }

    fn api_typed<T: DeserializeOwned>(&self, method: Method, url: &str) -> Result<T> {
        let body = self.api_json(method, url)?;
        serde_json::from_value(body).map_err(|e| MeteoError::parse(url, e))
    }

    fn api_json(&self, method: Method, url: &str) -> Result<Value> {
        debug!(%method, url, "meteo.pl request");
        let resp = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, self.auth.clone())
            .timeout(self.timeout)
            .send()
            .map_err(|source| MeteoError::Network {
                url: url.to_string(),
                source,
            })?;

        let status = resp.status();
        let text = resp.text().map_err(|source| MeteoError::Network {
            url: url.to_string(),
            source,
        })?;
        if !status.is_success() {
            return Err(MeteoError::Api {
                status,
                url: url.to_string(),
                body: text,
            });
        }

        serde_json::from_str(&text).map_err(|e| MeteoError::parse(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new("test_api_key").unwrap()
    }

    #[test]
    fn rejects_empty_key() {
        assert!(matches!(
            Client::new("  "),
            Err(MeteoError::Configuration(_))
        ));
    }

    #[test]
    fn rejects_key_with_newline() {
        assert!(matches!(
            Client::new("abc\ndef"),
            Err(MeteoError::Configuration(_))
        ));
    }

    #[test]
    fn debug_output_hides_key() {
        let c = client();
        assert!(!format!("{:?}", c).contains("test_api_key"));
        let cfg = ClientConfig {
            url: DEFAULT_BASE_URL.into(),
            key: "test_api_key".into(),
        };
        assert!(!format!("{:?}", cfg).contains("test_api_key"));
    }

    #[test]
    fn call_coordinates_override_defaults_independently() {
        let c = client().with_location(52.2297, 21.0122);
        let coords = c.resolve_coordinates(Some(50.0), None).unwrap();
        assert_eq!(coords, Coordinates::new(50.0, 21.0122));
    }

    #[test]
    fn missing_coordinates_is_configuration_error() {
        let c = client();
        assert!(matches!(
            c.resolve_coordinates(None, None),
            Err(MeteoError::Configuration(_))
        ));
        assert!(matches!(
            c.resolve_coordinates(Some(52.0), None),
            Err(MeteoError::Configuration(_))
        ));
    }

    #[test]
    fn default_config_is_builtin() {
        assert_eq!(client().config(), &ForecastConfig::default());
    }
}
