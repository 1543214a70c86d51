use reqwest::StatusCode;
use thiserror::Error;

pub type Result<T, E = MeteoError> = std::result::Result<T, E>;

/// Errors returned by the meteo.pl client.
#[derive(Debug, Error)]
pub enum MeteoError {
    /// Missing coordinates, missing API key or an unreadable rc file.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The forecast configuration is malformed.
    #[error("invalid forecast configuration: {0}")]
    Validation(String),

    /// The coordinate could not be mapped onto the forecast grid.
    #[error("coordinate conversion failed: {0}")]
    Conversion(String),

    /// Connection failure or timeout.
    #[error("could not reach meteo.pl API ({url})")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{}", format_api_error(.status, .url, .body))]
    Api {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// The response body was not the JSON document we expected.
    #[error("failed to parse API response (url={url}): {reason}")]
    Parse { url: String, reason: String },

    /// No forecast run within the last 24 hours exists for a field.
    #[error("no valid forecast date found for field {field} at level {level}")]
    NoForecastAvailable { field: String, level: i32 },
}

impl MeteoError {
    /// HTTP status of an [`MeteoError::Api`] error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MeteoError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn parse(url: &str, reason: impl ToString) -> Self {
        MeteoError::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

// The API is a Django REST Framework service; errors usually look like
// {"detail": "..."}.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn format_api_error(status: &StatusCode, url: &str, body: &str) -> String {
    let status = *status;
    let server_message = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|e| e.detail.or(e.message))
        .unwrap_or_else(|| body.trim().to_string());

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return format!(
            "meteo.pl authentication failed (HTTP {}).\n- Check that METEO_API_KEY or `key:` in .meteorc holds a valid token\n- The key is sent as `Authorization: Token <key>`\n\nServer message: {}\nrequest: {}",
            status.as_u16(),
            server_message,
            url
        );
    }

    if status == StatusCode::NOT_FOUND {
        return format!(
            "meteo.pl resource not found (HTTP 404).\n- Check the model, grid, field and level names\n\nServer message: {}\nrequest: {}",
            server_message, url
        );
    }

    format!(
        "API request failed: HTTP {} for url ({})\n{}",
        status.as_u16(),
        url,
        server_message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, body: &str) -> MeteoError {
        MeteoError::Api {
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://api.meteo.pl/api/v1/model/".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn api_error_keeps_status() {
        let err = api(429, "Too Many Requests");
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(err.to_string().contains("HTTP 429"));
        assert!(err.to_string().contains("Too Many Requests"));
    }

    #[test]
    fn unauthorized_extracts_detail() {
        let err = api(401, r#"{"detail": "Invalid token."}"#);
        let msg = err.to_string();
        assert!(msg.contains("authentication failed"));
        assert!(msg.contains("Server message: Invalid token."));
    }

    #[test]
    fn non_api_errors_have_no_status() {
        assert_eq!(MeteoError::Validation("x".into()).status(), None);
    }
}
