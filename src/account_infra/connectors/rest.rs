use reqwest::Client;
use crate::error::{ConnectionError, FetchError};

/// Outcome of a signed REST call that did not produce a usable body.
#[derive(Debug, Clone, PartialEq)]
pub enum RestFailure {
    Timeout(String),
    Unreachable(String),
    Transport(String),
    /// Credentials refused by the exchange (HTTP 401/403 or an auth error code).
    Rejected { code: i64, message: String },
    Api { code: i64, message: String },
    Malformed(String),
}

impl RestFailure {
    pub fn into_connection_error(self, source_name: &str) -> ConnectionError {
        let source_name = source_name.to_string();
        match self {
            RestFailure::Rejected { code, message } => ConnectionError::AuthRejected {
                source_name,
                message: format!("code {}: {}", code, message),
            },
            RestFailure::Timeout(message)
            | RestFailure::Unreachable(message)
            | RestFailure::Transport(message) => ConnectionError::Unreachable {
                source_name,
                message,
            },
            RestFailure::Api { code, message } => ConnectionError::MalformedResponse {
                source_name,
                message: format!("code {}: {}", code, message),
            },
            RestFailure::Malformed(message) => ConnectionError::MalformedResponse {
                source_name,
                message,
            },
        }
    }

    pub fn into_fetch_error(self) -> FetchError {
        match self {
            RestFailure::Timeout(message)
            | RestFailure::Unreachable(message)
            | RestFailure::Transport(message) => FetchError::Transport(message),
            RestFailure::Rejected { code, message } | RestFailure::Api { code, message } => {
                FetchError::Api { code, message }
            }
            RestFailure::Malformed(message) => FetchError::MalformedResponse(message),
        }
    }
}

impl From<RestFailure> for FetchError {
    fn from(failure: RestFailure) -> Self {
        failure.into_fetch_error()
    }
}

pub fn classify_transport(err: &reqwest::Error) -> RestFailure {
    if err.is_timeout() {
        RestFailure::Timeout(err.to_string())
    } else if err.is_connect() {
        RestFailure::Unreachable(err.to_string())
    } else {
        RestFailure::Transport(err.to_string())
    }
}

/// Issue a GET and return the status code with the raw body.
pub async fn get_text(
    client: &Client,
    url: &str,
    headers: &[(&'static str, String)],
) -> Result<(u16, String), RestFailure> {
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(*name, value);
    }

    let response = request.send().await.map_err(|e| classify_transport(&e))?;
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| classify_transport(&e))?;
    Ok((status, body))
}

pub fn parse_json<T: serde::de::DeserializeOwned>(what: &str, body: &str) -> Result<T, RestFailure> {
    serde_json::from_str(body)
        .map_err(|e| RestFailure::Malformed(format!("{} parse failed: {}", what, e)))
}
