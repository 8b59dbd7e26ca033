use anyhow::{Context, Error, Result, anyhow};
use reqwest::{Response, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Error body shape used by the advisor service.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "message")]
    detail: String,
}

/// Appends path segments to `base`, percent-encoding each one.
pub fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| anyhow!("Base URL cannot carry a path: {}", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turns a non-success response into an error carrying the server's detail
/// message when it sends one.
pub async fn check_status(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody { detail }) => anyhow!("HTTP error: {} for {}: {}", status, what, detail),
        Err(_) => anyhow!("HTTP error: {} for {}", status, what),
    })
}

/// Reads the body as JSON. The raw text is logged at debug level when it
/// does not parse; callers decide whether the failure is worth surfacing.
pub async fn decode_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let text = response
        .text()
        .await
        .with_context(|| format!("Failed to read {what} response"))?;
    serde_json::from_str(&text).map_err(|e| {
        debug!(error = ?e, response = %text, "Failed to parse {} response", what);
        Error::from(e).context(format!("Failed to parse {what} response"))
    })
}
