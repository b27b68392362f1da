// Shared reqwest setup for the remote clients.
use anyhow::{Context, Result, bail};
use reqwest::{Client, Response, Url};
use std::time::Duration;

/// Longest slice of an error body kept in messages.
const MAX_ERROR_BODY: usize = 300;

pub fn user_agent() -> String {
    format!("rollcall/{}", env!("CARGO_PKG_VERSION"))
}

/// Client with the caller's timeout applied to every request.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent())
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// `base` plus extra path segments, each percent-encoded on its own.
pub fn join_segments(base: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(base).with_context(|| format!("Invalid API base URL '{}'", base))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("API base URL '{}' cannot have a path", base))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Turns a non-2xx response into an error carrying the status and body.
pub async fn ensure_success(response: Response, what: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(MAX_ERROR_BODY).collect();
    bail!("{} failed with HTTP {}: {}", what, status, body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segments_are_encoded_individually() {
        let url = join_segments(
            "https://sheets.example/",
            &["v4", "spreadsheets", "abc", "values", "'Member Mapping'!B2"],
        )
        .unwrap();
        assert_eq!(
            url.path(),
            "/v4/spreadsheets/abc/values/'Member%20Mapping'!B2"
        );
    }

    #[test]
    fn base_path_is_kept() {
        let url = join_segments("https://discord.example/api/v10", &["channels", "1"]).unwrap();
        assert_eq!(url.path(), "/api/v10/channels/1");
    }
}
