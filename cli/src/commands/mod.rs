//! Shared plumbing for the CLI commands: the HTTP client, request helpers and
//! output formatting.

pub mod account;
pub mod books;
pub mod loans;
pub mod notifications;
pub mod profile;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use reqwest::{Client, RequestBuilder, StatusCode, header};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

/// A non-2xx answer from the server.
#[derive(Debug, Error)]
#[error("{status} {code}: {message}")]
pub struct ApiFailure {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

impl ApiFailure {
    fn from_body(status: StatusCode, body: &str) -> Self {
        match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(envelope) => Self {
                status,
                code: envelope.error.code,
                message: envelope.error.message,
            },
            Err(_) => Self {
                status,
                code: "HTTP_ERROR".to_string(),
                message: if body.is_empty() {
                    status.canonical_reason().unwrap_or("request failed").to_string()
                } else {
                    body.to_string()
                },
            },
        }
    }
}

/// Output that can also be printed for a person.
pub trait HumanReadable {
    fn print_human(&self);
}

/// Builds the HTTP client, attaching the bearer token to every request.
pub fn build_client(token: Option<&str>) -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    if let Some(token) = token {
        let mut value = header::HeaderValue::from_str(&format!("Bearer {token}"))
            .context("token contains characters not allowed in a header")?;
        value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, value);
    }

    Client::builder()
        .default_headers(headers)
        .build()
        .context("failed to build HTTP client")
}

/// Sends a request and decodes the JSON body.
pub async fn make_request<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let response = send(request).await?;
    response
        .json::<T>()
        .await
        .context("failed to decode server response")
}

/// Sends a request whose success carries no body.
pub async fn make_empty_request(request: RequestBuilder) -> Result<()> {
    send(request).await.map(|_| ())
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await.context("failed to reach server")?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ApiFailure::from_body(status, &body).into())
}

/// Prints JSON by default, formatted text with `--human`.
pub fn output<T: Serialize + HumanReadable>(value: &T, human: bool) -> Result<()> {
    if human {
        value.print_human();
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Timestamp in the local zone.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Shortens text to `max` characters, marking the cut.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

/// Renders a 0-5 rating as stars, rounded to whole stars.
pub fn stars(rating: f64) -> String {
    let filled = rating.round().clamp(0.0, 5.0) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_from_error_envelope() {
        let failure = ApiFailure::from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"BOOK_UNAVAILABLE","message":"no copies available"}}"#,
        );
        assert_eq!(failure.code, "BOOK_UNAVAILABLE");
        assert_eq!(failure.message, "no copies available");
        assert_eq!(
            failure.to_string(),
            "400 Bad Request BOOK_UNAVAILABLE: no copies available"
        );
    }

    #[test]
    fn test_failure_from_plain_body() {
        let failure = ApiFailure::from_body(StatusCode::BAD_GATEWAY, "");
        assert_eq!(failure.code, "HTTP_ERROR");
        assert_eq!(failure.message, "Bad Gateway");

        let failure = ApiFailure::from_body(StatusCode::NOT_FOUND, "nope");
        assert_eq!(failure.message, "nope");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(0.0), "☆☆☆☆☆");
        assert_eq!(stars(4.4), "★★★★☆");
        assert_eq!(stars(9.0), "★★★★★");
    }
}
