//! Typed HTTP client for the certvault API.
//!
//! Wraps a `reqwest::Client` with the server base URL, the optional bearer
//! token, and a request timeout. Only the endpoints the CLI drives are
//! covered.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use certvault_core::{CertificateDigest, VerificationOutcome};

/// Default server when neither `--server` nor `CERTVAULT_URL` is given.
pub const DEFAULT_SERVER: &str = "http://localhost:5000";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid server URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("bearer token contains characters not allowed in a header")]
    InvalidToken,

    #[error("{endpoint}: request failed: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },

    #[error("{endpoint}: server returned {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("{endpoint}: unexpected response body: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
}

/// Connection settings.
#[derive(Clone)]
pub struct ClientConfig {
    pub server: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server", &self.server)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

/// Body of `POST /certificates`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub file_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub register_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    hash: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    institution: Option<&'a str>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[derive(Debug, Clone)]
pub struct CertvaultClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CertvaultClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&config.server)?;

        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|_| ClientError::InvalidToken)?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Register a certificate digest.
    ///
    /// Calls `POST {base_url}/certificates`.
    pub async fn issue(&self, req: &IssueRequest) -> Result<MessageResponse, ClientError> {
        let endpoint = "POST /certificates";
        let url = self.endpoint_url(endpoint, "certificates")?;

        let resp = self
            .http
            .post(url)
            .json(req)
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(api_error(endpoint, resp).await);
        }

        resp.json().await.map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })
    }

    /// Verify a digest.
    ///
    /// Calls `POST {base_url}/verify`. A successful response whose body is
    /// not a recognizable outcome is reported as an ERROR outcome.
    pub async fn verify(
        &self,
        hash: &CertificateDigest,
        institution: Option<&str>,
    ) -> Result<VerificationOutcome, ClientError> {
        let endpoint = "POST /verify";
        let url = self.endpoint_url(endpoint, "verify")?;

        let resp = self
            .http
            .post(url)
            .json(&VerifyRequest {
                hash: hash.as_str(),
                institution,
            })
            .send()
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.into(),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(api_error(endpoint, resp).await);
        }

        let body = resp.bytes().await.map_err(|e| ClientError::Deserialization {
            endpoint: endpoint.into(),
            source: e,
        })?;
        Ok(VerificationOutcome::decode_lenient(&body))
    }

    fn endpoint_url(&self, endpoint: &str, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path} ({endpoint})", self.base_url),
                source: e,
            })
    }
}

/// Parse the server URL, ensuring a trailing slash so relative joins keep
/// any path prefix.
fn parse_base_url(server: &str) -> Result<Url, ClientError> {
    let mut normalized = server.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Url::parse(&normalized).map_err(|e| ClientError::InvalidUrl {
        url: server.to_string(),
        source: e,
    })
}

async fn api_error(endpoint: &str, resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);
    ClientError::Api {
        endpoint: endpoint.into(),
        status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gains_trailing_slash() {
        let url = parse_base_url("http://example.com/api").unwrap();
        assert_eq!(url.as_str(), "http://example.com/api/");
        assert_eq!(
            url.join("verify").unwrap().as_str(),
            "http://example.com/api/verify"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn debug_redacts_token() {
        let config = ClientConfig {
            token: Some("s3cret".into()),
            ..ClientConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn issue_request_omits_unset_fields() {
        let req = IssueRequest {
            file_hash: "a".repeat(64),
            student_name: Some("Alice".into()),
            ..IssueRequest::default()
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["fileHash"], "a".repeat(64));
        assert_eq!(json["studentName"], "Alice");
        assert!(json.get("issuerName").is_none());
    }
}
