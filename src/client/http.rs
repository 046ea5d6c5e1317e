//! reqwest-backed [`Transport`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use url::Url;

use super::{ApiRequest, ApiResponse, ClientError, Transport};

/// HTTPS transport with a bearer `Authorization` default header.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `base_url`, authenticating with `api_key`.
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "base URL '{}' must use http or https",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .default_headers(build_headers(api_key)?)
            .user_agent(concat!("terraform-provider-archestra/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn build_headers(api_key: &str) -> Result<HeaderMap, ClientError> {
    let mut headers = HeaderMap::new();
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", api_key))
        .map_err(|e| ClientError::Config(format!("API key is not a valid header value: {}", e)))?;
    auth.set_sensitive(true);
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Ok(headers)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let mut builder = self.client.request(request.method, self.url(&request.path));
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join_keeps_path_prefix() {
        let transport = HttpTransport::new("https://archestra.example.com/base/", "key").unwrap();
        assert_eq!(
            transport.url("/api/teams"),
            "https://archestra.example.com/base/api/teams"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            HttpTransport::new("not a url", "key"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            HttpTransport::new("ftp://archestra.example.com", "key"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_auth_header_is_sensitive() {
        let headers = build_headers("secret").unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap();
        assert!(auth.is_sensitive());
        assert_eq!(auth.to_str().unwrap(), "Bearer secret");
    }

    #[test]
    fn test_rejects_header_breaking_key() {
        assert!(matches!(build_headers("bad\nkey"), Err(ClientError::Config(_))));
    }
}
