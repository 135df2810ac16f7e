use anyhow::{Result, anyhow};
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION, CONTENT_RANGE},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::DatabaseError;

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.storage_key().to_string(),
        }
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        let api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| DatabaseError::InvalidHeader("apikey".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| DatabaseError::InvalidHeader("authorization".to_string()))?;

        headers.insert("apikey", api_key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(headers)
    }

    pub async fn request<T>(&self, method: Method, path: &str, body: Option<Value>) -> Result<T>
    where T: DeserializeOwned {
        self.request_with_headers(method, path, body, None).await
    }

    pub async fn request_with_headers<T>(&self, method: Method, path: &str,
                                         body: Option<Value>,
                                         extra_headers: Option<HeaderMap>)
                                         -> Result<T>
    where T: DeserializeOwned {
        let (data, _) = self.send(method, path, body, extra_headers).await?;
        Ok(data)
    }

    /// GET with `Prefer: count=exact`; the total comes back in `Content-Range`.
    pub async fn request_with_count<T>(&self, path: &str) -> Result<(T, u64)>
    where T: DeserializeOwned {
        let mut headers = HeaderMap::new();
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let (data, response_headers) = self.send(Method::GET, path, None, Some(headers)).await?;

        let total = response_headers
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| anyhow!("Missing or invalid Content-Range header for {}", path))?;

        Ok((data, total))
    }

    pub async fn count(&self, path: &str) -> Result<u64> {
        let (_, total) = self.request_with_count::<Vec<Value>>(path).await?;
        Ok(total)
    }

    async fn send<T>(&self, method: Method, path: &str, body: Option<Value>,
                     extra_headers: Option<HeaderMap>) -> Result<(T, HeaderMap)>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers()?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("API error ({}): {}", status, error_text);
            return Err(DatabaseError::from_response(status.as_u16(), &error_text).into());
        }

        let response_headers = response.headers().clone();
        let data = response.json::<T>().await?;
        Ok((data, response_headers))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

/// `0-9/25` -> 25, `*/0` -> 0. An unknown total (`0-9/*`) yields None.
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')
        .and_then(|(_, total)| total.trim().parse::<u64>().ok())
}
