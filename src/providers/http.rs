/*!
http.rs - JSON over HTTPS for the provider APIs.

  HttpClient::new(base, auth)          base URL must end with '/'
    .header(name, value)               extra static header (Harvest account id)
    .get / .post / .put / .patch       blocking wrappers, one Tokio runtime per client

Relative paths are joined onto the base URL. Non-2xx responses become errors carrying the status
and the start of the body. Empty bodies read as `Value::Null`.
*/

use anyhow::{Context, Result, bail};
use reqwest::Method;
use serde_json::Value;
use url::Url;

const USER_AGENT: &str = concat!("abt/", env!("CARGO_PKG_VERSION"));
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone)]
pub enum Auth {
    Bearer(String),
    Basic { username: String, password: String },
}

pub struct HttpClient {
    base: Url,
    auth: Auth,
    headers: Vec<(&'static str, String)>,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

impl HttpClient {
    pub fn new(base: &str, auth: Auth) -> Result<Self> {
        let base = Url::parse(base).with_context(|| format!("Invalid API base URL: {base}"))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        let runtime = tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?;
        Ok(Self {
            base,
            auth,
            headers: Vec::new(),
            client,
            runtime,
        })
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("Invalid API path: {path}"))
    }

    pub fn get(&self, path: &str) -> Result<Value> {
        self.runtime.block_on(self.request_async(Method::GET, path, None))
    }

    pub fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.runtime
            .block_on(self.request_async(Method::POST, path, Some(body)))
    }

    pub fn put(&self, path: &str, body: &Value) -> Result<Value> {
        self.runtime
            .block_on(self.request_async(Method::PUT, path, Some(body)))
    }

    pub fn patch(&self, path: &str, body: Option<&Value>) -> Result<Value> {
        self.runtime
            .block_on(self.request_async(Method::PATCH, path, body))
    }

    pub async fn request_async(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value> {
        let url = self.url(path)?;
        tracing::debug!(%method, %url, "api request");

        let mut request = self.client.request(method.clone(), url.clone());
        request = match &self.auth {
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        };
        for (name, value) in &self.headers {
            request = request.header(*name, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{method} {url} failed"))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response of {method} {url}"))?;
        tracing::trace!(%status, bytes = text.len(), "api response");

        if !status.is_success() {
            bail!(
                "{method} {url} returned {status}: {}",
                crate::format::truncate_ellipsis(text.trim(), ERROR_BODY_LIMIT)
            );
        }
        parse_body(&text).with_context(|| format!("Unexpected response from {method} {url}"))
    }
}

fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_str(text)?)
}

/// Deserialize `value[field]` (or the whole value when `field` is empty).
pub fn extract<T: serde::de::DeserializeOwned>(value: Value, field: &str) -> Result<T> {
    let inner = if field.is_empty() {
        value
    } else {
        match value {
            Value::Object(mut map) => map
                .remove(field)
                .with_context(|| format!("response has no '{field}' field"))?,
            _ => bail!("expected a JSON object with a '{field}' field"),
        }
    };
    Ok(serde_json::from_value(inner)?)
}
