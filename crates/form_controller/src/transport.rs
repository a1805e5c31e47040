use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde_json::Value;
use shared::protocol::FormRequest;
use tracing::debug;
use url::Url;

use crate::Transport;

/// Relative action URLs resolve against `base_url`. The HTTP status is not
/// interpreted; the JSON envelope carries the verdict.
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    pub fn resolve(&self, target: &str) -> Result<Url> {
        self.base_url
            .join(target)
            .with_context(|| format!("invalid action url '{target}'"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: FormRequest) -> Result<Value> {
        let url = self.resolve(&request.url)?;

        let form = request
            .fields
            .into_iter()
            .fold(multipart::Form::new(), |form, (name, value)| {
                form.text(name, value)
            });
        let builder = self.http.post(url.clone()).multipart(form);
        let builder = request
            .headers
            .into_iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value));

        let response = builder
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;
        debug!(url = %url, status = %response.status(), "transport: response received");
        response
            .json::<Value>()
            .await
            .with_context(|| format!("response from {url} is not JSON"))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
