use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::GatewayError;
use crate::models::{AttachedFile, BillRecord, Settings, UploadedFile};
use crate::services::file_validator;
use crate::services::gateway::RemoteBillGateway;

/// REST implementation of the bill backend.
pub struct HttpBillGateway {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBillGateway {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(anyhow!("API URL missing"));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("HTTP client: {}", e))?;
        Ok(HttpBillGateway {
            client,
            base_url,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let url = settings
            .api_url
            .as_deref()
            .ok_or_else(|| anyhow!("API URL missing, run `billed config set --api-url <url>`"))?;
        Self::new(
            url,
            settings.api_token.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(GatewayError::network)?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = status.as_u16(), error = %e, "failed to read error body");
                    String::new()
                }
            };
            return Err(GatewayError::from_status(status.as_u16(), &body));
        }

        let body = response.bytes().await.map_err(GatewayError::network)?;
        serde_json::from_slice(&body).map_err(|e| GatewayError::server(format!("invalid response: {}", e)))
    }
}

#[async_trait]
impl RemoteBillGateway for HttpBillGateway {
    async fn list(&self) -> Result<Vec<BillRecord>, GatewayError> {
        debug!(url = %self.base_url, "GET bills");
        self.send(self.client.get(self.url("bills"))).await
    }

    async fn upload_file(&self, file: &AttachedFile) -> Result<UploadedFile, GatewayError> {
        let extension = crate::utils::file_extension(&file.file_name).unwrap_or_default();
        debug!(file_name = %file.file_name, bytes = file.content.len(), "POST receipt");
        let request = self
            .client
            .post(self.url("bills/receipts"))
            .query(&[("fileName", file.file_name.as_str())])
            .header(reqwest::header::CONTENT_TYPE, file_validator::content_type(&extension))
            .body(file.content.clone());
        self.send(request).await
    }

    async fn create(&self, record: &BillRecord) -> Result<BillRecord, GatewayError> {
        debug!(date = %record.date, "POST bill");
        self.send(self.client.post(self.url("bills")).json(record)).await
    }
}
