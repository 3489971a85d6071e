//! HTTP client for the applicant API.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use verifydesk_core::{AdminId, ApplicationId, CodeStage, PinStage};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with its error body.
    #[error("{code}: {message}")]
    Api { code: String, message: String },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitApplication<'a> {
    phone_number: &'a str,
    pin: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin_id: Option<&'a str>,
}

/// Answer to a submitted application.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submitted {
    pub application_id: ApplicationId,
    pub assigned_admin_id: AdminId,
    pub assigned_admin_name: String,
}

#[derive(Debug, Deserialize)]
struct StageStatus<S> {
    status: S,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Clone)]
pub struct DeskClient {
    http: Client,
    base: Url,
}

impl DeskClient {
    /// # Errors
    ///
    /// Returns `Url` if `server` is not an absolute URL.
    pub fn new(server: &str) -> Result<Self, ClientError> {
        Ok(Self {
            http: Client::new(),
            base: Url::parse(server)?,
        })
    }

    /// # Errors
    ///
    /// Returns `Api` with the server's error code, e.g. `no_admins_available`.
    pub async fn submit_application(
        &self,
        phone_number: &str,
        pin: &str,
        admin_id: Option<&str>,
    ) -> Result<Submitted, ClientError> {
        let body = SubmitApplication {
            phone_number,
            pin,
            admin_id,
        };
        let response = self
            .http
            .post(self.base.join("/api/applications")?)
            .json(&body)
            .send()
            .await?;
        read(response).await
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the application is unknown.
    pub async fn pin_status(&self, id: &ApplicationId) -> Result<PinStage, ClientError> {
        let url = self
            .base
            .join(&format!("/api/applications/{id}/pin-status"))?;
        let status: StageStatus<PinStage> = read(self.http.get(url).send().await?).await?;
        Ok(status.status)
    }

    /// # Errors
    ///
    /// Returns `Api` with `forbidden` before the pin is approved.
    pub async fn submit_code(&self, id: &ApplicationId, code: &str) -> Result<(), ClientError> {
        let url = self.base.join(&format!("/api/applications/{id}/code"))?;
        let response = self
            .http
            .post(url)
            .json(&serde_json::json!({ "code": code }))
            .send()
            .await?;
        let _: serde_json::Value = read(response).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns error if the request fails or the application is unknown.
    pub async fn code_status(&self, id: &ApplicationId) -> Result<CodeStage, ClientError> {
        let url = self
            .base
            .join(&format!("/api/applications/{id}/code-status"))?;
        let status: StageStatus<CodeStage> = read(self.http.get(url).send().await?).await?;
        Ok(status.status)
    }
}

async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    if response.status().is_success() {
        return Ok(response.json().await?);
    }
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(ClientError::Api {
            code: body.error,
            message: body.message,
        }),
        Err(_) => Err(ClientError::Api {
            code: status.as_u16().to_string(),
            message: status.to_string(),
        }),
    }
}
