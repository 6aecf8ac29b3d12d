use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::application::ports::PhotoGateway;
use crate::domain::entities::{PhotoFetch, RemotePhoto, RemotePhotoMetadata};
use crate::domain::value_objects::UserId;
use crate::shared::config::ApiConfig;
use crate::shared::error::AppError;

const MAX_ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadPhotoRequest<'a> {
    base64_image: &'a str,
    mime_type: &'a str,
}

/// `PhotoGateway` の HTTP 実装
#[derive(Clone)]
pub struct HttpPhotoGateway {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpPhotoGateway {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(AppError::ConfigurationError(
                "Photo API base URL is empty".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| AppError::ConfigurationError(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, AppError> {
        Self::new(
            &config.base_url,
            config.auth_token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn photo_url(&self, user: &UserId) -> String {
        format!("{}/users/{}/photo", self.base_url, user)
    }

    fn metadata_url(&self, user: &UserId) -> String {
        format!("{}/users/{}/photo/metadata", self.base_url, user)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, AppError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };
        Ok(req.send().await?)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|err| {
            AppError::DeserializationError(format!("Invalid photo API response: {err}"))
        })
    }
}

async fn status_error(response: Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let excerpt: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            AppError::Unauthorized(format!("Photo API rejected credentials ({status})"))
        }
        _ => AppError::Network(format!("Photo API error ({status}): {excerpt}")),
    }
}

#[async_trait]
impl PhotoGateway for HttpPhotoGateway {
    async fn fetch_photo(&self, user: &UserId) -> Result<PhotoFetch, AppError> {
        let response = self.send(self.http.get(self.photo_url(user))).await?;
        match response.status() {
            StatusCode::NO_CONTENT => {
                debug!(user = %user, "Photo API reported no photo");
                Ok(PhotoFetch::NotFound)
            }
            status if status.is_success() => {
                let photo: RemotePhoto = Self::read_json(response).await?;
                Ok(PhotoFetch::Found(photo))
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn fetch_photo_metadata(
        &self,
        user: &UserId,
    ) -> Result<Option<RemotePhotoMetadata>, AppError> {
        let response = self.send(self.http.get(self.metadata_url(user))).await?;
        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::read_json(response).await?)),
            _ => Err(status_error(response).await),
        }
    }

    async fn upload_photo(
        &self,
        user: &UserId,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<RemotePhotoMetadata, AppError> {
        let body = UploadPhotoRequest {
            base64_image,
            mime_type,
        };
        let response = self
            .send(self.http.post(self.photo_url(user)).json(&body))
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Self::read_json(response).await
    }

    async fn delete_photo(&self, user: &UserId) -> Result<(), AppError> {
        let response = self.send(self.http.delete(self.photo_url(user))).await?;
        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}
