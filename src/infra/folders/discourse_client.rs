use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use crate::core::folders::{FolderBackend, FolderDescriptor, FolderError, TopicFolder};

/// Client for the forum plugin's folder routes:
/// `PUT` / `DELETE` `{base}/cs-discourse-onedrive/topics/{topic_id}/folder`.
pub struct DiscourseFolderClient {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct FolderPayload<'a> {
    folder: &'a FolderDescriptor,
}

impl DiscourseFolderClient {
    /// Authenticates with a forum API key acting as `api_username`.
    pub fn new(base_url: &str, api_key: &str, api_username: &str) -> Result<Self, FolderError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key).map_err(|e| FolderError::Backend(e.to_string()))?,
        );
        headers.insert(
            "Api-Username",
            HeaderValue::from_str(api_username).map_err(|e| FolderError::Backend(e.to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| FolderError::Backend(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
        })
    }

    fn folder_url(&self, topic_id: u64) -> String {
        format!(
            "{}/cs-discourse-onedrive/topics/{}/folder",
            self.base_url, topic_id
        )
    }

    /// Map the forum's error statuses onto `FolderError`.
    async fn check_status(topic_id: u64, resp: Response) -> Result<Response, FolderError> {
        match resp.status() {
            status if status.is_success() => Ok(resp),
            StatusCode::FORBIDDEN => Err(FolderError::Forbidden(topic_id)),
            StatusCode::NOT_FOUND => Err(FolderError::TopicNotFound(topic_id)),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(FolderError::Backend(format!(
                    "Forum returned {} for topic {}: {}",
                    status, topic_id, body
                )))
            }
        }
    }

    /// The routes answer with an empty body; a JSON body, when present, wins.
    async fn topic_folder(resp: Response, fallback: TopicFolder) -> Result<TopicFolder, FolderError> {
        let body = resp
            .text()
            .await
            .map_err(|e| FolderError::Backend(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(fallback);
        }
        serde_json::from_str(&body).map_err(|e| FolderError::Backend(e.to_string()))
    }
}

#[async_trait]
impl FolderBackend for DiscourseFolderClient {
    async fn persist_folder(
        &self,
        topic_id: u64,
        folder: &FolderDescriptor,
    ) -> Result<TopicFolder, FolderError> {
        let resp = self
            .client
            .put(self.folder_url(topic_id))
            .json(&FolderPayload { folder })
            .send()
            .await
            .map_err(|e| FolderError::Backend(e.to_string()))?;
        let resp = Self::check_status(topic_id, resp).await?;

        Self::topic_folder(
            resp,
            TopicFolder {
                folder: Some(folder.clone()),
                can_manage: true,
            },
        )
        .await
    }

    async fn remove_folder(&self, topic_id: u64) -> Result<TopicFolder, FolderError> {
        let resp = self
            .client
            .delete(self.folder_url(topic_id))
            .send()
            .await
            .map_err(|e| FolderError::Backend(e.to_string()))?;
        let resp = Self::check_status(topic_id, resp).await?;

        Self::topic_folder(
            resp,
            TopicFolder {
                folder: None,
                can_manage: true,
            },
        )
        .await
    }
}
