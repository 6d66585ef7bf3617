use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::core::folders::{DriveApi, DriveItem, FolderError};

pub const DEFAULT_GRAPH_ENDPOINT: &str = "https://graph.microsoft.com/v1.0";

/// Microsoft Graph drive client. Tokens are passed per call, the client holds none.
pub struct GraphDriveClient {
    client: Client,
    base_url: String,
}

/// Graph collection envelope.
#[derive(Deserialize)]
struct GraphList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

impl GraphDriveClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            base_url: DEFAULT_GRAPH_ENDPOINT.to_string(),
        }
    }

    /// Point the client at another Graph endpoint (national clouds, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    /// Base URL plus percent-encoded path segments.
    fn url_with_segments(&self, segments: &[&str]) -> Result<Url, FolderError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| FolderError::Api(e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| FolderError::Api("Graph base URL cannot be a base".to_string()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        access_token: &str,
        url: Url,
    ) -> Result<T, FolderError> {
        let resp = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FolderError::Api(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(FolderError::Api(
                "Graph rejected the access token".to_string(),
            ));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FolderError::Api(format!(
                "Microsoft Graph request failed ({status}): {body}"
            )));
        }

        resp.json::<T>()
            .await
            .map_err(|e| FolderError::Api(e.to_string()))
    }
}

impl Default for GraphDriveClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DriveApi for GraphDriveClient {
    async fn get_item(
        &self,
        access_token: &str,
        drive_id: &str,
        item_id: &str,
        select: &[&str],
    ) -> Result<DriveItem, FolderError> {
        let mut url = self.url_with_segments(&["drives", drive_id, "items", item_id])?;
        if !select.is_empty() {
            url.query_pairs_mut()
                .append_pair("$select", &select.join(","));
        }

        tracing::debug!(%drive_id, %item_id, "Fetching drive item");
        self.get_json(access_token, url).await
    }

    async fn list_children(
        &self,
        access_token: &str,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Vec<DriveItem>, FolderError> {
        let url = self.url_with_segments(&["drives", drive_id, "items", item_id, "children"])?;

        let list: GraphList<DriveItem> = self.get_json(access_token, url).await?;
        tracing::debug!(%drive_id, %item_id, count = list.value.len(), "Listed folder children");
        Ok(list.value)
    }
}
