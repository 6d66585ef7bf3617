// Folder service - linking folders to topics and browsing what is inside them.
//
// This service handles:
// - Validating a picked folder before it is persisted
// - Linking / unlinking through the forum backend
// - Rebuilding a readable folder path and listing children through Graph
//
// NO HTTP code here - the drive API and the backend are ports.

use super::folder_models::{DriveItem, FolderContents, FolderDescriptor, TopicFolder};
use crate::core::auth::{Account, AuthError, Resource, TokenBroker};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// How far up the parent chain we walk when rebuilding a folder path.
const MAX_PATH_DEPTH: usize = 20;

const ROOT_ITEM_ID: &str = "root";

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum FolderError {
    #[error("Invalid folder: missing {0}")]
    InvalidFolder(String),

    #[error("Unable to acquire access token")]
    NoToken,

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not allowed to manage the folder of topic {0}")]
    Forbidden(u64),

    #[error("Topic {0} not found")]
    TopicNotFound(u64),

    #[error("Drive API error: {0}")]
    Api(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Read access to drive items (Microsoft Graph in production).
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Fetch one item, restricted to the `select` fields.
    async fn get_item(
        &self,
        access_token: &str,
        drive_id: &str,
        item_id: &str,
        select: &[&str],
    ) -> Result<DriveItem, FolderError>;

    /// Direct children of a folder.
    async fn list_children(
        &self,
        access_token: &str,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Vec<DriveItem>, FolderError>;
}

/// Where topic/folder links are stored.
///
/// The backend is the authority on permissions: it rejects topics the current
/// user cannot edit and reports whether they may manage the link.
#[async_trait]
pub trait FolderBackend: Send + Sync {
    async fn persist_folder(
        &self,
        topic_id: u64,
        folder: &FolderDescriptor,
    ) -> Result<TopicFolder, FolderError>;

    async fn remove_folder(&self, topic_id: u64) -> Result<TopicFolder, FolderError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct FolderService<D: DriveApi, B: FolderBackend> {
    broker: Arc<TokenBroker>,
    drive: D,
    backend: B,
}

impl<D: DriveApi, B: FolderBackend> FolderService<D, B> {
    pub fn new(broker: Arc<TokenBroker>, drive: D, backend: B) -> Self {
        Self {
            broker,
            drive,
            backend,
        }
    }

    /// Link a folder to a topic (or replace the existing link).
    pub async fn link_folder(
        &self,
        topic_id: u64,
        folder: &FolderDescriptor,
    ) -> Result<TopicFolder, FolderError> {
        if let Some(field) = folder.missing_field() {
            return Err(FolderError::InvalidFolder(field.to_string()));
        }

        let state = self
            .backend
            .persist_folder(topic_id, folder)
            .await
            .inspect_err(|e| tracing::warn!(topic_id, error = %e, "Failed to save folder"))?;

        tracing::info!(topic_id, drive_id = %folder.drive_id, "Linked OneDrive folder");
        Ok(state)
    }

    pub async fn unlink_folder(&self, topic_id: u64) -> Result<TopicFolder, FolderError> {
        let state = self
            .backend
            .remove_folder(topic_id)
            .await
            .inspect_err(|e| tracing::warn!(topic_id, error = %e, "Failed to remove folder"))?;

        tracing::info!(topic_id, "Removed OneDrive folder link");
        Ok(state)
    }

    /// Load the display path and children of a linked folder.
    ///
    /// Never prompts a login: without a cached token this fails with `NoToken`.
    pub async fn load_files(
        &self,
        folder: &FolderDescriptor,
        account: Option<&Account>,
    ) -> Result<FolderContents, FolderError> {
        if folder.drive_id.trim().is_empty() {
            return Err(FolderError::InvalidFolder("drive_id".into()));
        }
        if folder.item_id.trim().is_empty() {
            return Err(FolderError::InvalidFolder("item_id".into()));
        }

        let token = self
            .broker
            .acquire_access_token(account, false, Resource::Graph)
            .await?
            .ok_or(FolderError::NoToken)?;

        let result = self.load_with_token(&token, folder).await;
        if let Err(e) = &result {
            tracing::warn!(drive_id = %folder.drive_id, error = %e, "Failed to refresh folder");
        }
        result
    }

    async fn load_with_token(
        &self,
        token: &str,
        folder: &FolderDescriptor,
    ) -> Result<FolderContents, FolderError> {
        let drive_id = folder.drive_id.as_str();

        let item = self
            .drive
            .get_item(
                token,
                drive_id,
                &folder.item_id,
                &["name", "parentReference", "webUrl"],
            )
            .await?;

        let path = self.folder_path(token, drive_id, item).await?;
        let files = self
            .drive
            .list_children(token, drive_id, &folder.item_id)
            .await?;

        Ok(FolderContents { path, files })
    }

    /// Walk up the parent chain and join the names with `/`.
    ///
    /// Stops at the drive root, at a parent on another drive, or after
    /// `MAX_PATH_DEPTH` hops. The drive's top-level library is not included.
    async fn folder_path(
        &self,
        token: &str,
        drive_id: &str,
        item: DriveItem,
    ) -> Result<String, FolderError> {
        let mut parts = vec![item.name.clone()];
        let mut current = item;

        for _ in 0..MAX_PATH_DEPTH {
            let Some(parent) = current.parent_reference.as_ref() else {
                break;
            };
            let Some(parent_id) = parent.id.as_deref() else {
                break;
            };
            if parent_id == ROOT_ITEM_ID || parent.drive_id.as_deref() != Some(drive_id) {
                break;
            }

            let parent_item = self
                .drive
                .get_item(token, drive_id, parent_id, &["name", "parentReference"])
                .await?;

            let grandparent_id = parent_item
                .parent_reference
                .as_ref()
                .and_then(|p| p.id.as_deref());
            if matches!(grandparent_id, None | Some(ROOT_ITEM_ID)) {
                break;
            }

            parts.insert(0, parent_item.name.clone());
            current = parent_item;
        }

        Ok(parts.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::folders::ItemReference;
    use crate::infra::folders::InMemoryFolderBackend;
    use crate::testing::{broker_with, test_account, test_settings, FakeIdentityClient};
    use dashmap::DashMap;
    use std::sync::Mutex;

    /// Drive fake keyed by item id.
    struct MockDrive {
        items: DashMap<String, DriveItem>,
        children: Vec<DriveItem>,
        tokens_seen: Mutex<Vec<String>>,
    }

    impl MockDrive {
        fn new() -> Self {
            Self {
                items: DashMap::new(),
                children: Vec::new(),
                tokens_seen: Mutex::new(Vec::new()),
            }
        }

        fn with_item(self, id: &str, name: &str, parent_id: Option<&str>, drive: &str) -> Self {
            self.items.insert(
                id.to_string(),
                DriveItem {
                    id: Some(id.to_string()),
                    name: name.to_string(),
                    size: None,
                    last_modified_date_time: None,
                    web_url: None,
                    folder: None,
                    file: None,
                    parent_reference: parent_id.map(|pid| ItemReference {
                        id: Some(pid.to_string()),
                        drive_id: Some(drive.to_string()),
                        path: None,
                    }),
                },
            );
            self
        }
    }

    #[async_trait]
    impl DriveApi for MockDrive {
        async fn get_item(
            &self,
            access_token: &str,
            _drive_id: &str,
            item_id: &str,
            _select: &[&str],
        ) -> Result<DriveItem, FolderError> {
            self.tokens_seen
                .lock()
                .unwrap()
                .push(access_token.to_string());
            self.items
                .get(item_id)
                .map(|item| item.clone())
                .ok_or_else(|| FolderError::Api(format!("itemNotFound: {item_id}")))
        }

        async fn list_children(
            &self,
            _access_token: &str,
            _drive_id: &str,
            _item_id: &str,
        ) -> Result<Vec<DriveItem>, FolderError> {
            Ok(self.children.clone())
        }
    }

    fn folder(item_id: &str) -> FolderDescriptor {
        FolderDescriptor {
            drive_id: "drive1".into(),
            item_id: item_id.into(),
            name: "Reports".into(),
            path: None,
            web_url: Some("https://contoso.sharepoint.com/Reports".into()),
        }
    }

    fn service(drive: MockDrive) -> FolderService<MockDrive, InMemoryFolderBackend> {
        let (broker, _factory, _page) =
            broker_with(FakeIdentityClient::with_token("graph-tok"), test_settings());
        let backend = InMemoryFolderBackend::new();
        backend.register_topic(42, true);
        FolderService::new(broker, drive, backend)
    }

    #[tokio::test]
    async fn test_path_walks_parents_until_library_root() {
        // Documents (parent = root) / Projects / Q3 / Reports
        let drive = MockDrive::new()
            .with_item("docs", "Documents", Some("root"), "drive1")
            .with_item("projects", "Projects", Some("docs"), "drive1")
            .with_item("q3", "Q3", Some("projects"), "drive1")
            .with_item("reports", "Reports", Some("q3"), "drive1");
        let service = service(drive);

        let contents = service
            .load_files(&folder("reports"), Some(&test_account()))
            .await
            .unwrap();

        assert_eq!(contents.path, "Projects/Q3/Reports");
        let tokens = service.drive.tokens_seen.lock().unwrap();
        assert!(tokens.iter().all(|t| t == "graph-tok"));
    }

    #[tokio::test]
    async fn test_path_stops_at_other_drive() {
        let drive = MockDrive::new()
            .with_item("reports", "Reports", Some("shared"), "other-drive")
            .with_item("shared", "Shared", Some("docs"), "other-drive");
        let service = service(drive);

        let contents = service
            .load_files(&folder("reports"), Some(&test_account()))
            .await
            .unwrap();

        assert_eq!(contents.path, "Reports");
    }

    #[tokio::test]
    async fn test_path_depth_is_bounded() {
        // A parent cycle would loop forever without the depth cap.
        let drive = MockDrive::new()
            .with_item("a", "A", Some("b"), "drive1")
            .with_item("b", "B", Some("a"), "drive1");
        let service = service(drive);

        let contents = service
            .load_files(&folder("a"), Some(&test_account()))
            .await
            .unwrap();

        assert_eq!(contents.path.split('/').count(), MAX_PATH_DEPTH + 1);
    }

    #[tokio::test]
    async fn test_load_files_without_token_fails() {
        let service = service(MockDrive::new().with_item("reports", "Reports", None, "drive1"));

        let result = service.load_files(&folder("reports"), None).await;

        assert!(matches!(result, Err(FolderError::NoToken)));
    }

    #[tokio::test]
    async fn test_load_files_requires_ids() {
        let service = service(MockDrive::new());
        let mut f = folder("reports");
        f.drive_id = String::new();

        let result = service.load_files(&f, Some(&test_account())).await;

        assert!(matches!(result, Err(FolderError::InvalidFolder(field)) if field == "drive_id"));
    }

    #[tokio::test]
    async fn test_link_folder_validates_before_persisting() {
        let service = service(MockDrive::new());
        let mut f = folder("reports");
        f.web_url = None;

        let result = service.link_folder(42, &f).await;

        assert!(matches!(result, Err(FolderError::InvalidFolder(field)) if field == "web_url"));
        assert!(service.backend.folder(42).is_none());
    }

    #[tokio::test]
    async fn test_link_and_unlink() {
        let service = service(MockDrive::new());

        let linked = service.link_folder(42, &folder("reports")).await.unwrap();
        assert_eq!(linked.folder, Some(folder("reports")));
        assert!(linked.can_manage);

        let cleared = service.unlink_folder(42).await.unwrap();
        assert!(cleared.folder.is_none());
    }
}
