// In-memory implementation of FolderBackend.
//
// Plays the forum's part in tests and local tooling: it knows which topics
// exist, who may edit them, and keeps the same small-action history the forum
// would post (linked / changed / cleared).

use crate::core::folders::{
    FolderAction, FolderBackend, FolderDescriptor, FolderError, TopicFolder,
};
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Clone, Debug, Default)]
struct TopicRecord {
    can_manage: bool,
    folder: Option<FolderDescriptor>,
    actions: Vec<FolderAction>,
}

/// Topic folder links kept in a `DashMap` keyed by topic id.
pub struct InMemoryFolderBackend {
    topics: DashMap<u64, TopicRecord>,
}

impl InMemoryFolderBackend {
    pub fn new() -> Self {
        Self {
            topics: DashMap::new(),
        }
    }

    /// Make a topic known. `can_manage` is whether the current user may edit it.
    pub fn register_topic(&self, topic_id: u64, can_manage: bool) {
        self.topics
            .entry(topic_id)
            .and_modify(|record| record.can_manage = can_manage)
            .or_insert(TopicRecord {
                can_manage,
                ..TopicRecord::default()
            });
    }

    pub fn folder(&self, topic_id: u64) -> Option<FolderDescriptor> {
        self.topics
            .get(&topic_id)
            .and_then(|record| record.folder.clone())
    }

    /// Small-action history of a topic, oldest first.
    pub fn actions(&self, topic_id: u64) -> Vec<FolderAction> {
        self.topics
            .get(&topic_id)
            .map(|record| record.actions.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryFolderBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FolderBackend for InMemoryFolderBackend {
    async fn persist_folder(
        &self,
        topic_id: u64,
        folder: &FolderDescriptor,
    ) -> Result<TopicFolder, FolderError> {
        let mut record = self
            .topics
            .get_mut(&topic_id)
            .ok_or(FolderError::TopicNotFound(topic_id))?;
        if !record.can_manage {
            return Err(FolderError::Forbidden(topic_id));
        }
        if let Some(field) = folder.missing_field() {
            return Err(FolderError::InvalidFolder(field.to_string()));
        }

        let action = if record.folder.is_some() {
            FolderAction::Changed
        } else {
            FolderAction::Linked
        };
        record.folder = Some(folder.clone());
        record.actions.push(action);

        Ok(TopicFolder {
            folder: record.folder.clone(),
            can_manage: record.can_manage,
        })
    }

    async fn remove_folder(&self, topic_id: u64) -> Result<TopicFolder, FolderError> {
        let mut record = self
            .topics
            .get_mut(&topic_id)
            .ok_or(FolderError::TopicNotFound(topic_id))?;
        if !record.can_manage {
            return Err(FolderError::Forbidden(topic_id));
        }

        // Only a folder with a name gets a "cleared" post.
        let removed = record.folder.take();
        if removed.is_some_and(|folder| !folder.name.trim().is_empty()) {
            record.actions.push(FolderAction::Cleared);
        }

        Ok(TopicFolder {
            folder: None,
            can_manage: record.can_manage,
        })
    }
}
