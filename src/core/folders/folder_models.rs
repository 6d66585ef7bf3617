use serde::{Deserialize, Serialize};

/// A folder linked to a topic. This is what the picker hands back and what the
/// forum stores in the topic's custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderDescriptor {
    pub drive_id: String,
    pub item_id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl FolderDescriptor {
    /// Names the first required field that is missing or blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        let blank = |value: &str| value.trim().is_empty();

        if blank(&self.drive_id) {
            Some("drive_id")
        } else if blank(&self.item_id) {
            Some("item_id")
        } else if blank(&self.name) {
            Some("name")
        } else if self.web_url.as_deref().map_or(true, blank) {
            Some("web_url")
        } else {
            None
        }
    }
}

/// Folder state of a topic as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicFolder {
    #[serde(default)]
    pub folder: Option<FolderDescriptor>,
    #[serde(default)]
    pub can_manage: bool,
}

/// What happened to a topic's folder link. Each maps to a small-action post code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderAction {
    Linked,
    Changed,
    Cleared,
}

impl FolderAction {
    pub fn action_code(&self) -> &'static str {
        match self {
            FolderAction::Linked => "onedrive_folder_linked",
            FolderAction::Changed => "onedrive_folder_changed",
            FolderAction::Cleared => "onedrive_folder_cleared",
        }
    }
}

// ============================================================================
// GRAPH DRIVE ITEMS
// ============================================================================

/// File or folder item from a drive (subset of Graph's `driveItem`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "lastModifiedDateTime", default)]
    pub last_modified_date_time: Option<String>,
    #[serde(rename = "webUrl", default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub folder: Option<FolderFacet>,
    #[serde(default)]
    pub file: Option<FileFacet>,
    #[serde(rename = "parentReference", default)]
    pub parent_reference: Option<ItemReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderFacet {
    #[serde(rename = "childCount", default)]
    pub child_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFacet {
    #[serde(rename = "mimeType", default)]
    pub mime_type: Option<String>,
}

/// Reference to another item (usually the parent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemReference {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "driveId", default)]
    pub drive_id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

/// A linked folder's display path and its direct children.
#[derive(Debug, Clone, PartialEq)]
pub struct FolderContents {
    pub path: String,
    pub files: Vec<DriveItem>,
}
