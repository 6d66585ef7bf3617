// Core folders module - the linked folder itself and what we do with it.

pub mod folder_models;
pub mod folder_service;

pub use folder_models::{
    DriveItem, FileFacet, FolderAction, FolderContents, FolderDescriptor, FolderFacet,
    ItemReference, TopicFolder,
};
pub use folder_service::{DriveApi, FolderBackend, FolderError, FolderService};
