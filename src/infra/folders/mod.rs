// Folder link storage: the forum's HTTP routes, plus an in-memory stand-in.

pub mod discourse_client;
pub mod in_memory;

pub use discourse_client::DiscourseFolderClient;
pub use in_memory::InMemoryFolderBackend;
