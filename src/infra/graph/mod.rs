// Microsoft Graph drive access.

pub mod graph_drive_client;

pub use graph_drive_client::{GraphDriveClient, DEFAULT_GRAPH_ENDPOINT};
