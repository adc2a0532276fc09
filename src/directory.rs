//! Directory service access: session contract, HTTP client, in-memory tree.

pub mod contract;
pub mod http;
pub mod memory;

pub use contract::{
    AdminCredentials, AdminProfile, ApiKeyEntry, DirectoryConnector, DirectorySession,
    ListingRequest, SortKey,
};
pub use http::{HttpDirectoryConnector, HttpDirectorySession};
pub use memory::{DirectoryCall, MemoryConnector, MemoryDirectory};
