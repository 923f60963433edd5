use async_trait::async_trait;

use crate::error::{LookupError, Result};

/// Object-store-like durable storage. Keys are `/`-separated.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// All keys starting with `prefix`, sorted.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    /// `None` when the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    /// Whole-object replace.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Outcome of a successful conversation with the metadata service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArtistLookup {
    Found { genres: Vec<String> },
    /// The service does not know this artist
    Absent,
}

#[async_trait]
pub trait ArtistMetadata: Send + Sync {
    async fn fetch_artist(
        &self,
        artist_uri: &str,
        token: &str,
    ) -> std::result::Result<ArtistLookup, LookupError>;
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn token(&self) -> Result<String>;
}
