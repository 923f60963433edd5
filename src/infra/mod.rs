pub mod credentials;
pub mod fs_store;
pub mod http_client;
pub mod memory_store;

pub use credentials::{EnvTokenProvider, StaticTokenProvider};
pub use fs_store::FsObjectStore;
pub use http_client::ReqwestArtistClient;
pub use memory_store::InMemoryObjectStore;
