pub mod error;
pub mod handle;
pub mod kv;
pub mod remote;
pub mod snapshot;
pub mod store;
pub mod trait_client;

pub use error::PersistError;
pub use handle::StoreHandle;
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use remote::RemoteRepository;
pub use snapshot::{LocalSnapshot, SnapshotWriter};
pub use store::{ApplyOutcome, ConversationStore, GENERIC_FAILURE_TEXT};
pub use trait_client::{ConversationRepository, ThreadPage};
