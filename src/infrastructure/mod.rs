pub mod blob_store;
pub mod js_executor;

pub use blob_store::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use js_executor::JsExecutor;
