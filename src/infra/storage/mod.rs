pub mod http_artifact_store;
pub mod memory_artifact_store;
