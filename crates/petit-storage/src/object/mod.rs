//! Providers on top of an [`ObjectStore`]: S3-compatible buckets, the local
//! filesystem, or an in-memory store.

mod per_key;
mod snapshot;
#[cfg(test)]
mod test_store;

pub use per_key::PerKeyObjectProvider;
pub use snapshot::SnapshotObjectProvider;

use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use petit_core::{InfraError, Result, StorageError};
use std::sync::Arc;
use url::Url;

/// Builds an object store and key prefix from a URL.
///
/// Supported schemes:
/// - `s3://bucket/prefix`, credentials from `AWS_*` environment variables.
///   `AWS_ENDPOINT` selects an S3-compatible endpoint (MinIO and similar).
/// - `file:///path`, a local directory created if missing.
/// - `memory://`, a process-local store, mostly for tests.
pub fn store_from_url(url: &str) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
    let parsed = Url::parse(url)
        .map_err(|e| InfraError::configuration(format!("invalid URL '{url}': {e}")))?;

    match parsed.scheme() {
        "s3" => s3_store(&parsed),
        "file" => local_store(&parsed),
        "memory" => Ok((
            Arc::new(object_store::memory::InMemory::new()),
            ObjectPath::from(""),
        )),
        scheme => Err(InfraError::configuration(format!(
            "unsupported URL scheme '{scheme}'. Supported: s3, file, memory"
        ))
        .into()),
    }
}

fn s3_store(url: &Url) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
    let bucket = url
        .host_str()
        .ok_or_else(|| InfraError::configuration("S3 URL must include bucket name as host"))?;
    let prefix = url.path().trim_start_matches('/');

    let mut builder = object_store::aws::AmazonS3Builder::from_env().with_bucket_name(bucket);
    if let Ok(endpoint) = std::env::var("AWS_ENDPOINT") {
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false)
            .with_allow_http(true);
    }

    let store = builder
        .build()
        .map_err(|e| InfraError::configuration(format!("failed to create S3 store: {e}")))?;

    Ok((Arc::new(store), ObjectPath::from(prefix)))
}

fn local_store(url: &Url) -> Result<(Arc<dyn ObjectStore>, ObjectPath)> {
    let path = url.path();

    std::fs::create_dir_all(path)
        .map_err(|e| InfraError::io(format!("failed to create directory '{path}': {e}")))?;

    let store = object_store::local::LocalFileSystem::new_with_prefix(path)
        .map_err(|e| InfraError::configuration(format!("failed to create local store: {e}")))?;

    Ok((Arc::new(store), ObjectPath::from("")))
}

/// Maps an object store error for the object named `what`.
fn map_object_error(what: &str, err: object_store::Error) -> StorageError {
    let message = err.to_string();

    match err {
        object_store::Error::NotFound { .. } => StorageError::NotFound(what.to_string()),
        object_store::Error::AlreadyExists { .. } | object_store::Error::Precondition { .. } => {
            StorageError::AlreadyExists(what.to_string())
        }
        object_store::Error::NotImplemented | object_store::Error::NotSupported { .. } => {
            InfraError::unsupported(message).into()
        }
        object_store::Error::PermissionDenied { .. }
        | object_store::Error::Unauthenticated { .. } => InfraError::unavailable(message).into(),
        object_store::Error::InvalidPath { .. } => InfraError::invalid_data(message).into(),
        object_store::Error::UnknownConfigurationKey { .. } => {
            InfraError::configuration(message).into()
        }
        _ => InfraError::operation(message).into(),
    }
}
