//! Store operations for outer request handlers.
//!
//! Each call loads a fresh snapshot, applies one change, and saves the whole
//! result. Update and delete outcomes are mapped to an [`OperationResponse`]
//! so callers always get a well-formed answer.

use std::path::Path;

use crate::references::error::ReferenceResult;
use crate::references::model::{DeleteRequest, OperationResponse, Reference, ReferencePatch};
use crate::references::storage::JsonStorage;

/// Fetch one reference by id. `Ok(None)` when the id is unknown.
pub fn get_reference(store_file: &Path, id: &str) -> ReferenceResult<Option<Reference>> {
    let mut storage = JsonStorage::open(store_file);
    storage.load_or_empty()?;
    Ok(storage.get_reference(id).cloned())
}

/// Patch one reference's metadata.
pub fn update_reference(store_file: &Path, id: &str, patch: &ReferencePatch) -> OperationResponse {
    if patch.is_empty() {
        return OperationResponse::error("patch sets no fields");
    }
    let mut storage = JsonStorage::open(store_file);
    let result = storage.load().and_then(|()| storage.update(id, patch));
    respond("update", result)
}

/// Delete the requested references, or all of them.
pub fn delete_references(store_file: &Path, request: &DeleteRequest) -> OperationResponse {
    let mut storage = JsonStorage::open(store_file);
    let result = storage
        .load()
        .and_then(|()| storage.delete(&request.reference_ids, request.all));
    if let Ok(removed) = &result {
        tracing::info!(removed, all = request.all, "deleted references");
    }
    respond("delete", result)
}

fn respond<T>(action: &str, result: ReferenceResult<T>) -> OperationResponse {
    match result {
        Ok(_) => OperationResponse::ok(),
        Err(e) => {
            tracing::warn!(action, error = %e, "reference store operation failed");
            OperationResponse::error(e.to_string())
        }
    }
}
