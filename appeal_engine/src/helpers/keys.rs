use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db_types::PrecheckId;

/// Derives the order idempotency key for a precheck: the hex-encoded SHA-256 digest of `{precheck_id}:{engine_version}`.
///
/// The key is stored under a unique constraint, so a second order for the same precheck and engine version is
/// rejected by the store instead of producing a duplicate charge.
pub fn idempotency_key(precheck_id: &PrecheckId, engine_version: &str) -> String {
    let digest = Sha256::digest(format!("{precheck_id}:{engine_version}").as_bytes());
    format!("{digest:x}")
}

/// A fresh, unguessable token identifying the holder of an order lock.
pub fn new_lock_token() -> String {
    Uuid::new_v4().simple().to_string()
}
