mod keys;
mod validation;

pub use keys::{idempotency_key, new_lock_token};
pub use validation::{is_valid_email, normalize_ip};
