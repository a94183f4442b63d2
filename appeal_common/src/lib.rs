mod helpers;
mod secret;
mod usd;

pub mod op;

pub use helpers::{format_dollars, parse_boolean_flag};
pub use secret::Secret;
pub use usd::{UsdCents, UsdConversionError, USD_CURRENCY_CODE};
