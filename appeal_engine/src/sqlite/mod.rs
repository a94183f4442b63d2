//! SQLite backend for the appeal engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
