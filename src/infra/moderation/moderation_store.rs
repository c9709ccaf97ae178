// Implementations for the anti-spam whitelist.

pub mod sqlite_whitelist_store;

pub use sqlite_whitelist_store::SqliteWhitelistStore;
