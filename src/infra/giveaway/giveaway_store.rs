// Implementations for the giveaway registry.

pub mod in_memory;
pub mod sqlite_store;

// Re-export for convenience
pub use in_memory::InMemoryGiveawayStore;
pub use sqlite_store::SqliteGiveawayStore;
