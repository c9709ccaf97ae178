// Discord commands module.
// Each feature gets its own command file.

pub mod arguments;

pub mod giveaway;

pub mod help;

// Bot presence management
pub mod presence;

pub mod whitelist;
