// Discord side of moderation: message screening, transient notices and the
// rate-limit history pruner.

pub mod notices;
pub mod spam_handler;

pub use notices::post_transient;
pub use spam_handler::{
    handle_message_for_spam, spam_command_check, spawn_history_pruner, ScreenedMessages,
};
