// Core moderation module - anti-spam rate limiting and content filtering.

pub mod content_filter;
pub mod moderation_models;
pub mod moderation_service;
pub mod rate_limiter;

pub use content_filter::ContentFilter;
pub use moderation_models::*;
pub use moderation_service::*;
