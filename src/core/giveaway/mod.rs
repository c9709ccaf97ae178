// Core giveaway module - lifecycle, winner selection and the expiry sweep.

pub mod duration;
pub mod giveaway_models;
pub mod giveaway_service;
pub mod giveaway_sweeper;
pub mod winner_selector;

pub use duration::{format_duration, parse_duration};
pub use giveaway_models::*;
pub use giveaway_service::*;
pub use giveaway_sweeper::*;
pub use winner_selector::*;
