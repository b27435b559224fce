mod health;
mod link;

pub use health::health_handler;
pub use link::{delete_handler, encode_handler, info_handler, not_found_handler, redirect_handler};
