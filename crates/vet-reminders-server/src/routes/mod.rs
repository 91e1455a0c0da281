pub mod events;
pub mod health;
pub mod history;
pub mod templates;
pub mod triggers;
