pub mod api;
pub mod config;
pub mod error;
pub mod handlers;
pub mod host;
pub mod ledger;
pub mod models;
pub mod scheduler;
pub mod sequencer;
pub mod store;
pub mod view;
pub mod websocket;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{FieldErrors, PollError};
pub use handlers::PollApp;
