pub mod events;
pub mod form;
pub mod poll;
pub mod record;
pub mod user;
pub mod websocket;
