pub mod admin;
pub mod auth;
pub mod events;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod tickets;
