//! User management: a REST API over a user record store and the client-side
//! state controller that drives the front end.

pub mod app;
pub mod client;
pub mod config;
pub mod error;
pub mod state;
pub mod users;
