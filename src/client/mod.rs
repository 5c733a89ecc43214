//! Front-end state handling for the user list screen.

pub mod api;
pub mod controller;
pub mod state;

pub use api::{ClientError, HttpUsersApi, LocalUsersApi, UsersApi};
pub use controller::Controller;
pub use state::{Action, Effect, ViewState};
