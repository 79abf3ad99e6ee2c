//! The `taskpad` library crate.
//!
//! Contains the domain models, authentication, account emails, routing
//! configuration, and error handling for the Taskpad API. The binary in
//! `main.rs` wires these together into a running server.

pub mod auth;
pub mod config;
pub mod error;
pub mod mailer;
pub mod models;
pub mod routes;
