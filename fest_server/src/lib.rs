//! # Fest order server
//! HTTP front end for the fest fulfillment engine. It is responsible for:
//! * Verifying the caller's identity claims and applying role-based access control.
//! * Exposing cart, checkout, order query and administrative endpoints.
//! * Wiring the engine's event hooks to the notification webhook.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! Apart from `/health`, every route lives under `/api` and requires signed identity claims. See [routes] for the
//! full list.
pub mod auth;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod notifier;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
