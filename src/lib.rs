//! Monthly energy bill prediction service.
//!
//! Loads a fitted scaler and regression model once at startup and serves
//! `POST /predict`, turning home attributes plus a month into a predicted
//! bill.

pub mod artifacts;
pub mod config;
pub mod logging;
pub mod model;
pub mod predict;
pub mod server;
pub mod weather;
