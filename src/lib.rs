//! classboard: control panel for a classification service.
//!
//! Submits feature vectors for prediction, shows the predicted label and
//! confidence, and keeps a set of charts and an activity table in sync with
//! the service's aggregated statistics.
//!
//! - [`stats`] parses the stats payload; [`stats::metrics`] derives summary numbers.
//! - [`charts`] owns live chart instances behind the [`charts::RenderTarget`] capability.
//! - [`service`] talks to the prediction service.
//! - [`dashboard`] ties them together in the refresh / predict / clear flows.

pub mod charts;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod service;
pub mod stats;

pub use error::{DashboardError, Result};
