//! Catastro API Service Library
//!
//! HTTP gateway exposing the Catastro OVC lookups and the INSPIRE cadastral
//! parcels WFS as a set of typed tools.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod state;
pub mod tools;
pub mod upstream;
