pub mod calc;
pub mod config;
pub mod drip;
pub mod error;
pub mod leads;
pub mod telemetry;
pub mod web;
