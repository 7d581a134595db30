//! Client for the Dark Sky compatible weather forecast API.
//!
//! This crate provides:
//! - `WeatherProvider`, the port the capture pipeline reads weather through
//! - `WeatherClient`, an HTTP implementation with short-lived memoization
//! - Mapping from the forecast JSON to `lapse_models::WeatherSnapshot`

pub mod client;
pub mod error;
pub mod types;

pub use client::{WeatherClient, WeatherClientConfig, WeatherProvider};
pub use error::{WeatherError, WeatherResult};
pub use types::ForecastResponse;
