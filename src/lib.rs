//! A small blocking Rust client for the meteo.pl numerical forecast API.
//!
//! Give it an API key, a location and a [`ForecastConfig`] (model, grid and
//! the fields to fetch) and [`Client::get_forecast`] returns the forecast as a
//! [`ForecastResult`] keyed by timestamp.
//!
//! ## Quick start
//! - Configure the key via `METEO_API_KEY` or a `.meteorc` file (current
//!   directory or home directory), or pass it to [`Client::new`].
//! - Call [`Client::get_forecast`], optionally overriding the location or the
//!   config per call.
//!
//! ```no_run
//! use meteo_forecast::{Client, ForecastConfig, Model};
//!
//! fn main() -> meteo_forecast::Result<()> {
//!     let client = Client::from_env()?.with_location(52.2297, 21.0122);
//!
//!     // Built-in WRF config.
//!     let forecast = client.get_forecast(None, None, None)?;
//!     for (time, record) in forecast.iter() {
//!         println!("{time}: T2={:?}", record.get_f64("T2"));
//!     }
//!
//!     // A config passed per call replaces the default as a whole.
//!     let rain = ForecastConfig::new(Model::Wrf, "d01_XLONG_XLAT", [("RAINNC", 0)]);
//!     client.get_forecast(Some(50.0614), Some(19.9366), Some(&rain))?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
mod forecast;
mod grid;
mod request;
mod util;

pub use client::{Client, ClientConfig};
pub use error::{MeteoError, Result};
pub use forecast::{ForecastRecord, ForecastResult};
pub use grid::{Coordinates, GridPoint};
pub use request::{Field, ForecastConfig, Model};
