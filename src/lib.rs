//! # slopebrain
//!
//! An online hierarchical sequence learner that forecasts the next value of a
//! numeric series.
//!
//! There is no separate training phase: every observation is encoded as a
//! quantized slope symbol, updates the model, and yields a prediction. Runs of
//! symbols that reliably follow each other are promoted into higher-level
//! pattern symbols, and every level votes on the next step.
//!
//! ## Quick Start
//!
//! ```
//! use slopebrain::prelude::*;
//!
//! let report = forecast(&[1.0, 2.0, 3.0, 4.0, 5.0], &ForecastConfig::default()).unwrap();
//! assert!(report.value_or_last() > 5.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `serde` (default): Enable serialization/deserialization
//! - `parallel`: Forecast batches of series on the rayon pool
//!
//! ## no_std Support
//!
//! Disable default features for `no_std` environments (an allocator is still
//! required):
//! ```toml
//! slopebrain = { version = "0.1", default-features = false }
//! ```
//!
//! ## Modules
//!
//! - [`substrate`]: The brain: activation, learning, prediction, elevation
//! - [`encoder`]: Slope encoder/decoder
//! - [`forecast`]: Series-in, forecast-out pipeline
//! - [`symbols`], [`transitions`], [`patterns`], [`context`]: Brain state
//! - [`observer`]: Read-only snapshots

// no_std support
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[path = "core/symbols.rs"]
pub mod symbols;

#[path = "core/transitions.rs"]
pub mod transitions;

#[path = "core/patterns.rs"]
pub mod patterns;

#[path = "core/context.rs"]
pub mod context;

#[path = "core/substrate.rs"]
pub mod substrate;

#[path = "core/encoder.rs"]
pub mod encoder;

#[path = "core/forecast.rs"]
pub mod forecast;

#[cfg(feature = "std")]
pub mod observer;

/// Prelude module for convenient imports.
///
/// ```
/// use slopebrain::prelude::*;
/// ```
pub mod prelude {
    pub use crate::encoder::{average_delta, SlopeEncoder};
    pub use crate::forecast::{
        forecast, forecast_many, ForecastConfig, ForecastError, ForecastReport, Forecaster,
        StepTrace,
    };
    pub use crate::substrate::{Brain, BrainConfig, Diagnostics, Prediction, SleepReport};
    pub use crate::symbols::{Symbol, SymbolId};
}
