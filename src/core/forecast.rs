// no_std support
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{string::String, string::ToString, vec::Vec};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::encoder::{average_delta, SlopeEncoder};
use crate::substrate::{Brain, BrainConfig, Diagnostics};
use crate::symbols::SymbolId;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ForecastConfig {
    pub brain: BrainConfig,
    /// Encoder bucket width in degrees. Must evenly divide 180.
    pub granularity: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            brain: BrainConfig::default(),
            granularity: SlopeEncoder::DEFAULT_GRANULARITY,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        self.brain.validate()?;
        if self.granularity == 0 || self.granularity > 180 || 180 % self.granularity != 0 {
            return Err("granularity must evenly divide 180");
        }
        Ok(())
    }

    pub fn with_granularity(mut self, granularity: u32) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_brain(mut self, brain: BrainConfig) -> Self {
        self.brain = brain;
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ForecastError {
    #[error("Need at least 2 numbers for forecasting")]
    TooFewPoints { got: usize },
    #[error("value at index {index} is not a finite number")]
    NonFinite { index: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// What happened at one encoded step of the series.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StepTrace {
    /// Index of the value that closed this step (`series[index - 1] -> series[index]`).
    pub index: usize,
    pub symbol: String,
    /// Best candidate for the next step after this activation.
    pub predicted: Option<String>,
    /// How close the previous step's best candidate was to this step's symbol.
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastReport {
    /// `None` when the model had no trusted evidence for the next step.
    pub forecast: Option<f64>,
    pub last_value: f64,
    pub avg_delta: f64,
    pub mean_accuracy: Option<f64>,
    pub steps: Vec<StepTrace>,
    pub diagnostics: Diagnostics,
}

impl ForecastReport {
    /// The forecast, or the last observed value when there was none.
    pub fn value_or_last(&self) -> f64 {
        self.forecast.unwrap_or(self.last_value)
    }

    pub fn is_fallback(&self) -> bool {
        self.forecast.is_none()
    }
}

/// A brain wired to a slope encoder.
///
/// [`forecast`] builds a fresh one per call. Keeping a `Forecaster` around and
/// calling [`Forecaster::run`] again continues learning on the same brain.
#[derive(Debug, Clone)]
pub struct Forecaster {
    brain: Brain,
    encoder: SlopeEncoder,
}

impl Forecaster {
    pub fn new(cfg: &ForecastConfig) -> Result<Self, ForecastError> {
        cfg.validate().map_err(ForecastError::InvalidConfig)?;
        let mut brain = Brain::new(cfg.brain.clone());
        let encoder = SlopeEncoder::new(&mut brain, cfg.granularity);
        Ok(Self { brain, encoder })
    }

    pub fn brain(&self) -> &Brain {
        &self.brain
    }

    pub fn brain_mut(&mut self) -> &mut Brain {
        &mut self.brain
    }

    pub fn encoder(&self) -> &SlopeEncoder {
        &self.encoder
    }

    /// Feed every step of `series` through the brain and decode the final
    /// prediction into a forecast for the value after the last one.
    pub fn run(&mut self, series: &[f64]) -> Result<ForecastReport, ForecastError> {
        if series.len() < 2 {
            return Err(ForecastError::TooFewPoints { got: series.len() });
        }
        if let Some(index) = series.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::NonFinite { index });
        }

        let avg_delta = average_delta(series);
        let mut steps = Vec::with_capacity(series.len() - 1);
        let mut prediction = None;
        let mut expected: Option<SymbolId> = None;

        for index in 1..series.len() {
            let actual = self.encoder.encode(series[index], series[index - 1], avg_delta);
            let accuracy = expected.and_then(|p| self.encoder.accuracy(&self.brain, p, actual));

            prediction = self.brain.activate(actual);
            expected = prediction.as_ref().and_then(|p| p.best()).map(|(s, _)| s);

            steps.push(StepTrace {
                index,
                symbol: self.name(actual),
                predicted: expected.map(|s| self.name(s)),
                accuracy,
            });
        }

        let last_value = series[series.len() - 1];
        let forecast = prediction
            .as_ref()
            .and_then(|p| self.encoder.decode(&self.brain, p, last_value, avg_delta));

        let scored: Vec<f64> = steps.iter().filter_map(|s| s.accuracy).collect();
        let mean_accuracy =
            (!scored.is_empty()).then(|| scored.iter().sum::<f64>() / scored.len() as f64);

        Ok(ForecastReport {
            forecast,
            last_value,
            avg_delta,
            mean_accuracy,
            steps,
            diagnostics: self.brain.diagnostics(),
        })
    }

    fn name(&self, id: SymbolId) -> String {
        self.brain.symbol_name(id).unwrap_or("?").to_string()
    }
}

/// Forecast the value following `series` with a fresh brain.
pub fn forecast(series: &[f64], cfg: &ForecastConfig) -> Result<ForecastReport, ForecastError> {
    Forecaster::new(cfg)?.run(series)
}

/// Forecast several independent series. Each gets its own brain, so with the
/// `parallel` feature they run concurrently on the rayon pool.
pub fn forecast_many(
    series: &[Vec<f64>],
    cfg: &ForecastConfig,
) -> Vec<Result<ForecastReport, ForecastError>> {
    #[cfg(feature = "parallel")]
    {
        series.par_iter().map(|s| forecast(s, cfg)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        series.iter().map(|s| forecast(s, cfg)).collect()
    }
}
