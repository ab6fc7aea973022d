// no_std support
#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::format;

use crate::substrate::{Brain, Prediction};
use crate::symbols::SymbolId;

/// Runs at or below this are treated as flat: no slope can be measured.
pub const FLAT_EPSILON: f64 = 1e-12;

#[cfg(feature = "std")]
mod math {
    #[inline]
    pub fn atan(x: f64) -> f64 {
        x.atan()
    }
    #[inline]
    pub fn tan(x: f64) -> f64 {
        x.tan()
    }
    #[inline]
    pub fn floor(x: f64) -> f64 {
        x.floor()
    }
    #[inline]
    pub fn ceil(x: f64) -> f64 {
        x.ceil()
    }
    #[inline]
    pub fn abs(x: f64) -> f64 {
        x.abs()
    }
}

#[cfg(not(feature = "std"))]
mod math {
    #[inline]
    pub fn atan(x: f64) -> f64 {
        libm::atan(x)
    }
    #[inline]
    pub fn tan(x: f64) -> f64 {
        libm::tan(x)
    }
    #[inline]
    pub fn floor(x: f64) -> f64 {
        libm::floor(x)
    }
    #[inline]
    pub fn ceil(x: f64) -> f64 {
        libm::ceil(x)
    }
    #[inline]
    pub fn abs(x: f64) -> f64 {
        libm::fabs(x)
    }
}

/// Mean absolute successive difference. Series shorter than two values use a
/// unit step.
pub fn average_delta(series: &[f64]) -> f64 {
    if series.len() <= 1 {
        return 1.0;
    }
    let sum: f64 = series.windows(2).map(|w| math::abs(w[1] - w[0])).sum();
    sum / (series.len() - 1) as f64
}

/// Maps value deltas to a bank of angle buckets spanning -90..=90 degrees and
/// back.
///
/// The run of the slope is the series' average step, so the bucket range
/// adapts to the typical magnitude of change instead of assuming unit steps.
#[derive(Debug, Clone)]
pub struct SlopeEncoder {
    granularity: u32,
    first: SymbolId,
    buckets: u32,
}

impl SlopeEncoder {
    pub const DEFAULT_GRANULARITY: u32 = 15;

    /// Define one base symbol per bucket in `brain` (named e.g. `-45deg`).
    ///
    /// `granularity` must evenly divide 180; the forecast config validates this.
    pub fn new(brain: &mut Brain, granularity: u32) -> Self {
        let granularity = granularity.clamp(1, 180);
        let buckets = 180 / granularity + 1;
        let mut first = 0;
        for i in 0..buckets {
            let angle = -90 + (i * granularity) as i32;
            let id = brain.define_symbol(&format!("{angle}deg"));
            if i == 0 {
                first = id;
            }
        }
        Self {
            granularity,
            first,
            buckets,
        }
    }

    pub fn granularity(&self) -> u32 {
        self.granularity
    }

    pub fn bucket_count(&self) -> u32 {
        self.buckets
    }

    /// Bucket index (0 = -90deg) of a base symbol owned by this encoder.
    pub fn bucket_of(&self, symbol: SymbolId) -> Option<u32> {
        let idx = symbol.checked_sub(self.first)?;
        (idx < self.buckets).then_some(idx)
    }

    /// Center angle of a base symbol's bucket, in degrees.
    pub fn angle_of(&self, symbol: SymbolId) -> Option<f64> {
        self.bucket_of(symbol)
            .map(|idx| -90.0 + (idx * self.granularity) as f64)
    }

    /// Nearest bucket for an angle in degrees, measured against the bank
    /// itself so granularities that do not divide 90 (no `0deg` bucket) still
    /// land on the closest center. Ties round away from zero so rising and
    /// falling slopes quantize symmetrically; a flat step under such a bank
    /// reads as `+g/2`.
    pub fn symbol_for_angle(&self, degrees: f64) -> SymbolId {
        let degrees = if degrees.is_finite() {
            degrees.clamp(-90.0, 90.0)
        } else {
            0.0
        };
        let pos = (degrees + 90.0) / self.granularity as f64;
        let idx = if degrees >= 0.0 {
            math::floor(pos + 0.5)
        } else {
            math::ceil(pos - 0.5)
        };
        let idx = (idx as i64).clamp(0, self.buckets as i64 - 1);
        self.first + idx as SymbolId
    }

    /// Slope angle between two consecutive values, in degrees. A degenerate run
    /// or a non-finite ratio reads as flat.
    pub fn slope_degrees(current: f64, previous: f64, avg_delta: f64) -> f64 {
        let rise = current - previous;
        if !(avg_delta > FLAT_EPSILON) || !rise.is_finite() {
            return 0.0;
        }
        let degrees = math::atan(rise / avg_delta).to_degrees();
        if degrees.is_finite() {
            degrees
        } else {
            0.0
        }
    }

    pub fn encode(&self, current: f64, previous: f64, avg_delta: f64) -> SymbolId {
        self.symbol_for_angle(Self::slope_degrees(current, previous, avg_delta))
    }

    /// Forecast from a prediction: each candidate is reduced to its base
    /// bucket, the bucket angles are averaged with the candidate scores as
    /// weights, and the mean angle is turned back into a delta.
    pub fn decode(
        &self,
        brain: &Brain,
        prediction: &Prediction,
        last_value: f64,
        avg_delta: f64,
    ) -> Option<f64> {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for (symbol, score) in prediction.iter() {
            let Some(angle) = brain.base_of(symbol).and_then(|b| self.angle_of(b)) else {
                continue;
            };
            if !(score > 0.0) {
                continue;
            }
            weighted += angle * score;
            total += score;
        }
        if !(total > 0.0) {
            return None;
        }
        Some(last_value + self.delta_for_angle(weighted / total, avg_delta))
    }

    /// Forecast assuming the single bucket `symbol` (or its base) comes next.
    pub fn decode_symbol(
        &self,
        brain: &Brain,
        symbol: SymbolId,
        last_value: f64,
        avg_delta: f64,
    ) -> Option<f64> {
        let angle = brain.base_of(symbol).and_then(|b| self.angle_of(b))?;
        Some(last_value + self.delta_for_angle(angle, avg_delta))
    }

    /// Delta for an angle. The end buckets hold every slope steeper than their
    /// inner edge, so angles are capped at `90 - g/2`; `tan(90deg)` would read
    /// as an effectively unbounded jump.
    fn delta_for_angle(&self, degrees: f64, avg_delta: f64) -> f64 {
        if !(avg_delta > FLAT_EPSILON) {
            return 0.0;
        }
        let limit = 90.0 - self.granularity as f64 / 2.0;
        math::tan(degrees.clamp(-limit, limit).to_radians()) * avg_delta
    }

    /// Closeness of a predicted symbol to the observed one, in percent:
    /// 100 for the same bucket, falling linearly to 0 at opposite ends.
    pub fn accuracy(&self, brain: &Brain, predicted: SymbolId, actual: SymbolId) -> Option<f64> {
        let p = brain.base_of(predicted).and_then(|b| self.bucket_of(b))?;
        let a = brain.base_of(actual).and_then(|b| self.bucket_of(b))?;
        let span = (self.buckets - 1).max(1) as f64;
        Some((100.0 - 100.0 * p.abs_diff(a) as f64 / span).max(0.0))
    }
}
