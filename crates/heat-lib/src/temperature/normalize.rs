//! Usage normalization

use crate::error::Result;
use crate::models::NormalizedValue;

/// Share of `total` used by `partial`, scaled to [0, 10]
///
/// A zero total has no meaningful share, so it normalizes to zero instead of
/// dividing by it. Ratios that fall outside the range (negative usage, or a
/// part larger than the whole) are reported rather than clamped.
pub fn normalize(partial: f64, total: f64) -> Result<NormalizedValue> {
    if total == 0.0 {
        return Ok(NormalizedValue::ZERO);
    }
    NormalizedValue::new(partial / total * NormalizedValue::MAX)
}
