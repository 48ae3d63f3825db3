//! Console report: top identifiers and current-hour pointer distance.

use chrono::{DateTime, Local};
use tracing::warn;

use crate::config::ScreenConfig;
use crate::core::{Bucket, CounterTable};
use crate::store::{Store, StoreError};

/// Physical screen description used to turn pixel travel into meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenGeometry {
    pub width_px: f64,
    pub height_px: f64,
    pub width_mm: f64,
    pub height_mm: f64,
}

impl ScreenGeometry {
    /// The fail-closed geometry: every field 1, so reported "meters" are
    /// really pixel-derived units until a calibration is configured.
    pub fn uncalibrated() -> Self {
        Self {
            width_px: 1.0,
            height_px: 1.0,
            width_mm: 1.0,
            height_mm: 1.0,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        *self != Self::uncalibrated()
    }
}

/// Where the report gets its screen geometry from. Providers never fail:
/// they fall back to [`ScreenGeometry::uncalibrated`] instead.
pub trait GeometryProvider {
    fn screen_geometry(&self) -> ScreenGeometry;
}

/// A fixed geometry is its own provider.
impl GeometryProvider for ScreenGeometry {
    fn screen_geometry(&self) -> ScreenGeometry {
        *self
    }
}

/// Geometry from the optional `screen` calibration block in the config
/// file. Missing or non-positive values fall back to uncalibrated.
#[derive(Debug, Clone, Default)]
pub struct ConfigGeometry {
    screen: Option<ScreenConfig>,
}

impl ConfigGeometry {
    pub fn new(screen: Option<ScreenConfig>) -> Self {
        Self { screen }
    }
}

impl GeometryProvider for ConfigGeometry {
    fn screen_geometry(&self) -> ScreenGeometry {
        let Some(screen) = &self.screen else {
            return ScreenGeometry::uncalibrated();
        };
        let geometry = ScreenGeometry {
            width_px: screen.width_px,
            height_px: screen.height_px,
            width_mm: screen.width_mm,
            height_mm: screen.height_mm,
        };
        let fields = [
            geometry.width_px,
            geometry.height_px,
            geometry.width_mm,
            geometry.height_mm,
        ];
        if fields.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            warn!("invalid screen calibration, reporting uncalibrated units");
            return ScreenGeometry::uncalibrated();
        }
        geometry
    }
}

/// Convert cumulative per-axis pixel travel into meters.
pub fn distance_meters(x_px: i64, y_px: i64, geometry: ScreenGeometry) -> f64 {
    let mm_per_px_x = geometry.width_mm / geometry.width_px;
    let mm_per_px_y = geometry.height_mm / geometry.height_px;
    let x_m = x_px as f64 * mm_per_px_x * 0.001;
    let y_m = y_px as f64 * mm_per_px_y * 0.001;
    (x_m * x_m + y_m * y_m).sqrt()
}

/// Print the standard report: top 5 keys, current-hour distance, top 5
/// mouse buttons.
pub fn print_report(
    store: &Store,
    geometry: &dyn GeometryProvider,
    now: DateTime<Local>,
) -> Result<(), StoreError> {
    let geometry = geometry.screen_geometry();

    println!("Top 5 keys:");
    for (id, count) in store.top_counters(CounterTable::Keyboard, 5)? {
        println!("  {id:<20} {count:>10}");
    }

    let bucket = Bucket::of(now);
    let meters = match store.distance_for(bucket)? {
        Some(row) => distance_meters(row.x, row.y, geometry),
        None => 0.0,
    };
    if geometry.is_calibrated() {
        println!("Mouse distance during current hour: {meters:.1} meters");
    } else {
        println!("Mouse distance during current hour: {meters:.1} meters (uncalibrated)");
    }

    println!("Top 5 mouse buttons:");
    for (id, count) in store.top_counters(CounterTable::Mouse, 5)? {
        println!("  {id:<20} {count:>10}");
    }
    Ok(())
}
