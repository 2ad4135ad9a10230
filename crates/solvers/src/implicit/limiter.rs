use std::ops::Range;

use nalgebra::DVector;
use ravel_core::{Bounds, Layout, StateVariable};

use super::IncrementLimits;

/// Clamps corrections and keeps state variables inside their physical bounds.
///
/// Limits are physical, so the bound on a normalized unknown component is
/// `max / f`.
#[derive(Debug, Clone)]
pub(super) struct Limiter {
    max: Option<DVector<f64>>,
    bounds: Vec<(Range<usize>, Bounds, f64)>,
}

impl Limiter {
    pub(super) fn new(
        layout: &Layout,
        variables: &[StateVariable],
        limits: &IncrementLimits,
    ) -> Self {
        let max = (!limits.is_empty()).then(|| {
            let mut max = DVector::from_element(layout.len(), f64::INFINITY);
            for variable in variables {
                if let Some(limit) = limits.for_variable(variable.name()) {
                    let range = layout.range(variable.name());
                    max.rows_mut(range.start, range.len())
                        .fill(limit / variable.normalization());
                }
            }
            max
        });

        let bounds = variables
            .iter()
            .filter(|variable| !variable.bounds().is_unbounded())
            .map(|variable| {
                (
                    layout.range(variable.name()),
                    variable.bounds(),
                    variable.normalization(),
                )
            })
            .collect();

        Self { max, bounds }
    }

    /// Clamps each component of `correction` to `±max`, keeping its sign.
    pub(super) fn limit(&self, correction: &mut DVector<f64>) {
        let Some(max) = &self.max else {
            return;
        };
        for (value, max) in correction.iter_mut().zip(max.iter()) {
            if value.abs() > *max {
                *value = max.copysign(*value);
            }
        }
    }

    /// Moves unknowns so that `start + f·z` lies inside the physical bounds.
    pub(super) fn clamp_to_bounds(&self, unknowns: &mut DVector<f64>, start: &DVector<f64>) {
        for (range, bounds, scale) in &self.bounds {
            for i in range.clone() {
                let end = start[i] + scale * unknowns[i];
                let clamped = bounds.clamp(end);
                if clamped != end {
                    unknowns[i] = (clamped - start[i]) / scale;
                }
            }
        }
    }
}
