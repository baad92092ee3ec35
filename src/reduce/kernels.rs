//! Parallel computation kernels for masked (NaN-skipping) reductions
//!
//! Data is rearranged so the reduced axes are innermost and flattened into
//! rows; each output cell is then one row, computed in parallel.

use super::operations::CollapseMethod;
use crate::errors::{MonitorError, Result};
use ndarray::{ArrayD, IxDyn};
use rayon::prelude::*;
use tracing::debug;

/// Flattens `array` with `reduced` axes moved innermost.
///
/// Returns the kept shape and the data in row order.
fn to_rows(array: &ArrayD<f64>, reduced: &[usize]) -> (Vec<usize>, Vec<f64>) {
    let kept: Vec<usize> = (0..array.ndim()).filter(|i| !reduced.contains(i)).collect();
    let kept_shape: Vec<usize> = kept.iter().map(|&i| array.shape()[i]).collect();
    let mut order = kept;
    order.extend_from_slice(reduced);
    let flat: Vec<f64> = array
        .view()
        .permuted_axes(IxDyn(&order))
        .iter()
        .copied()
        .collect();
    (kept_shape, flat)
}

fn reduce_row(values: &[f64], weights: Option<&[f64]>, method: CollapseMethod) -> f64 {
    let valid = values.iter().enumerate().filter_map(|(i, &x)| {
        let w = weights.map_or(1.0, |w| w[i]);
        (x.is_finite() && w.is_finite()).then_some((x, w))
    });

    match method {
        CollapseMethod::Mean => {
            let (sum, weight) = valid.fold((0.0, 0.0), |(s, ws), (x, w)| (s + x * w, ws + w));
            if weight != 0.0 {
                sum / weight
            } else {
                f64::NAN
            }
        }
        CollapseMethod::Sum => {
            let mut any = false;
            let total = valid.fold(0.0, |acc, (x, w)| {
                any = true;
                acc + x * w
            });
            if any {
                total
            } else {
                f64::NAN
            }
        }
        // An integral over no cells is zero
        CollapseMethod::Integral => valid.fold(0.0, |acc, (x, w)| acc + x * w),
        CollapseMethod::Maximum => valid
            .map(|(x, _)| x)
            .fold(None, |acc: Option<f64>, x| Some(acc.map_or(x, |m| m.max(x))))
            .unwrap_or(f64::NAN),
    }
}

/// Reduces `data` over `axes` with optional same-shape `weights`
///
/// Missing (non-finite) data or weights are skipped; an output cell with no
/// valid contributions is NaN, except for integrals where it is zero.
///
/// # Errors
///
/// Returns an error if an axis is out of bounds or the weights do not
/// match the data shape.
pub fn reduce_axes(
    data: &ArrayD<f64>,
    axes: &[usize],
    method: CollapseMethod,
    weights: Option<&ArrayD<f64>>,
) -> Result<ArrayD<f64>> {
    if let Some(&bad) = axes.iter().find(|&&a| a >= data.ndim()) {
        return Err(MonitorError::Reduction(format!(
            "Axis {bad} is out of bounds for array with {} dimensions",
            data.ndim()
        )));
    }
    if let Some(w) = weights {
        if w.shape() != data.shape() {
            return Err(MonitorError::Reduction(format!(
                "weights of shape {:?} do not match data of shape {:?}",
                w.shape(),
                data.shape()
            )));
        }
    }

    let mut reduced: Vec<usize> = axes.to_vec();
    reduced.sort_unstable();
    reduced.dedup();

    let (kept_shape, flat) = to_rows(data, &reduced);
    let flat_weights = weights.map(|w| to_rows(w, &reduced).1);
    let row_len: usize = reduced.iter().map(|&i| data.shape()[i]).product();
    let rows: usize = kept_shape.iter().product();

    debug!(
        "Processing {} output cells x {} values across {} threads",
        rows,
        row_len,
        rayon::current_num_threads()
    );

    let result: Vec<f64> = (0..rows)
        .into_par_iter()
        .map(|r| {
            let span = r * row_len..(r + 1) * row_len;
            reduce_row(
                &flat[span.clone()],
                flat_weights.as_ref().map(|w| &w[span]),
                method,
            )
        })
        .collect();

    Ok(ArrayD::from_shape_vec(kept_shape, result)?)
}

/// Broadcasts `weights` (laid out over `weight_axes` positions of the
/// data) to the full data shape.
///
/// # Errors
///
/// Returns an error if the weight shape does not match those axes.
pub fn broadcast_weights(
    weights: &ArrayD<f64>,
    weight_axes: &[usize],
    data_shape: &[usize],
) -> Result<ArrayD<f64>> {
    if weight_axes.iter().any(|&i| i >= data_shape.len()) {
        return Err(MonitorError::Reduction(format!(
            "weight axes {weight_axes:?} exceed data rank {}",
            data_shape.len()
        )));
    }
    let expected: Vec<usize> = weight_axes.iter().map(|&i| data_shape[i]).collect();
    if weights.shape() != expected.as_slice() {
        return Err(MonitorError::Reduction(format!(
            "weights of shape {:?} do not match data axes of shape {:?}",
            weights.shape(),
            expected
        )));
    }

    // Put the weight axes in increasing data order, then insert the rest
    let mut order: Vec<usize> = (0..weight_axes.len()).collect();
    order.sort_by_key(|&k| weight_axes[k]);
    let sorted_axes: Vec<usize> = order.iter().map(|&k| weight_axes[k]).collect();
    let mut expanded = weights.view().permuted_axes(IxDyn(&order)).to_owned();
    for i in 0..data_shape.len() {
        if !sorted_axes.contains(&i) {
            expanded = expanded.insert_axis(ndarray::Axis(i));
        }
    }
    let view = expanded.broadcast(IxDyn(data_shape)).ok_or_else(|| {
        MonitorError::Reduction(format!("cannot broadcast weights to {data_shape:?}"))
    })?;
    Ok(view.to_owned())
}
