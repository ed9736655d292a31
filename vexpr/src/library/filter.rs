//! Digital filters
//!
//! Direct-form IIR application, zero-phase forward/backward filtering and
//! windowed-sinc FIR design.

use crate::context::{ParamType, Registry};
use crate::error::{EngineError, Result};
use crate::interp::Value;
use std::f64::consts::PI;

/// Leading feedback coefficients below this magnitude count as zero
const MIN_LEADING_COEFFICIENT: f64 = 1e-8;

/// Largest half-order chosen by the convenience filters
const MAX_HALF_ORDER: usize = 250;

const TOO_SHORT: &str =
    "Input data too short! Data must have length more than 3 times filter order.";

/// Normalize by `a[0]` and pad both coefficient vectors to the filter length
fn normalize(b: &[f64], a: &[f64]) -> Result<(Vec<f64>, Vec<f64>)> {
    let Some(&a0) = a.first() else {
        return Err(EngineError::new("the feedback filter coefficients are empty"));
    };
    if a0.abs() < MIN_LEADING_COEFFICIENT {
        return Err(EngineError::new(
            "the first feedback filter coefficient has to be non-zero",
        ));
    }

    let len = a.len().max(b.len());
    let pad = |v: &[f64]| {
        let mut out: Vec<f64> = v.iter().map(|c| c / a0).collect();
        out.resize(len, 0.0);
        out
    };
    Ok((pad(b), pad(a)))
}

/// Filter `x` with initial state `zi` (transposed direct form II)
///
/// `zi` is padded with zeros or truncated to the filter length.
pub fn apply_filter(b: &[f64], a: &[f64], x: &[f64], zi: &[f64]) -> Result<Vec<f64>> {
    let (b, a) = normalize(b, a)?;
    let n = b.len();

    let mut z = zi.to_vec();
    z.resize(n, 0.0);

    let mut y = Vec::with_capacity(x.len());
    for &xi in x {
        let yi = b[0] * xi + z[0];
        for k in 0..n - 1 {
            z[k] = b[k + 1] * xi - a[k + 1] * yi + z[k + 1];
        }
        z[n - 1] = 0.0;
        y.push(yi);
    }
    Ok(y)
}

/// Filter `x` starting from rest
pub fn filter(b: &[f64], a: &[f64], x: &[f64]) -> Result<Vec<f64>> {
    apply_filter(b, a, x, &[])
}

/// Initial state for which a unit step input is already in steady state
fn steady_state(b: &[f64], a: &[f64]) -> Vec<f64> {
    let n = b.len();
    let kdc = b.iter().sum::<f64>() / a.iter().sum::<f64>();
    if !kdc.is_finite() {
        return vec![0.0; n.saturating_sub(1)];
    }

    let mut si: Vec<f64> = b
        .iter()
        .zip(a)
        .rev()
        .scan(0.0, |acc, (bi, ai)| {
            *acc += bi - kdc * ai;
            Some(*acc)
        })
        .collect();
    si.reverse();
    si.remove(0);
    si
}

/// Zero-phase filtering: forward, then backward over the reversed output
///
/// Both ends of `x` are extended by an odd reflection of three times the
/// filter length to suppress start-up transients.
pub fn filtfilt(b: &[f64], a: &[f64], x: &[f64]) -> Result<Vec<f64>> {
    let (b, a) = normalize(b, a)?;
    let padlen = 3 * b.len();
    if x.len() <= padlen {
        return Err(EngineError::new(TOO_SHORT));
    }

    let si = steady_state(&b, &a);
    let (first, last) = (x[0], x[x.len() - 1]);

    let mut v = Vec::with_capacity(x.len() + 2 * padlen);
    v.extend(x[1..=padlen].iter().rev().map(|xi| 2.0 * first - xi));
    v.extend_from_slice(x);
    v.extend(x[x.len() - 1 - padlen..x.len() - 1].iter().rev().map(|xi| 2.0 * last - xi));

    let scaled = |s: f64| si.iter().map(|c| c * s).collect::<Vec<_>>();

    let forward = apply_filter(&b, &a, &v, &scaled(v[0]))?;
    let seed = scaled(forward[forward.len() - 1]);
    let mut reversed = forward;
    reversed.reverse();
    let mut backward = apply_filter(&b, &a, &reversed, &seed)?;
    backward.reverse();

    Ok(backward[padlen..padlen + x.len()].to_vec())
}

// ============================================================================
// FIR design
// ============================================================================

fn hamming(taps: usize) -> Vec<f64> {
    if taps == 1 {
        return vec![1.0];
    }
    let m = (taps - 1) as f64;
    (0..taps)
        .map(|k| 0.54 - 0.46 * (2.0 * PI * k as f64 / m).cos())
        .collect()
}

fn sinc(t: f64) -> f64 {
    if t == 0.0 { 1.0 } else { (PI * t).sin() / (PI * t) }
}

/// Unit impulse at the center of a `2 * half_order + 1` tap filter
fn impulse(half_order: usize) -> Vec<f64> {
    let mut c = vec![0.0; 2 * half_order + 1];
    c[half_order] = 1.0;
    c
}

/// Hamming-windowed sinc with `2 * half_order + 1` taps, scaled to unity gain at DC
fn windowed_sinc(cutoff: f64, sampling_rate: f64, half_order: usize) -> Vec<f64> {
    let nu = 2.0 * cutoff / sampling_rate;
    let window = hamming(2 * half_order + 1);
    let mut c: Vec<f64> = window
        .iter()
        .enumerate()
        .map(|(k, w)| nu * sinc(nu * (k as f64 - half_order as f64)) * w)
        .collect();

    let sum: f64 = c.iter().sum();
    if sum != 0.0 {
        c.iter_mut().for_each(|v| *v /= sum);
    }
    c
}

/// Windowed-sinc low pass with `2 * half_order + 1` taps and gain `dc_gain` at DC
pub fn low_pass(
    cutoff: f64,
    sampling_rate: f64,
    half_order: usize,
    dc_gain: f64,
) -> Result<Vec<f64>> {
    if !(dc_gain > 0.0 && dc_gain.is_finite()) {
        return Err(EngineError::new(format!(
            "the DC gain has to be positive, got {dc_gain}"
        )));
    }
    let mut c = windowed_sinc(cutoff, sampling_rate, half_order);
    c.iter_mut().for_each(|v| *v *= dc_gain);
    Ok(c)
}

/// Spectral inversion of the unity-gain low pass
pub fn high_pass(cutoff: f64, sampling_rate: f64, half_order: usize) -> Vec<f64> {
    let lp = windowed_sinc(cutoff, sampling_rate, half_order);
    impulse(half_order)
        .iter()
        .zip(&lp)
        .map(|(d, l)| d - l)
        .collect()
}

/// Low pass below `low` plus high pass above `high`
pub fn band_stop(low: f64, high: f64, sampling_rate: f64, half_order: usize) -> Vec<f64> {
    let lp = windowed_sinc(low, sampling_rate, half_order);
    let hp = high_pass(high, sampling_rate, half_order);
    lp.iter().zip(&hp).map(|(l, h)| l + h).collect()
}

/// Spectral inversion of the band stop
pub fn band_pass(low: f64, high: f64, sampling_rate: f64, half_order: usize) -> Vec<f64> {
    let bs = band_stop(low, high, sampling_rate, half_order);
    impulse(half_order)
        .iter()
        .zip(&bs)
        .map(|(d, s)| d - s)
        .collect()
}

/// Largest half-order whose filter still satisfies the `filtfilt` length requirement
pub fn zero_phase_half_order(signal_len: usize) -> Result<usize> {
    // 2 * half + 1 taps, and filtfilt needs len > 3 * taps
    let half = (signal_len.saturating_sub(4) / 6).min(MAX_HALF_ORDER);
    if half == 0 {
        return Err(EngineError::new(TOO_SHORT));
    }
    Ok(half)
}

fn half_order(value: &Value) -> Result<usize> {
    let order = value.number()?.round_ties_even();
    if !(0.0..=1e6).contains(&order) {
        return Err(EngineError::new(format!(
            "filter order {order} is out of range"
        )));
    }
    Ok(order as usize)
}

// ============================================================================
// Bindings
// ============================================================================

/// Bind the filter functions into any host's registry
pub fn register<H: 'static>(registry: &mut Registry<H>) {
    use ParamType::{Number, NumberArray};

    registry
        .method("filter", true, &[NumberArray, NumberArray], |_, args| {
            filter(args[0].numbers()?, &[1.0], args[1].numbers()?).map(Value::NumberArray)
        })
        .method(
            "filter",
            true,
            &[NumberArray, NumberArray, NumberArray],
            |_, args| {
                filter(args[0].numbers()?, args[1].numbers()?, args[2].numbers()?)
                    .map(Value::NumberArray)
            },
        )
        .method(
            "filter",
            true,
            &[NumberArray, NumberArray, NumberArray, NumberArray],
            |_, args| {
                apply_filter(
                    args[0].numbers()?,
                    args[1].numbers()?,
                    args[2].numbers()?,
                    args[3].numbers()?,
                )
                .map(Value::NumberArray)
            },
        )
        .method("filtfilt", true, &[NumberArray, NumberArray], |_, args| {
            filtfilt(args[0].numbers()?, &[1.0], args[1].numbers()?).map(Value::NumberArray)
        })
        .method(
            "filtfilt",
            true,
            &[NumberArray, NumberArray, NumberArray],
            |_, args| {
                filtfilt(args[0].numbers()?, args[1].numbers()?, args[2].numbers()?)
                    .map(Value::NumberArray)
            },
        );

    registry
        .method(
            "LowPassFIRCoefficients",
            true,
            &[Number, Number, Number],
            |_, args| {
                let c = windowed_sinc(args[0].number()?, args[1].number()?, half_order(&args[2])?);
                Ok(Value::NumberArray(c))
            },
        )
        .method(
            "LowPassFIRCoefficients",
            true,
            &[Number, Number, Number, Number],
            |_, args| {
                low_pass(
                    args[0].number()?,
                    args[1].number()?,
                    half_order(&args[2])?,
                    args[3].number()?,
                )
                .map(Value::NumberArray)
            },
        )
        .method(
            "HighPassFIRCoefficients",
            true,
            &[Number, Number, Number],
            |_, args| {
                let c = high_pass(args[0].number()?, args[1].number()?, half_order(&args[2])?);
                Ok(Value::NumberArray(c))
            },
        )
        .method(
            "BandPassFIRCoefficients",
            true,
            &[Number, Number, Number, Number],
            |_, args| {
                let c = band_pass(
                    args[0].number()?,
                    args[1].number()?,
                    args[2].number()?,
                    half_order(&args[3])?,
                );
                Ok(Value::NumberArray(c))
            },
        )
        .method(
            "BandStopFIRCoefficients",
            true,
            &[Number, Number, Number, Number],
            |_, args| {
                let c = band_stop(
                    args[0].number()?,
                    args[1].number()?,
                    args[2].number()?,
                    half_order(&args[3])?,
                );
                Ok(Value::NumberArray(c))
            },
        );

    registry
        .method("LowPass", true, &[NumberArray, Number, Number], |_, args| {
            let signal = args[0].numbers()?;
            let half = zero_phase_half_order(signal.len())?;
            let b = windowed_sinc(args[1].number()?, args[2].number()?, half);
            filtfilt(&b, &[1.0], signal).map(Value::NumberArray)
        })
        .method("HighPass", true, &[NumberArray, Number, Number], |_, args| {
            let signal = args[0].numbers()?;
            let half = zero_phase_half_order(signal.len())?;
            let b = high_pass(args[1].number()?, args[2].number()?, half);
            filtfilt(&b, &[1.0], signal).map(Value::NumberArray)
        })
        .method(
            "BandPass",
            true,
            &[NumberArray, Number, Number, Number],
            |_, args| {
                let signal = args[0].numbers()?;
                let half = zero_phase_half_order(signal.len())?;
                let b = band_pass(args[1].number()?, args[2].number()?, args[3].number()?, half);
                filtfilt(&b, &[1.0], signal).map(Value::NumberArray)
            },
        )
        .method(
            "BandStop",
            true,
            &[NumberArray, Number, Number, Number],
            |_, args| {
                let signal = args[0].numbers()?;
                let half = zero_phase_half_order(signal.len())?;
                let b = band_stop(args[1].number()?, args[2].number()?, args[3].number()?, half);
                filtfilt(&b, &[1.0], signal).map(Value::NumberArray)
            },
        );
}
