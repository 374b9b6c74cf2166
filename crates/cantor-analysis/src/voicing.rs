//! Maximum voiced extent: lag search and propagation.
//!
//! ## Lag search
//!
//! For a period with length `T` centred at `c`, the detection window covers
//! `D = ceil(3T)` samples either side of `c`. Over that window:
//!
//! 1. **Difference function** - d(τ) = Σ(x[j] - x[j+τ])², τ ∈ 1..=min(ceil(1.5T), D)
//! 2. **Cumulative mean normalized difference** - d'(τ)
//! 3. **Absolute threshold** - first local minimum of d'(τ) below the
//!    threshold in τ ∈ [T/2, 1.5T], else the global minimum if below 0.5
//!
//! The extent is then grown symmetrically around `c` for as long as every
//! prefix stays periodic at that lag (error ≤ threshold × energy).
//!
//! ## Propagation
//!
//! Transitional periods inherit at least the extent of the previous
//! voiced/transitional period; voiced periods keep theirs, unvoiced ones are
//! never touched.

use cantor_core::{Device, Executor, RaggedArray, VoicingClass};

use crate::{PeriodRef, PeriodTable, Result, SourcePeriod};

const MIN_ENERGY: f64 = 1e-12;

/// Fallback acceptance for the global minimum of d'(τ).
const FALLBACK_APERIODICITY: f32 = 0.5;

/// YIN difference function over `[lo, hi)` for τ in `1..=max_lag`.
///
/// Only sample pairs that both lie inside `x` contribute. Index 0 is unused.
fn difference(x: &[f32], lo: usize, hi: usize, max_lag: usize) -> Vec<f32> {
    let mut d = vec![0.0f32; max_lag + 1];
    for (tau, slot) in d.iter_mut().enumerate().skip(1) {
        let end = hi.min(x.len().saturating_sub(tau));
        let mut sum = 0.0f64;
        for j in lo..end {
            let diff = (x[j] - x[j + tau]) as f64;
            sum += diff * diff;
        }
        *slot = sum as f32;
    }
    d
}

/// d'(τ) = d(τ) / ((1/τ) Σ_{j=1..τ} d(j)), d'(0) = 1.
fn cumulative_mean(d: &[f32]) -> Vec<f32> {
    let mut cmnd = vec![1.0f32; d.len()];
    let mut running_sum = 0.0f32;
    for tau in 1..d.len() {
        running_sum += d[tau];
        if running_sum > 1e-10 {
            cmnd[tau] = d[tau] * tau as f32 / running_sum;
        }
    }
    cmnd
}

/// First local minimum below `threshold`, else the global minimum if it is
/// clearly periodic. `None` when nothing qualifies.
fn best_lag(cmnd: &[f32], min_lag: usize, max_lag: usize, threshold: f32) -> Option<usize> {
    if min_lag > max_lag || max_lag >= cmnd.len() {
        return None;
    }

    let mut tau = min_lag;
    while tau < max_lag {
        if cmnd[tau] < threshold {
            while tau < max_lag && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            return Some(tau);
        }
        tau += 1;
    }

    let mut best_tau = min_lag;
    let mut best_val = cmnd[min_lag];
    for (t, &val) in cmnd.iter().enumerate().take(max_lag + 1).skip(min_lag + 1) {
        if val < best_val {
            best_val = val;
            best_tau = t;
        }
    }

    (best_val < FALLBACK_APERIODICITY).then_some(best_tau)
}

/// Largest `k <= limit` such that every window `|j| < k` around `center`
/// spanning at least one lag repeats at `lag` within `threshold`.
fn periodic_extent(x: &[f32], center: usize, lag: usize, limit: usize, threshold: f32) -> usize {
    let len = x.len() as isize;
    let c = center as isize;
    let lag = lag as isize;
    let threshold = threshold as f64;

    let accumulate = |j: isize, error: &mut f64, energy: &mut f64| {
        let a = c + j;
        let b = a + lag;
        if a >= 0 && b < len {
            let xa = x[a as usize] as f64;
            let xb = x[b as usize] as f64;
            *error += (xa - xb) * (xa - xb);
            *energy += xa * xa + xb * xb;
        }
    };

    let mut error = 0.0f64;
    let mut energy = 0.0f64;
    let mut extent = 0;
    for k in 1..=limit {
        let j = (k - 1) as isize;
        accumulate(j, &mut error, &mut energy);
        if j > 0 {
            accumulate(-j, &mut error, &mut energy);
        }
        if 2 * j + 1 < lag {
            continue;
        }
        if energy > MIN_ENERGY && error <= threshold * energy {
            extent = k;
        } else {
            break;
        }
    }
    extent
}

/// Maximum voiced extent of one period (Stage A job).
pub fn voiced_extent(wave: &[f32], period: &SourcePeriod, threshold: f32) -> u32 {
    let t = period.half_window();
    let detect = (3.0 * t).ceil() as usize;
    let max_lag = ((1.5 * t).ceil() as usize).min(detect);
    let min_lag = ((t / 2.0).floor() as usize).max(1);

    let c = period.src_pos;
    let lo = c.saturating_sub(detect);
    let hi = (c + detect).min(wave.len());
    if lo >= hi || max_lag == 0 {
        return 0;
    }

    let d = difference(wave, lo, hi, max_lag);
    let cmnd = cumulative_mean(&d);
    match best_lag(&cmnd, min_lag, max_lag, threshold) {
        Some(lag) => periodic_extent(wave, c, lag, detect, threshold) as u32,
        None => 0,
    }
}

/// Stage B: propagate extents along one piece.
///
/// `extents` is indexed like `periods`; unvoiced entries are left as is.
pub fn propagate_extents(periods: &[SourcePeriod], extents: &mut [u32]) {
    let mut last = 0u32;
    for (period, extent) in periods.iter().zip(extents.iter_mut()) {
        match period.voicing {
            VoicingClass::Unvoiced => {}
            VoicingClass::Transitional => {
                if *extent < last {
                    *extent = last;
                }
                last = *extent;
            }
            VoicingClass::Voiced => last = *extent,
        }
    }
}

/// Stage A on the device: one job per analyzed period.
///
/// Returns a ragged array with one extent per period of every piece;
/// unvoiced periods stay 0.
pub fn search_extents(
    device: &Device,
    waves: &RaggedArray<f32>,
    periods: &RaggedArray<SourcePeriod>,
    jobs: &[PeriodRef],
    threshold: f32,
) -> RaggedArray<u32> {
    let lens: Vec<usize> = periods.spans().iter().map(|s| s.len).collect();
    let mut extents: RaggedArray<u32> = device.alloc_ragged(&lens);

    let found = device.backend().map_jobs(jobs.len(), |i| {
        let job = jobs[i];
        let period = &periods.item(job.piece)[job.period];
        voiced_extent(waves.item(job.piece), period, threshold)
    });

    for (job, extent) in jobs.iter().zip(found) {
        extents.item_mut(job.piece)[job.period] = extent;
    }
    extents
}

/// Stage B round trip: download, propagate on the host, write back.
pub fn propagate_on_host(
    device: &Device,
    table: &PeriodTable,
    extents: &mut RaggedArray<u32>,
) -> Result<()> {
    let mut host = device.download_ragged(extents);
    for (periods, piece_extents) in table.pieces.iter().zip(host.iter_mut()) {
        propagate_extents(periods, piece_extents);
    }
    device.update_ragged(extents, &host)?;
    Ok(())
}
