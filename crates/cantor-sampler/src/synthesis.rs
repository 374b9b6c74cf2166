//! Parallel pitch-synchronous resynthesis into paired accumulation buffers.
//!
//! Every [`SynthesisJob`] renders one windowed fragment of about two
//! template half-windows and adds it into a template buffer. Jobs alternate
//! between two buffers by their index within the segment: neighbouring
//! jobs of the same parity sit two half-windows apart, so their write
//! ranges never overlap. Each buffer is split into disjoint `&mut` slices
//! up front and all fragments run as one batch; the buffers are summed once
//! every fragment is in.
//!
//! ## Fragment
//!
//! With template half-window `Ht`, destination period `L` and
//! `speed = Ht / L`, a candidate contributes at template offset `d`:
//!
//! ```text
//! sinwin(d, Ht) · (g · (h(|d| / speed) - m) + y(|d|))
//! ```
//!
//! where `h` is the blended harmonic half-window and `y` the noise spectrum
//! resynthesized with the job's random phases. `m` and `g` come from
//! [`HarmonicLevel`]: `m` removes the fragment's DC, which appears whenever
//! `h` is cut short of its negative lobes, and `g` scales the fragment
//! train spaced `Ht` apart to the power of the source period.

use std::ops::Range;
use std::sync::Arc;

use cantor_analysis::{PeriodSpectra, SourceAnalysis};
use cantor_core::{lerp, sinwin, Device, DeviceArray, Executor};
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::warp::{Candidate, DestinationSegment, JobPlan, SynthesisJob};
use crate::Result;

/// Elements per merge job.
const MERGE_CHUNK: usize = 4096;

/// Harmonic/noise model of one candidate, blended between its two periods.
#[derive(Debug, Clone)]
struct CandidateModel {
    harmonic: Vec<f32>,
    noise: Vec<f32>,
    period_len: f32,
}

impl CandidateModel {
    fn blend(analysis: &SourceAnalysis, candidate: &Candidate) -> Self {
        let spectra: &PeriodSpectra = &analysis.spectra;
        let p0 = analysis.period(candidate.piece, candidate.period);
        let p1 = analysis.period(candidate.piece, candidate.next);
        let k = candidate.fraction;

        let h0 = spectra.harmonic(candidate.piece, candidate.period);
        let h1 = spectra.harmonic(candidate.piece, candidate.next);
        let n0 = spectra.noise(candidate.piece, candidate.period);
        let n1 = spectra.noise(candidate.piece, candidate.next);

        Self {
            harmonic: h0.iter().zip(h1).map(|(&a, &b)| lerp(a, b, k)).collect(),
            noise: n0.iter().zip(n1).map(|(&a, &b)| lerp(a, b, k)).collect(),
            period_len: lerp(p0.half_window(), p1.half_window(), k),
        }
    }
}

/// Largest gain applied to a harmonic fragment.
const MAX_HARMONIC_GAIN: f32 = 32.0;

/// Train power below which a fragment is treated as silent.
const MIN_TRAIN_POWER: f64 = 1e-12;

/// Template indices of a job's fragment, `(center - ht, center + ht)`.
/// Unclamped; may start before 0.
#[inline]
fn fragment_grid(center: f32, ht: f32) -> Range<isize> {
    let lo = (center - ht).floor() as isize + 1;
    let hi = (center + ht).ceil() as isize;
    lo..hi.max(lo)
}

/// DC offset and gain of one candidate's stretched harmonic window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicLevel {
    /// `sinwin`-weighted mean of the stretched window over the job's grid
    pub offset: f32,
    pub gain: f32,
}

impl HarmonicLevel {
    pub const SILENT: Self = Self {
        offset: 0.0,
        gain: 0.0,
    };

    /// Measure `harmonic` (a zero-phase half window of a period
    /// `period_len` samples long) as rendered by a job centred at `center`.
    ///
    /// The gain equates the power of a train of identical offset-free
    /// fragments `ht` apart with the harmonic power per source period,
    /// so the level follows the source whatever the stretch.
    pub fn measure(harmonic: &[f32], period_len: f32, center: f32, ht: f32, speed: f32) -> Self {
        let energy: f64 = harmonic
            .iter()
            .enumerate()
            .map(|(n, &h)| {
                let e = h as f64 * h as f64;
                if n == 0 {
                    e
                } else {
                    2.0 * e
                }
            })
            .sum();
        if energy <= 0.0 || ht <= 0.0 || speed <= 0.0 {
            return Self::SILENT;
        }

        let shape = |d: f32| read_or_zero(harmonic, d.abs() / speed);
        let grid = fragment_grid(center, ht);

        let mut weight = 0.0f64;
        let mut weighted = 0.0f64;
        for i in grid.clone() {
            let d = i as f32 - center;
            let w = sinwin(d, ht) as f64;
            weight += w;
            weighted += w * shape(d) as f64;
        }
        if weight <= 0.0 {
            return Self::SILENT;
        }
        let offset = (weighted / weight) as f32;

        // Power of the periodic train: lag-0 and lag-Ht autocorrelation
        let kernel = |d: f32| sinwin(d, ht) * (shape(d) - offset);
        let mut r0 = 0.0f64;
        let mut r1 = 0.0f64;
        for i in grid {
            let d = i as f32 - center;
            let k = kernel(d) as f64;
            r0 += k * k;
            r1 += k * kernel(d - ht) as f64;
        }
        let train_power = (r0 + 2.0 * r1) / ht as f64;
        if train_power <= MIN_TRAIN_POWER {
            return Self { offset, gain: 0.0 };
        }

        let source_power = energy / period_len as f64;
        let gain = ((source_power / train_power).sqrt() as f32).min(MAX_HARMONIC_GAIN);
        Self { offset, gain }
    }
}

/// Linear read of a half window, zero past its end.
#[inline]
fn read_or_zero(x: &[f32], u: f32) -> f32 {
    let i = u as usize;
    if i + 1 < x.len() {
        let frac = u - i as f32;
        x[i] + (x[i + 1] - x[i]) * frac
    } else if i + 1 == x.len() && u == i as f32 {
        x[i]
    } else {
        0.0
    }
}

/// Nearest-sample read clamped to the last sample.
///
/// Noise is never interpolated: averaging two independent samples would
/// lose power on every fragment centred between samples.
#[inline]
fn read_nearest(x: &[f32], u: f32) -> f32 {
    let i = ((u + 0.5) as usize).min(x.len() - 1);
    x[i]
}

/// Time-domain noise of `2 * phases.len()` samples with PSD amplitude
/// `bands` sampled at output frequency `ν · speed`.
///
/// Bins above the output Nyquist frequency stay empty; the Nyquist bin
/// itself, reached only at `speed == 1`, is kept real.
fn noise_waveform(bands: &[f32], speed: f32, phases: &[f32], inverse: &dyn Fft<f32>) -> Vec<f32> {
    let half = phases.len();
    let n = 2 * half;
    let mut buf = vec![Complex::new(0.0f32, 0.0); n];
    let magnitude = (n as f32 * speed).sqrt();
    let band_count = bands.len();

    for k in 1..=half {
        let freq = k as f32 / n as f32 * speed;
        if freq > 0.5 {
            break;
        }
        let band = ((freq * 2.0 * band_count as f32) as usize).min(band_count - 1);
        let theta = 2.0 * std::f32::consts::PI * phases[k - 1];
        let bin = Complex::from_polar(magnitude * bands[band], theta);
        if k == half {
            buf[k] = Complex::new(bin.re, 0.0);
        } else {
            buf[k] = bin;
            buf[n - k] = bin.conj();
        }
    }

    inverse.process(&mut buf);
    let scale = 1.0 / n as f32;
    buf.iter().map(|c| c.re * scale).collect()
}

/// Template indices `(center - Ht, center + Ht)` of a job, clamped to its
/// segment. Segment-local.
pub fn write_range(job: &SynthesisJob, segment: &DestinationSegment) -> Range<usize> {
    let grid = fragment_grid(job.center, segment.half_window());
    let size = segment.template_size;
    let lo = (grid.start.max(0) as usize).min(size);
    let hi = grid.end.max(0) as usize;
    lo..hi.clamp(lo, size)
}

/// Render one job's fragment into `out`, whose first element is template
/// index `first` of the job's segment.
pub fn render_fragment(
    job: &SynthesisJob,
    segment: &DestinationSegment,
    analysis: &SourceAnalysis,
    phases: &[f32],
    inverse: &dyn Fft<f32>,
    first: usize,
    out: &mut [f32],
) {
    let ht = segment.half_window();
    let speed = ht / job.dest_half_window;
    let per_job = segment.phases_per_job();
    let offset = job.index_in_segment * per_job;
    let job_phases = &phases[offset..offset + per_job];

    let (w0, w1) = match job.secondary {
        None => (1.0, 0.0),
        Some(_) if job.piece_weight <= 0.0 => (1.0, 0.0),
        Some(_) if job.piece_weight >= 1.0 => (0.0, 1.0),
        Some(_) => (1.0 - job.piece_weight, job.piece_weight),
    };

    let candidates = [Some(job.primary), job.secondary];
    for (candidate, weight) in candidates.iter().zip([w0, w1]) {
        let Some(candidate) = candidate else { continue };
        if weight == 0.0 {
            continue;
        }

        let model = CandidateModel::blend(analysis, candidate);
        let level = HarmonicLevel::measure(&model.harmonic, model.period_len, job.center, ht, speed);
        let noise = noise_waveform(&model.noise, speed, job_phases, inverse);

        for (k, sample) in out.iter_mut().enumerate() {
            let d = (first + k) as f32 - job.center;
            let w = sinwin(d, ht);
            if w == 0.0 {
                continue;
            }
            let harmonic = read_or_zero(&model.harmonic, d.abs() / speed) - level.offset;
            let aperiodic = read_nearest(&noise, d.abs());
            *sample += weight * w * (level.gain * harmonic + aperiodic);
        }
    }
}

/// A job's exclusive slice of one accumulation buffer.
struct Fragment<'a> {
    job: usize,
    first: usize,
    out: &'a mut [f32],
}

/// Split `buf` into the given ranges (sorted, flat-buffer indices).
/// Overlapping starts are pushed to the previous end.
fn split_disjoint<'a>(mut buf: &'a mut [f32], ranges: &[Range<usize>]) -> Vec<(usize, &'a mut [f32])> {
    let mut consumed = 0;
    let mut out = Vec::with_capacity(ranges.len());
    for range in ranges {
        let start = range.start.max(consumed);
        let end = range.end.max(start);
        let tail = std::mem::take(&mut buf);
        let (_, tail) = tail.split_at_mut(start - consumed);
        let (slice, tail) = tail.split_at_mut(end - start);
        out.push((start, slice));
        buf = tail;
        consumed = end;
    }
    out
}

/// Render every job and return the merged template buffer.
pub fn synthesize(
    device: &Device,
    segments: &[DestinationSegment],
    plan: &JobPlan,
    analysis: &SourceAnalysis,
    phases: &DeviceArray<f32>,
) -> Result<DeviceArray<f32>> {
    if phases.len() < plan.random_phase_len {
        return Err(cantor_core::Error::TransferSizeMismatch {
            expected: plan.random_phase_len,
            actual: phases.len(),
        }
        .into());
    }

    let total: usize = segments.iter().map(|s| s.template_size).sum();
    let mut even: DeviceArray<f32> = device.alloc_zeroed(total);
    let mut odd: DeviceArray<f32> = device.alloc_zeroed(total);
    tracing::debug!(
        "Synthesis: {} jobs over {} segments, template {} samples",
        plan.jobs.len(),
        segments.len(),
        total
    );

    let mut planner = FftPlanner::new();
    let inverses: Vec<Arc<dyn Fft<f32>>> = segments
        .iter()
        .map(|s| planner.plan_fft_inverse(2 * s.phases_per_job()))
        .collect();

    let mut ranges: [Vec<Range<usize>>; 2] = [Vec::new(), Vec::new()];
    let mut owners: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for (i, job) in plan.jobs.iter().enumerate() {
        let segment = &segments[job.segment];
        let local = write_range(job, segment);
        let parity = job.index_in_segment % 2;
        ranges[parity].push(local.start + segment.template_offset..local.end + segment.template_offset);
        owners[parity].push(i);
    }

    {
        let mut fragments: Vec<Fragment> = Vec::with_capacity(plan.jobs.len());
        for (buffer, (ranges, owners)) in [even.as_mut_slice(), odd.as_mut_slice()]
            .into_iter()
            .zip(ranges.iter().zip(&owners))
        {
            for ((start, out), &job) in split_disjoint(buffer, ranges).into_iter().zip(owners) {
                let segment = &segments[plan.jobs[job].segment];
                fragments.push(Fragment {
                    job,
                    first: start - segment.template_offset,
                    out,
                });
            }
        }

        let samples = phases.as_slice();
        device.backend().for_each_job(&mut fragments, |_, fragment| {
            let job = &plan.jobs[fragment.job];
            render_fragment(
                job,
                &segments[job.segment],
                analysis,
                samples,
                inverses[job.segment].as_ref(),
                fragment.first,
                fragment.out,
            );
        });
    }

    merge(device, &mut even, &odd);
    Ok(even)
}

/// Add `odd` into `even` elementwise.
pub fn merge(device: &Device, even: &mut DeviceArray<f32>, odd: &DeviceArray<f32>) {
    let mut pairs: Vec<(&mut [f32], &[f32])> = even
        .as_mut_slice()
        .chunks_mut(MERGE_CHUNK)
        .zip(odd.as_slice().chunks(MERGE_CHUNK))
        .collect();
    device.backend().for_each_job(&mut pairs, |_, (dst, src)| {
        for (d, s) in dst.iter_mut().zip(src.iter()) {
            *d += *s;
        }
    });
}
