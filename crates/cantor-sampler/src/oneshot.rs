//! Fixed-ratio one-shot sampler.
//!
//! Resamples an interleaved sample into a fixed-length buffer, normalized
//! by the sample's peak and shaped by an exponential fade-in. No time
//! warping: ratio > 1 interpolates (Catmull-Rom), ratio < 1 box-filters.

use crate::{Error, Result};

/// An interleaved source sample with its peak amplitude.
#[derive(Debug, Clone)]
pub struct OneShotSample {
    samples: Vec<f32>,
    channels: usize,
    peak: f32,
}

impl OneShotSample {
    pub fn new(samples: Vec<f32>, channels: usize) -> Result<Self> {
        if channels == 0 || samples.len() < channels {
            return Err(Error::EmptyOneShot);
        }
        let peak = samples.iter().fold(0.0f32, |m, x| m.max(x.abs()));
        Ok(Self {
            samples,
            channels,
            peak,
        })
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames (samples per channel).
    #[inline]
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    #[inline]
    pub fn peak(&self) -> f32 {
        self.peak
    }

    #[inline]
    fn at(&self, frame: usize, channel: usize) -> f32 {
        self.samples[frame * self.channels + channel]
    }

    /// Catmull-Rom read at fractional `pos`, taps clamped to the sample.
    fn cubic(&self, pos: f32, channel: usize) -> f32 {
        let last = self.frames() - 1;
        let i1 = (pos as usize).min(last);
        let frac = pos - i1 as f32;
        let i0 = i1.saturating_sub(1);
        let i2 = (i1 + 1).min(last);
        let i3 = (i1 + 2).min(last);

        let p0 = self.at(i0, channel);
        let p1 = self.at(i1, channel);
        let p2 = self.at(i2, channel);
        let p3 = self.at(i3, channel);

        let a = -0.5 * p0 + 1.5 * p1 - 1.5 * p2 + 0.5 * p3;
        let b = p0 - 2.5 * p1 + 2.0 * p2 - 0.5 * p3;
        let c = -0.5 * p0 + 0.5 * p2;
        ((a * frac + b) * frac + c) * frac + p1
    }

    /// Mean over frames `lo..=hi`, bounds clamped to the sample.
    fn average(&self, lo: f32, hi: f32, channel: usize) -> f32 {
        let last = self.frames() - 1;
        let lo = (lo.max(0.0) as usize).min(last);
        let hi = (hi.max(0.0) as usize).clamp(lo, last);
        let sum: f32 = (lo..=hi).map(|f| self.at(f, channel)).sum();
        sum / (hi - lo + 1) as f32
    }
}

/// Fade-in gain at output frame `j` of `out_frames`.
#[inline]
pub fn fade_in(j: usize, out_frames: usize) -> f32 {
    1.0 - (-10.0 * j as f32 / out_frames as f32).exp()
}

/// Render `sample` at `ratio` output frames per source frame into `out`
/// (interleaved, same channel count). Returns the frames written.
///
/// A non-positive or NaN ratio writes nothing.
pub fn render_one_shot(sample: &OneShotSample, out: &mut [f32], ratio: f32) -> usize {
    out.fill(0.0);
    let channels = sample.channels;
    let out_frames = out.len() / channels;
    let frames = ((sample.frames() as f32 * ratio) as usize).min(out_frames);
    if frames == 0 {
        return 0;
    }

    let gain = if sample.peak > 0.0 { 1.0 / sample.peak } else { 0.0 };
    let inv_ratio = 1.0 / ratio;

    for (j, frame) in out.chunks_exact_mut(channels).take(frames).enumerate() {
        let amplitude = fade_in(j, out_frames) * gain;
        for (c, value) in frame.iter_mut().enumerate() {
            let wave = if ratio == 1.0 {
                sample.at(j, c)
            } else if ratio > 1.0 {
                sample.cubic(j as f32 * inv_ratio, c)
            } else {
                let lo = ((j as f32 - 0.5) * inv_ratio).ceil();
                let hi = ((j as f32 + 0.5) * inv_ratio).floor();
                sample.average(lo, hi, c)
            };
            *value = amplitude * wave;
        }
    }

    tracing::trace!("One-shot: {} frames at ratio {}", frames, ratio);
    frames
}
