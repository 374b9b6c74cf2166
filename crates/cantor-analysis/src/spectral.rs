//! Harmonic/noise decomposition of every source period.
//!
//! For a period of length `T` centred at `c` with voiced extent `e`:
//!
//! - the periodic estimate `pc[n]` averages `x[c+n-T]`, `x[c+n]` and
//!   `x[c+n+T]` (whichever lie inside the waveform)
//! - the harmonic part is `pc` under a square-root Hann window of half-width
//!   `min(e, T)`; the residual of the `T`-wide windowed segment is noise
//! - the harmonic part is stored zero-phase (inverse transform of its
//!   magnitude spectrum), keeping the non-negative half
//! - the noise is stored as band amplitudes of its power spectral density,
//!   normalized by the window energy so they do not depend on `T` or the
//!   transform size
//!
//! Every period gets a harmonic window of `half_window` samples and a noise
//! spectrum of `spec_len` bands; shorter content leaves zeros.

use cantor_core::{sinwin, Complex, Device, Executor, FftPair, RaggedArray};

use crate::SourcePeriod;

/// Run-wide sizes of the per-period analysis arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectralLayout {
    /// Harmonic window length: ceil of the largest period length
    pub half_window: usize,
    /// Noise band count: ceil of half the largest period length
    pub spec_len: usize,
    /// Analysis transform size: next power of two >= 3 × `half_window`
    pub fft_len: usize,
}

impl SpectralLayout {
    pub fn from_max_half_window(max_half_window: f32) -> Self {
        let half_window = (max_half_window.ceil() as usize).max(1);
        let spec_len = ((max_half_window * 0.5).ceil() as usize).max(1);
        Self {
            half_window,
            spec_len,
            fft_len: cantor_core::next_pow2(3 * half_window),
        }
    }
}

/// Harmonic windows and noise spectra of every period, one item per piece.
#[derive(Debug)]
pub struct PeriodSpectra {
    pub layout: SpectralLayout,
    pub harmonics: RaggedArray<f32>,
    pub noise: RaggedArray<f32>,
}

impl PeriodSpectra {
    #[inline]
    pub fn harmonic(&self, piece: usize, period: usize) -> &[f32] {
        let h = self.layout.half_window;
        &self.harmonics.item(piece)[period * h..(period + 1) * h]
    }

    #[inline]
    pub fn noise(&self, piece: usize, period: usize) -> &[f32] {
        let s = self.layout.spec_len;
        &self.noise.item(piece)[period * s..(period + 1) * s]
    }
}

/// Linearly interpolated read, `None` outside the waveform.
#[inline]
fn read_frac(x: &[f32], pos: f32) -> Option<f32> {
    if pos < 0.0 || pos > (x.len() - 1) as f32 {
        return None;
    }
    let i = pos as usize;
    let frac = pos - i as f32;
    let a = x[i];
    let b = x[(i + 1).min(x.len() - 1)];
    Some(a + (b - a) * frac)
}

/// Decompose one period into `harmonic` (len `half_window`) and `noise`
/// (len `spec_len`).
pub fn decompose_period(
    wave: &[f32],
    period: &SourcePeriod,
    extent: u32,
    fft: &FftPair,
    harmonic: &mut [f32],
    noise: &mut [f32],
) {
    harmonic.fill(0.0);
    noise.fill(0.0);
    if wave.is_empty() {
        return;
    }

    let t = period.half_window();
    let hc = (t.ceil() as usize).clamp(1, harmonic.len());
    let wh = (extent as f32).min(t);
    let c = period.src_pos as f32;
    let na = fft.len();

    let mut harm_buf = fft.buffer();
    let mut noise_buf = fft.buffer();
    let mut window_energy = 0.0f32;

    let reach = hc as isize - 1;
    for i in -reach..=reach {
        let n = i as f32;
        let (x, pc) = match read_frac(wave, c + n) {
            Some(x) => {
                let mut sum = x;
                let mut count = 1.0;
                for neighbour in [c + n - t, c + n + t] {
                    if let Some(v) = read_frac(wave, neighbour) {
                        sum += v;
                        count += 1.0;
                    }
                }
                (x, sum / count)
            }
            None => (0.0, 0.0),
        };

        let w = sinwin(n, t);
        let sh = sinwin(n, wh) * pc;
        let sn = w * x - sh;
        window_energy += w * w;

        let idx = i.rem_euclid(na as isize) as usize;
        harm_buf[idx] = Complex::new(sh, 0.0);
        noise_buf[idx] = Complex::new(sn, 0.0);
    }

    fft.forward.process(&mut harm_buf);
    fft.forward.process(&mut noise_buf);

    // Zero-phase harmonic window
    for bin in harm_buf.iter_mut() {
        *bin = Complex::new(bin.norm(), 0.0);
    }
    fft.inverse.process(&mut harm_buf);
    let scale = 1.0 / na as f32;
    for (out, bin) in harmonic[..hc].iter_mut().zip(&harm_buf) {
        *out = bin.re * scale;
    }

    // Band-averaged PSD amplitude
    let bands = noise.len();
    let mut power = vec![0.0f32; bands];
    let mut counts = vec![0usize; bands];
    for (b, bin) in noise_buf[..na / 2].iter().enumerate() {
        let k = (b * 2 * bands / na).min(bands - 1);
        power[k] += bin.norm_sqr();
        counts[k] += 1;
    }
    if window_energy > 0.0 {
        for ((out, p), count) in noise.iter_mut().zip(&power).zip(&counts) {
            if *count > 0 {
                *out = (p / *count as f32 / window_energy).sqrt();
            }
        }
    }
}

/// Stage C on the device: decompose every period of every piece.
pub fn analyze_spectra(
    device: &Device,
    waves: &RaggedArray<f32>,
    periods: &RaggedArray<SourcePeriod>,
    extents: &RaggedArray<u32>,
    layout: SpectralLayout,
) -> PeriodSpectra {
    let counts: Vec<usize> = periods.spans().iter().map(|s| s.len).collect();
    let refs: Vec<(usize, usize)> = counts
        .iter()
        .enumerate()
        .flat_map(|(piece, &n)| (0..n).map(move |period| (piece, period)))
        .collect();

    let harmonic_lens: Vec<usize> = counts.iter().map(|n| n * layout.half_window).collect();
    let noise_lens: Vec<usize> = counts.iter().map(|n| n * layout.spec_len).collect();
    let mut harmonics: RaggedArray<f32> = device.alloc_ragged(&harmonic_lens);
    let mut noise: RaggedArray<f32> = device.alloc_ragged(&noise_lens);

    let fft = FftPair::new(layout.fft_len);
    tracing::debug!(
        "Spectral analysis: {} periods, half window {}, {} bands, fft {}",
        refs.len(),
        layout.half_window,
        layout.spec_len,
        layout.fft_len
    );

    let mut work: Vec<(&mut [f32], &mut [f32])> = harmonics
        .flat_mut()
        .chunks_mut(layout.half_window)
        .zip(noise.flat_mut().chunks_mut(layout.spec_len))
        .collect();

    device.backend().for_each_job(&mut work, |i, (harmonic, noise)| {
        let (piece, period) = refs[i];
        decompose_period(
            waves.item(piece),
            &periods.item(piece)[period],
            extents.item(piece)[period],
            &fft,
            harmonic,
            noise,
        );
    });
    drop(work);

    PeriodSpectra {
        layout,
        harmonics,
        noise,
    }
}
