//! Output resampler/mixer.
//!
//! Decimates each segment's template buffer back to output samples with a
//! box filter whose width follows the local speed ratio, then applies the
//! volume envelope. Sequential and host-side.

use cantor_core::{ControlPoint, Timeline};

use crate::warp::DestinationSegment;
use crate::FrequencyMap;

/// Box average of `template` over `[ceil(pos - width/2), floor(pos + width/2)]`.
///
/// Indices before the buffer read as zero but still count in the divisor;
/// indices past the end clamp to the last sample.
#[inline]
fn box_average(template: &[f32], pos: f32, width: f32) -> f32 {
    let last = template.len() as i64 - 1;
    let lo = ((pos - width * 0.5).ceil() as i64).min(last);
    let hi = ((pos + width * 0.5).floor() as i64).min(last);

    let sum: f32 = (lo.max(0)..=hi).map(|i| template[i as usize]).sum();
    let count = (hi - lo + 1).max(1);
    sum / count as f32
}

/// Render `out` from the merged template buffer.
///
/// `out` covers the whole frequency map; `template` holds every segment's
/// buffer back to back.
pub fn mix(
    template: &[f32],
    segments: &[DestinationSegment],
    map: &FrequencyMap,
    volume_map: &[ControlPoint],
    sample_rate: f32,
    out: &mut [f32],
) {
    let mut volume = Timeline::new(volume_map);
    let end_ms = out.len() as f32 / sample_rate * 1000.0;
    if !volume.covers(0.0, end_ms) {
        tracing::warn!("volume_map does not cover the output, clamping at its ends");
    }

    for segment in segments {
        let start = segment.template_offset;
        let end = (start + segment.template_size).min(template.len());
        let buf = &template[start.min(end)..end];
        let dst_end = (segment.start + segment.len).min(out.len());
        let dst = &mut out[segment.start.min(dst_end)..dst_end];

        for (pos, sample) in dst.iter_mut().enumerate() {
            let pos_global = segment.start + pos;
            if buf.is_empty() {
                *sample = 0.0;
                continue;
            }
            let speed = map.pitch[pos_global] / segment.min_pitch;
            let value = box_average(buf, segment.stretch[pos], speed);
            let t_ms = pos_global as f32 / sample_rate * 1000.0;
            *sample = value * volume.value_at(t_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warp::build_segments;

    #[test]
    fn test_box_average_counts_leading_gap() {
        let template = [3.0, 3.0, 3.0, 3.0];
        // Window [-1, 1]: one missing sample still divides
        assert!((box_average(&template, 0.0, 2.0) - 2.0).abs() < 1e-6);
        assert!((box_average(&template, 2.0, 2.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_box_average_clamps_past_end() {
        let template = [1.0, 2.0, 4.0];
        assert!((box_average(&template, 9.0, 1.0) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_identity_stretch_passes_through() {
        let map = FrequencyMap::constant(220.0, 44100.0, 100);
        let segments = build_segments(&map);
        let template: Vec<f32> = (0..100).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut out = vec![0.0; 100];
        mix(
            &template,
            &segments,
            &map,
            &[ControlPoint::new(0.0, 0.5)],
            44100.0,
            &mut out,
        );

        // stretch[i] = i + 1, a unit-wide box reads one sample
        for i in 0..99 {
            assert!((out[i] - 0.5 * template[i + 1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_volume_envelope_interpolates() {
        let map = FrequencyMap::constant(220.0, 44100.0, 4410);
        let segments = build_segments(&map);
        let template = vec![1.0; 4410];
        let mut out = vec![0.0; 4410];
        let volume = [ControlPoint::new(0.0, 0.0), ControlPoint::new(100.0, 1.0)];
        mix(&template, &segments, &map, &volume, 44100.0, &mut out);

        assert!(out[0].abs() < 1e-6);
        assert!((out[2205] - 0.5).abs() < 1e-3);
        assert!(out[4409] > 0.99);
    }

    #[test]
    fn test_faster_pitch_widens_window() {
        let mut pitch = vec![110.0 / 44100.0; 200];
        pitch[100..].fill(220.0 / 44100.0);
        let map = FrequencyMap::new(pitch, vec![0, 200]);
        let segments = build_segments(&map);
        let template: Vec<f32> = (0..segments[0].template_size)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        let mut out = vec![0.0; 200];
        mix(
            &template,
            &segments,
            &map,
            &[ControlPoint::new(0.0, 1.0)],
            44100.0,
            &mut out,
        );

        // Two-sample boxes cancel the alternating template
        assert!(out[150].abs() < 0.5);
        assert!(out[50].abs() > 0.99);
    }

    #[test]
    fn test_mix_is_deterministic() {
        let mut map = FrequencyMap::constant(330.0, 44100.0, 2000);
        map.bounds = vec![0, 700, 2000];
        let segments = build_segments(&map);
        let total: usize = segments.iter().map(|s| s.template_size).sum();
        let template: Vec<f32> = (0..total).map(|i| (i as f32 * 0.03).cos()).collect();
        let volume = [ControlPoint::new(0.0, 1.0)];

        let mut a = vec![0.0; 2000];
        let mut b = vec![0.0; 2000];
        mix(&template, &segments, &map, &volume, 44100.0, &mut a);
        mix(&template, &segments, &map, &volume, 44100.0, &mut b);
        assert_eq!(a, b);
    }
}
