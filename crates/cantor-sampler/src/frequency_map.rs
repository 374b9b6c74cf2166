//! Per-sample target pitch and segment boundaries.
//!
//! The synthesis stages only need two things from the sentence's pitch
//! curve: one target pitch per output sample, and a partition of the output
//! into segments. [`FrequencyMapper`] produces them; [`ControlPointMapper`]
//! is the default, driven by the descriptor's `freq_map` and `piece_map`.

use std::ops::Range;

use cantor_core::{SentenceDescriptor, Timeline};

use crate::{Error, Result};

/// Target pitch per output sample plus segment boundaries.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct FrequencyMap {
    /// Target pitch per output sample (cycles per sample)
    pub pitch: Vec<f32>,
    /// Strictly increasing, from 0 to the output length
    pub bounds: Vec<usize>,
}

impl FrequencyMap {
    pub fn new(pitch: Vec<f32>, bounds: Vec<usize>) -> Self {
        Self { pitch, bounds }
    }

    /// Flat pitch over a single segment.
    pub fn constant(freq_hz: f32, sample_rate: f32, len: usize) -> Self {
        Self {
            pitch: vec![freq_hz / sample_rate; len],
            bounds: vec![0, len],
        }
    }

    /// Output samples covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.pitch.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pitch.is_empty()
    }

    /// Number of segments.
    #[inline]
    pub fn segment_count(&self) -> usize {
        self.bounds.len().saturating_sub(1)
    }

    /// Output sample range of each segment.
    pub fn segments(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.bounds.windows(2).map(|w| w[0]..w[1])
    }

    /// Check the map against the output length it will drive.
    pub fn validate(&self, out_len: usize) -> Result<()> {
        if self.pitch.len() != out_len {
            return Err(Error::InvalidFrequencyMap(format!(
                "{} pitch values for {} output samples",
                self.pitch.len(),
                out_len
            )));
        }
        if let Some(i) = self
            .pitch
            .iter()
            .position(|&p| !(p.is_finite() && p > 0.0))
        {
            return Err(Error::InvalidFrequencyMap(format!(
                "target pitch at sample {} is {} (must be positive)",
                i, self.pitch[i]
            )));
        }
        if self.bounds.len() < 2 {
            return Err(Error::InvalidSegmentBounds(
                "need at least one segment".into(),
            ));
        }
        if self.bounds[0] != 0 || self.bounds[self.bounds.len() - 1] != out_len {
            return Err(Error::InvalidSegmentBounds(format!(
                "bounds must run from 0 to {}, got {:?}..{:?}",
                out_len,
                self.bounds.first(),
                self.bounds.last()
            )));
        }
        if let Some(w) = self.bounds.windows(2).find(|w| w[1] <= w[0]) {
            return Err(Error::InvalidSegmentBounds(format!(
                "bounds not strictly increasing at {} -> {}",
                w[0], w[1]
            )));
        }
        Ok(())
    }
}

/// Produces the frequency map of a sentence.
pub trait FrequencyMapper {
    fn map(
        &self,
        desc: &SentenceDescriptor,
        out_len: usize,
        sample_rate: f32,
    ) -> Result<FrequencyMap>;
}

/// Interpolates `freq_map` per sample and cuts segments at `piece_map`
/// control points.
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlPointMapper;

impl FrequencyMapper for ControlPointMapper {
    fn map(
        &self,
        desc: &SentenceDescriptor,
        out_len: usize,
        sample_rate: f32,
    ) -> Result<FrequencyMap> {
        if desc.freq_map.is_empty() {
            return Err(Error::InvalidFrequencyMap(
                "freq_map has no control points".into(),
            ));
        }
        if out_len == 0 {
            return Err(Error::InvalidSegmentBounds("output is empty".into()));
        }

        let ms_per_sample = 1000.0 / sample_rate;
        let mut freqs = Timeline::new(&desc.freq_map);
        if !freqs.covers(0.0, out_len as f32 * ms_per_sample) {
            tracing::warn!("freq_map does not cover the output, clamping at its ends");
        }
        let pitch = (0..out_len)
            .map(|i| freqs.value_at(i as f32 * ms_per_sample) / sample_rate)
            .collect();

        let mut bounds = vec![0];
        let mut dropped = 0usize;
        for point in &desc.piece_map {
            let index = (point.dst_ms * 0.001 * sample_rate).round();
            if !(index > 0.0 && index < out_len as f32) {
                continue;
            }
            let index = index as usize;
            match bounds.last() {
                Some(&last) if index <= last => dropped += 1,
                _ => bounds.push(index),
            }
        }
        bounds.push(out_len);
        if dropped > 0 {
            tracing::warn!("Dropped {} duplicate segment boundaries", dropped);
        }

        let map = FrequencyMap { pitch, bounds };
        map.validate(out_len)?;
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cantor_core::ControlPoint;

    fn desc(piece_map: Vec<ControlPoint>, freq_map: Vec<ControlPoint>) -> SentenceDescriptor {
        SentenceDescriptor {
            pieces: vec![],
            piece_map,
            volume_map: vec![ControlPoint::new(0.0, 1.0)],
            freq_map,
        }
    }

    #[test]
    fn test_constant_map_is_valid() {
        let map = FrequencyMap::constant(220.0, 44100.0, 4410);
        assert!(map.validate(4410).is_ok());
        assert_eq!(map.segment_count(), 1);
        assert_eq!(map.segments().next(), Some(0..4410));
    }

    #[test]
    fn test_validate_rejects_length_mismatch() {
        let map = FrequencyMap::constant(220.0, 44100.0, 100);
        assert!(matches!(
            map.validate(200),
            Err(Error::InvalidFrequencyMap(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_pitch() {
        let mut map = FrequencyMap::constant(220.0, 44100.0, 100);
        map.pitch[40] = 0.0;
        assert!(matches!(
            map.validate(100),
            Err(Error::InvalidFrequencyMap(_))
        ));
    }

    #[test]
    fn test_validate_rejects_non_increasing_bounds() {
        let mut map = FrequencyMap::constant(220.0, 44100.0, 100);
        map.bounds = vec![0, 50, 50, 100];
        assert!(matches!(
            map.validate(100),
            Err(Error::InvalidSegmentBounds(_))
        ));

        map.bounds = vec![10, 100];
        assert!(map.validate(100).is_err());
    }

    #[test]
    fn test_mapper_interpolates_freq_map() {
        let d = desc(
            vec![ControlPoint::new(0.0, 0.0)],
            vec![ControlPoint::new(0.0, 110.0), ControlPoint::new(100.0, 220.0)],
        );
        let map = ControlPointMapper.map(&d, 4410, 44100.0).unwrap();

        assert_eq!(map.bounds, vec![0, 4410]);
        assert!((map.pitch[0] - 110.0 / 44100.0).abs() < 1e-7);
        assert!((map.pitch[2205] - 165.0 / 44100.0).abs() < 1e-6);
    }

    #[test]
    fn test_mapper_cuts_at_piece_points() {
        let d = desc(
            vec![
                ControlPoint::new(0.0, 0.0),
                ControlPoint::new(25.0, 0.0),
                ControlPoint::new(25.0, 1.0),
                ControlPoint::new(75.0, 1.0),
                ControlPoint::new(200.0, 1.0),
            ],
            vec![ControlPoint::new(0.0, 220.0)],
        );
        let map = ControlPointMapper.map(&d, 4410, 44100.0).unwrap();
        // 25 ms twice collapses to one boundary; 200 ms lies past the end
        assert_eq!(map.bounds, vec![0, 1103, 3308, 4410]);
    }

    #[test]
    fn test_mapper_requires_freq_points() {
        let d = desc(vec![ControlPoint::new(0.0, 0.0)], vec![]);
        assert!(ControlPointMapper.map(&d, 100, 44100.0).is_err());
    }
}
