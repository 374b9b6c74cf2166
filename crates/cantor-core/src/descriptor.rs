//! Sentence descriptor: the input of one render.
//!
//! A sentence is built from recorded voice fragments ([`Piece`]s) and three
//! global timelines over the output, all keyed by destination time in
//! milliseconds:
//!
//! - `piece_map`: fractional piece id (integer part picks a piece, fraction
//!   blends toward the next one)
//! - `volume_map`: linear gain
//! - `freq_map`: target pitch in Hz

use crate::{Error, Result};

/// Voicing class of a stretch of source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
#[repr(u8)]
pub enum VoicingClass {
    #[default]
    Voiced = 0,
    Transitional = 1,
    Unvoiced = 2,
}

impl VoicingClass {
    /// Whether periods of this class go through the voiced-extent search.
    #[inline]
    pub fn is_analyzed(self) -> bool {
        !matches!(self, VoicingClass::Unvoiced)
    }
}

/// One source-to-destination alignment point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct AlignmentPoint {
    /// Position in the piece's waveform (ms)
    pub src_ms: f32,
    /// Position in the output (ms)
    pub dst_ms: f32,
    /// Voicing of the interval starting at this point
    pub voicing: VoicingClass,
}

impl AlignmentPoint {
    pub fn new(src_ms: f32, dst_ms: f32, voicing: VoicingClass) -> Self {
        Self {
            src_ms,
            dst_ms,
            voicing,
        }
    }
}

/// Frame-based pitch track of a piece.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct PitchTrack {
    /// Samples between consecutive entries
    pub interval: usize,
    /// Nominal key frequency (Hz), used where the tracker reports no pitch
    pub key: f32,
    /// Tracked frequency per frame (Hz)
    pub freqs: Vec<f32>,
}

impl PitchTrack {
    /// Flat track at `freq`, long enough to cover `len` samples.
    pub fn constant(freq: f32, interval: usize, len: usize) -> Self {
        let frames = len / interval.max(1) + 2;
        Self {
            interval,
            key: freq,
            freqs: vec![freq; frames],
        }
    }
}

/// A recorded voice fragment.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Piece {
    pub wave: Vec<f32>,
    pub pitch: PitchTrack,
    pub alignment: Vec<AlignmentPoint>,
}

impl Piece {
    /// Check the piece is usable. `index` is only used for the diagnostic.
    pub fn validate(&self, index: usize) -> Result<()> {
        let fail = |reason: String| Error::InvalidPiece {
            piece: index,
            reason,
        };

        if self.wave.is_empty() {
            return Err(fail("waveform is empty".into()));
        }
        if self.pitch.freqs.is_empty() {
            return Err(fail("pitch track is empty".into()));
        }
        if self.pitch.interval == 0 {
            return Err(fail("pitch track interval must be positive".into()));
        }
        if !(self.pitch.key.is_finite() && self.pitch.key > 0.0) {
            return Err(fail(format!(
                "key frequency {} must be positive",
                self.pitch.key
            )));
        }
        if self.alignment.len() < 2 {
            return Err(fail(format!(
                "alignment map needs at least 2 points, got {}",
                self.alignment.len()
            )));
        }
        if self
            .alignment
            .iter()
            .any(|p| !(p.src_ms.is_finite() && p.dst_ms.is_finite()))
        {
            return Err(fail("alignment map has non-finite times".into()));
        }
        // Period extraction and job layout both walk the map forward
        for (i, pair) in self.alignment.windows(2).enumerate() {
            let unordered = |axis, from: f32, to: f32| Error::UnorderedAlignment {
                piece: index,
                point: i + 1,
                axis,
                from,
                to,
            };
            if pair[1].src_ms < pair[0].src_ms {
                return Err(unordered("source", pair[0].src_ms, pair[1].src_ms));
            }
            if pair[1].dst_ms < pair[0].dst_ms {
                return Err(unordered("destination", pair[0].dst_ms, pair[1].dst_ms));
            }
        }
        Ok(())
    }
}

/// A point on one of the global timelines.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct ControlPoint {
    pub dst_ms: f32,
    pub value: f32,
}

impl ControlPoint {
    pub fn new(dst_ms: f32, value: f32) -> Self {
        Self { dst_ms, value }
    }
}

/// Everything needed to render one sentence.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SentenceDescriptor {
    pub pieces: Vec<Piece>,
    /// Fractional piece id over time
    pub piece_map: Vec<ControlPoint>,
    /// Output gain over time
    pub volume_map: Vec<ControlPoint>,
    /// Target pitch (Hz) over time
    pub freq_map: Vec<ControlPoint>,
}

impl SentenceDescriptor {
    pub fn validate(&self) -> Result<()> {
        if self.pieces.is_empty() {
            return Err(Error::InvalidPiece {
                piece: 0,
                reason: "sentence has no pieces".into(),
            });
        }
        for (i, piece) in self.pieces.iter().enumerate() {
            piece.validate(i)?;
        }
        check_timeline("piece_map", &self.piece_map)?;
        check_timeline("volume_map", &self.volume_map)?;
        Ok(())
    }
}

fn check_timeline(name: &str, points: &[ControlPoint]) -> Result<()> {
    if points.is_empty() {
        return Err(Error::InvalidTimeline(format!("{name} has no control points")));
    }
    if points
        .iter()
        .any(|p| !(p.dst_ms.is_finite() && p.value.is_finite()))
    {
        return Err(Error::InvalidTimeline(format!(
            "{name} has non-finite control points"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece() -> Piece {
        Piece {
            wave: vec![0.0; 4410],
            pitch: PitchTrack::constant(220.0, 256, 4410),
            alignment: vec![
                AlignmentPoint::new(0.0, 0.0, VoicingClass::Voiced),
                AlignmentPoint::new(100.0, 100.0, VoicingClass::Voiced),
            ],
        }
    }

    fn sentence() -> SentenceDescriptor {
        SentenceDescriptor {
            pieces: vec![piece()],
            piece_map: vec![ControlPoint::new(0.0, 0.0)],
            volume_map: vec![ControlPoint::new(0.0, 1.0)],
            freq_map: vec![ControlPoint::new(0.0, 220.0)],
        }
    }

    #[test]
    fn test_voicing_analyzed() {
        assert!(VoicingClass::Voiced.is_analyzed());
        assert!(VoicingClass::Transitional.is_analyzed());
        assert!(!VoicingClass::Unvoiced.is_analyzed());
        assert_eq!(VoicingClass::Unvoiced as u8, 2);
    }

    #[test]
    fn test_valid_sentence() {
        assert!(sentence().validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_sentence() {
        let desc = SentenceDescriptor {
            pieces: vec![],
            ..sentence()
        };
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_rejects_short_alignment() {
        let mut desc = sentence();
        desc.pieces[0].alignment.truncate(1);
        let err = desc.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidPiece { piece: 0, .. }));
    }

    #[test]
    fn test_rejects_decreasing_alignment() {
        let mut desc = sentence();
        desc.pieces[0].alignment[1].src_ms = -5.0;
        assert!(matches!(
            desc.validate().unwrap_err(),
            Error::UnorderedAlignment {
                piece: 0,
                point: 1,
                axis: "source",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_backward_destination_times() {
        let mut desc = sentence();
        desc.pieces[0].alignment = vec![
            AlignmentPoint::new(0.0, 0.0, VoicingClass::Voiced),
            AlignmentPoint::new(50.0, 80.0, VoicingClass::Voiced),
            AlignmentPoint::new(100.0, 60.0, VoicingClass::Voiced),
        ];
        let err = desc.validate().unwrap_err();
        assert!(matches!(
            err,
            Error::UnorderedAlignment {
                piece: 0,
                point: 2,
                axis: "destination",
                ..
            }
        ));

        // Holding still is allowed
        desc.pieces[0].alignment[2].dst_ms = 80.0;
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_rejects_empty_pitch_track() {
        let mut desc = sentence();
        desc.pieces[0].pitch.freqs.clear();
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_volume_map() {
        let mut desc = sentence();
        desc.volume_map.clear();
        assert!(matches!(
            desc.validate().unwrap_err(),
            Error::InvalidTimeline(_)
        ));
    }

    #[test]
    fn test_constant_pitch_track_covers_length() {
        let track = PitchTrack::constant(220.0, 256, 1000);
        assert!(track.freqs.len() * 256 > 1000 + 256);
    }
}
