//! Pitch-synchronous period extraction.
//!
//! Each piece is scanned sample by sample over the span of its alignment
//! map. A running phase accumulates the normalized pitch (cycles/sample) and
//! a period is emitted every time its integer part advances, so periods sit
//! at fixed phase increments rather than fixed spacing.

use cantor_core::{lerp, Cursor, Piece, RenderConfig, VoicingClass};

use crate::{Error, Result};

/// One detected pitch period of a piece.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serialization",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct SourcePeriod {
    /// Centre of the period in the piece's waveform (sample index)
    pub src_pos: usize,
    /// Normalized pitch (cycles per sample)
    pub pitch: f32,
    /// Destination position (output sample, fractional)
    pub dst_pos: f32,
    pub voicing: VoicingClass,
}

impl SourcePeriod {
    /// Period length in samples.
    #[inline]
    pub fn half_window(&self) -> f32 {
        1.0 / self.pitch
    }
}

/// Identifies one period of one piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRef {
    pub piece: usize,
    pub period: usize,
}

/// Period lists of every piece plus the run-wide sizing they imply.
#[derive(Debug, Clone, Default)]
pub struct PeriodTable {
    pub pieces: Vec<Vec<SourcePeriod>>,
    /// Voiced/transitional periods, in piece then period order
    pub analyzed: Vec<PeriodRef>,
    /// Largest `1/pitch` over every period
    pub max_half_window: f32,
    /// Largest `3/pitch` over voiced/transitional periods
    pub max_detect_half_window: f32,
}

impl PeriodTable {
    /// Total number of periods across all pieces.
    pub fn total_periods(&self) -> usize {
        self.pieces.iter().map(Vec::len).sum()
    }

    /// Every period, in piece then period order.
    pub fn all_refs(&self) -> Vec<PeriodRef> {
        self.pieces
            .iter()
            .enumerate()
            .flat_map(|(piece, periods)| {
                (0..periods.len()).map(move |period| PeriodRef { piece, period })
            })
            .collect()
    }
}

/// Sample range `[start, end)` of the waveform covered by the alignment map.
pub fn source_range(piece: &Piece, sample_rate: f32) -> (usize, usize) {
    let (Some(first), Some(last)) = (piece.alignment.first(), piece.alignment.last()) else {
        return (0, 0);
    };
    let start = (first.src_ms * 0.001 * sample_rate).max(0.0) as usize;
    let end = (last.src_ms * 0.001 * sample_rate).ceil().max(0.0) as usize;
    (start, end)
}

/// Normalized pitch of the track at source sample `pos`.
fn pitch_at(piece: &Piece, pos: usize, config: &RenderConfig) -> f32 {
    let track = &piece.pitch;
    let last = track.freqs.len() - 1;
    let frame = pos as f32 / track.interval as f32;
    let index = frame as usize;
    let frac = frame - index as f32;

    let tracked = |i: usize| {
        let freq = track.freqs[i.min(last)];
        if freq <= config.min_tracked_freq {
            track.key
        } else {
            freq
        }
    };

    lerp(
        tracked(index) / config.sample_rate,
        tracked(index + 1) / config.sample_rate,
        frac,
    )
}

/// Period list of a single piece.
pub fn extract_periods(piece: &Piece, config: &RenderConfig) -> Vec<SourcePeriod> {
    let (start, end) = source_range(piece, config.sample_rate);
    let alignment = &piece.alignment;

    let mut periods = Vec::new();
    let mut cursor = Cursor::new();
    let mut phase = 0.0f32;

    for pos in start..end {
        let t_ms = config.samples_to_ms(pos as f32);
        let (left, right, k) = cursor.locate(alignment, t_ms, |p| p.src_ms);
        let dst_ms = lerp(alignment[left].dst_ms, alignment[right].dst_ms, k);
        let pitch = pitch_at(piece, pos, config);

        if phase as usize >= periods.len() {
            periods.push(SourcePeriod {
                src_pos: pos,
                pitch,
                dst_pos: config.ms_to_samples(dst_ms),
                voicing: alignment[left].voicing,
            });
        }
        phase += pitch;
    }

    periods
}

/// Extract period lists for every piece.
///
/// Fails with [`Error::EmptyPeriodList`] if a piece produces no period.
pub fn extract_all(pieces: &[Piece], config: &RenderConfig) -> Result<PeriodTable> {
    let mut table = PeriodTable::default();

    for (piece_index, piece) in pieces.iter().enumerate() {
        let periods = extract_periods(piece, config);
        if periods.is_empty() {
            return Err(Error::EmptyPeriodList { piece: piece_index });
        }

        for (period_index, period) in periods.iter().enumerate() {
            let half_window = period.half_window();
            table.max_half_window = table.max_half_window.max(half_window);

            if period.voicing.is_analyzed() {
                table.max_detect_half_window = table.max_detect_half_window.max(3.0 * half_window);
                table.analyzed.push(PeriodRef {
                    piece: piece_index,
                    period: period_index,
                });
            }
        }

        tracing::debug!(
            "Piece {}: {} periods ({} analyzed)",
            piece_index,
            periods.len(),
            periods.iter().filter(|p| p.voicing.is_analyzed()).count()
        );
        table.pieces.push(periods);
    }

    Ok(table)
}
