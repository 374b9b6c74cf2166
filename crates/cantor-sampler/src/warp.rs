//! Destination timeline and time-warp job layout.
//!
//! Every segment gets a template clock running at its lowest target pitch.
//! The stretching map integrates `speed = pitch / min_pitch` per output
//! sample, so one template half-window (`1 / min_pitch` template samples)
//! always corresponds to one destination period.
//!
//! Jobs are laid out one template half-window apart. The overshoot of the
//! last job past a segment's end is carried as a phase into the next
//! segment, so period spacing continues across segment boundaries.

use cantor_analysis::SourcePeriod;
use cantor_core::{ControlPoint, Timeline};

use crate::FrequencyMap;

/// One contiguous output region with its own template clock.
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationSegment {
    /// First output sample
    pub start: usize,
    /// Output samples covered
    pub len: usize,
    /// Lowest target pitch in the segment (cycles per sample)
    pub min_pitch: f32,
    /// Template position reached after each output sample
    pub stretch: Vec<f32>,
    /// Final stretching map value
    pub template_len: f32,
    /// Template buffer size, `ceil(template_len)`
    pub template_size: usize,
    /// Offset of this segment's template buffer in the run-wide buffer
    pub template_offset: usize,
}

impl DestinationSegment {
    /// Build the stretching map of `pitch` (one segment's slice of the map).
    pub fn build(pitch: &[f32], start: usize, template_offset: usize) -> Self {
        let min_pitch = pitch.iter().cloned().fold(f32::INFINITY, f32::min);

        let mut pos = 0.0f32;
        let stretch: Vec<f32> = pitch
            .iter()
            .map(|&p| {
                pos += p / min_pitch;
                pos
            })
            .collect();
        let template_len = stretch.last().copied().unwrap_or(0.0);

        Self {
            start,
            len: pitch.len(),
            min_pitch,
            stretch,
            template_len,
            template_size: template_len.ceil() as usize,
            template_offset,
        }
    }

    /// Template half-window: one period at the segment's lowest pitch.
    #[inline]
    pub fn half_window(&self) -> f32 {
        1.0 / self.min_pitch
    }

    /// Random phases each job of this segment consumes.
    #[inline]
    pub fn phases_per_job(&self) -> usize {
        (self.half_window() * 0.5).ceil() as usize
    }

    /// First local sample whose template position reaches `center`,
    /// searching forward from `from`.
    fn seek(&self, from: usize, center: f32) -> usize {
        let mut pos = from;
        while pos + 1 < self.len && self.stretch[pos] < center {
            pos += 1;
        }
        pos
    }
}

/// Build every segment of a frequency map.
pub fn build_segments(map: &FrequencyMap) -> Vec<DestinationSegment> {
    let mut offset = 0;
    map.segments()
        .map(|range| {
            let segment = DestinationSegment::build(&map.pitch[range.clone()], range.start, offset);
            offset += segment.template_size;
            tracing::trace!(
                "Segment at {}: {} samples, min pitch {:.6}, template {:.1}",
                segment.start,
                segment.len,
                segment.min_pitch,
                segment.template_len
            );
            segment
        })
        .collect()
}

/// One source piece contributing to a job, with its bracketing periods.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub piece: usize,
    pub period: usize,
    pub next: usize,
    /// Blend from `period` (0.0) to `next` (1.0)
    pub fraction: f32,
}

/// One destination period to synthesize.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisJob {
    pub segment: usize,
    pub index_in_segment: usize,
    /// Template position of the fragment centre
    pub center: f32,
    /// Destination period length in output samples
    pub dest_half_window: f32,
    pub primary: Candidate,
    pub secondary: Option<Candidate>,
    /// Blend from `primary` (0.0) to `secondary` (1.0)
    pub piece_weight: f32,
}

/// All jobs of a render plus what synthesis needs to size its buffers.
#[derive(Debug, Clone, Default)]
pub struct JobPlan {
    pub jobs: Vec<SynthesisJob>,
    /// Random phases needed by the largest segment
    pub random_phase_len: usize,
    /// Template position of each segment's first job
    pub first_centers: Vec<f32>,
}

/// Bracketing periods of `pos` in one piece, advancing `cursor`.
fn bracket(piece: usize, periods: &[SourcePeriod], cursor: &mut usize, pos: f32) -> Candidate {
    while *cursor + 1 < periods.len() && periods[*cursor + 1].dst_pos < pos {
        *cursor += 1;
    }
    let period = *cursor;
    let next = (period + 1).min(periods.len() - 1);
    let d0 = periods[period].dst_pos;
    let d1 = periods[next].dst_pos;

    let fraction = if pos >= d1 {
        1.0
    } else if pos <= d0 {
        0.0
    } else {
        (pos - d0) / (d1 - d0)
    };

    Candidate {
        piece,
        period,
        next,
        fraction,
    }
}

/// Split a fractional piece id into `(piece0, piece1, weight)`.
///
/// A zero weight or a missing next piece selects `piece0` alone.
fn split_piece_id(value: f32, piece_count: usize) -> (usize, Option<usize>, f32) {
    let value = value.max(0.0);
    let whole = value.floor();
    let piece0 = (whole as usize).min(piece_count - 1);
    let piece1 = whole as usize + 1;
    let weight = value - whole;
    if weight == 0.0 || piece1 >= piece_count {
        (piece0, None, 0.0)
    } else {
        (piece0, Some(piece1), weight)
    }
}

/// Lay out synthesis jobs over every segment.
///
/// `periods` are the per-piece period lists; `piece_map` selects and blends
/// pieces over output time (ms).
pub fn plan_jobs(
    segments: &[DestinationSegment],
    map: &FrequencyMap,
    periods: &[Vec<SourcePeriod>],
    piece_map: &[ControlPoint],
    sample_rate: f32,
) -> JobPlan {
    let mut plan = JobPlan::default();
    if periods.is_empty() {
        return plan;
    }

    let mut piece_ids = Timeline::new(piece_map);
    let end_ms = map.len() as f32 / sample_rate * 1000.0;
    if !piece_ids.covers(0.0, end_ms) {
        tracing::warn!("piece_map does not cover the output, clamping at its ends");
    }

    let mut cursors = vec![0usize; periods.len()];
    let mut phase = 0.0f32;

    for (seg_index, segment) in segments.iter().enumerate() {
        let ht = segment.half_window();
        while phase > 0.0 {
            phase -= 1.0;
        }

        let mut center = phase * ht;
        plan.first_centers.push(center);

        let mut pos_local = 0;
        let mut index = 0;
        while center - ht <= segment.template_len {
            pos_local = segment.seek(pos_local, center);
            let pos_global = segment.start + pos_local;
            let pos = pos_global as f32;
            let t_ms = pos / sample_rate * 1000.0;

            let (piece0, piece1, weight) =
                split_piece_id(piece_ids.value_at(t_ms), periods.len());
            let primary = bracket(piece0, &periods[piece0], &mut cursors[piece0], pos);
            let secondary =
                piece1.map(|p| bracket(p, &periods[p], &mut cursors[p], pos));

            plan.jobs.push(SynthesisJob {
                segment: seg_index,
                index_in_segment: index,
                center,
                dest_half_window: 1.0 / map.pitch[pos_global],
                primary,
                secondary,
                piece_weight: weight,
            });

            index += 1;
            center += ht;
        }

        plan.random_phase_len = plan
            .random_phase_len
            .max(segment.phases_per_job() * index);
        phase = (center - segment.template_len) / ht;

        tracing::trace!(
            "Segment {}: {} jobs, carried phase {:.3}",
            seg_index,
            index,
            phase
        );
    }

    plan
}
