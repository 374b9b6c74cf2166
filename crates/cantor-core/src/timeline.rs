//! Piecewise-linear lookups over ordered breakpoints.
//!
//! All lookups in a render walk their timelines in increasing time, so a
//! cursor only ever moves forward. Queries outside the breakpoint range
//! clamp to the first/last point.

use crate::ControlPoint;

/// Forward-only position in a sorted breakpoint list.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    index: usize,
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locate `t` among `points` (sorted by `key`).
    ///
    /// Returns `(left, right, fraction)` with `fraction` clamped to [0, 1].
    /// A single breakpoint yields `(0, 0, 0.0)`. Successive calls must pass
    /// non-decreasing `t`.
    pub fn locate<P>(&mut self, points: &[P], t: f32, key: impl Fn(&P) -> f32) -> (usize, usize, f32) {
        if points.len() < 2 {
            return (0, 0, 0.0);
        }
        while self.index + 2 < points.len() && t >= key(&points[self.index + 1]) {
            self.index += 1;
        }
        let left = self.index;
        let right = left + 1;
        let t0 = key(&points[left]);
        let t1 = key(&points[right]);
        let span = t1 - t0;
        let k = if span > 0.0 {
            ((t - t0) / span).clamp(0.0, 1.0)
        } else if t >= t1 {
            1.0
        } else {
            0.0
        };
        (left, right, k)
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Linear interpolation, exact at both ends.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    if t <= 0.0 {
        a
    } else if t >= 1.0 {
        b
    } else {
        a + (b - a) * t
    }
}

/// A control-point timeline with a forward cursor.
#[derive(Debug, Clone)]
pub struct Timeline<'a> {
    points: &'a [ControlPoint],
    cursor: Cursor,
}

impl<'a> Timeline<'a> {
    pub fn new(points: &'a [ControlPoint]) -> Self {
        Self {
            points,
            cursor: Cursor::new(),
        }
    }

    /// Value at `t_ms`. Must be called with non-decreasing times.
    pub fn value_at(&mut self, t_ms: f32) -> f32 {
        match self.points {
            [] => 0.0,
            [only] => only.value,
            points => {
                let (l, r, k) = self.cursor.locate(points, t_ms, |p| p.dst_ms);
                lerp(points[l].value, points[r].value, k)
            }
        }
    }

    /// Whether the breakpoints span `[start_ms, end_ms]`.
    pub fn covers(&self, start_ms: f32, end_ms: f32) -> bool {
        match self.points {
            [] => false,
            [_] => true,
            points => points[0].dst_ms <= start_ms && points[points.len() - 1].dst_ms >= end_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn points() -> Vec<ControlPoint> {
        vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(10.0, 1.0),
            ControlPoint::new(20.0, 3.0),
        ]
    }

    #[test]
    fn test_interpolates_between_points() {
        let pts = points();
        let mut tl = Timeline::new(&pts);
        assert_eq!(tl.value_at(0.0), 0.0);
        assert!((tl.value_at(5.0) - 0.5).abs() < 1e-6);
        assert_eq!(tl.value_at(10.0), 1.0);
        assert!((tl.value_at(15.0) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_clamps_outside_range() {
        let pts = points();
        let mut tl = Timeline::new(&pts);
        assert_eq!(tl.value_at(-5.0), 0.0);
        assert_eq!(tl.value_at(100.0), 3.0);
        assert!(!tl.covers(-1.0, 20.0));
        assert!(tl.covers(0.0, 20.0));
    }

    #[test]
    fn test_single_point_is_constant() {
        let pts = vec![ControlPoint::new(50.0, 0.7)];
        let mut tl = Timeline::new(&pts);
        assert_eq!(tl.value_at(0.0), 0.7);
        assert_eq!(tl.value_at(1000.0), 0.7);
        assert!(tl.covers(0.0, 1000.0));
    }

    #[test]
    fn test_coincident_points_no_nan() {
        let pts = vec![
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(10.0, 1.0),
            ControlPoint::new(10.0, 2.0),
            ControlPoint::new(20.0, 2.0),
        ];
        let mut tl = Timeline::new(&pts);
        for t in [0.0, 9.9, 10.0, 10.1, 25.0] {
            assert!(tl.value_at(t).is_finite());
        }
    }

    #[test]
    fn test_lerp_exact_ends() {
        assert_eq!(lerp(1.0, f32::NAN, 0.0), 1.0);
        assert_eq!(lerp(f32::NAN, 2.0, 1.0), 2.0);
        assert_eq!(lerp(0.0, 2.0, 0.25), 0.5);
    }

    #[test]
    fn test_cursor_locate_forward_only() {
        let pts = [0.0f32, 1.0, 2.0, 3.0];
        let mut cursor = Cursor::new();
        assert_eq!(cursor.locate(&pts, 0.5, |&p| p), (0, 1, 0.5));
        assert_eq!(cursor.locate(&pts, 2.5, |&p| p), (2, 3, 0.5));
        assert_eq!(cursor.locate(&pts, 9.0, |&p| p), (2, 3, 1.0));
        assert_eq!(cursor.index(), 2);
    }

    proptest! {
        #[test]
        fn prop_value_stays_within_neighbours(
            steps in proptest::collection::vec((0.0f32..50.0, -10.0f32..10.0), 2..12),
            queries in proptest::collection::vec(-20.0f32..700.0, 1..64)
        ) {
            let mut t = 0.0;
            let pts: Vec<ControlPoint> = steps
                .iter()
                .map(|&(dt, v)| {
                    t += dt;
                    ControlPoint::new(t, v)
                })
                .collect();
            let lo = pts.iter().map(|p| p.value).fold(f32::INFINITY, f32::min);
            let hi = pts.iter().map(|p| p.value).fold(f32::NEG_INFINITY, f32::max);

            let mut queries = queries;
            queries.sort_by(f32::total_cmp);
            let mut tl = Timeline::new(&pts);
            for q in queries {
                let v = tl.value_at(q);
                prop_assert!(v.is_finite());
                prop_assert!(v >= lo - 1e-4 && v <= hi + 1e-4);
            }
        }

        #[test]
        fn prop_lerp_is_monotone_in_t(a in -100.0f32..100.0, b in -100.0f32..100.0, t0 in 0.0f32..1.0, t1 in 0.0f32..1.0) {
            let (t0, t1) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
            let (v0, v1) = (lerp(a, b, t0), lerp(a, b, t1));
            if b >= a {
                prop_assert!(v1 >= v0 - 1e-4);
            } else {
                prop_assert!(v1 <= v0 + 1e-4);
            }
        }
    }
}
