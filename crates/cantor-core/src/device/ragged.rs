//! Ragged arrays: one flat allocation plus a span table.
//!
//! A list of variable-length items is never stored as independent
//! allocations. Items are packed back to back into a single
//! [`DeviceArray`] and addressed through [`Span`]s, so the whole structure
//! moves across the host boundary in one transfer.

use super::DeviceArray;

/// Location of one item inside a flat backing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub offset: usize,
    pub len: usize,
}

impl Span {
    #[inline]
    pub fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// One past the last element.
    #[inline]
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.end()
    }
}

/// Build a span table for items of the given lengths, packed in order.
pub fn spans_for(lens: &[usize]) -> Vec<Span> {
    let mut offset = 0;
    lens.iter()
        .map(|&len| {
            let span = Span::new(offset, len);
            offset += len;
            span
        })
        .collect()
}

/// Pack nested items into one flat vector plus their spans.
pub fn flatten<T: Copy>(items: &[Vec<T>]) -> (Vec<T>, Vec<Span>) {
    let lens: Vec<usize> = items.iter().map(Vec::len).collect();
    let spans = spans_for(&lens);
    let mut flat = Vec::with_capacity(spans.last().map_or(0, Span::end));
    for item in items {
        flat.extend_from_slice(item);
    }
    (flat, spans)
}

/// Inverse of [`flatten`].
pub fn unflatten<T: Copy>(flat: &[T], spans: &[Span]) -> Vec<Vec<T>> {
    spans.iter().map(|s| flat[s.range()].to_vec()).collect()
}

/// Variable-length items in one device allocation.
#[derive(Debug)]
pub struct RaggedArray<T> {
    pub(crate) data: DeviceArray<T>,
    pub(crate) spans: Vec<Span>,
}

impl<T: Copy + Send + Sync> RaggedArray<T> {
    /// Number of items.
    #[inline]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    #[inline]
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    #[inline]
    pub fn span(&self, index: usize) -> Span {
        self.spans[index]
    }

    /// Total element count across all items.
    #[inline]
    pub fn total_len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn item(&self, index: usize) -> &[T] {
        &self.data.as_slice()[self.spans[index].range()]
    }

    #[inline]
    pub fn item_mut(&mut self, index: usize) -> &mut [T] {
        let range = self.spans[index].range();
        &mut self.data.as_mut_slice()[range]
    }

    #[inline]
    pub fn flat(&self) -> &[T] {
        self.data.as_slice()
    }

    #[inline]
    pub fn flat_mut(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_flatten_packs_in_order() {
        let items = vec![vec![1, 2, 3], vec![], vec![4, 5]];
        let (flat, spans) = flatten(&items);

        assert_eq!(flat, vec![1, 2, 3, 4, 5]);
        assert_eq!(
            spans,
            vec![Span::new(0, 3), Span::new(3, 0), Span::new(3, 2)]
        );
        assert_eq!(unflatten(&flat, &spans), items);
    }

    #[test]
    fn test_spans_for_empty() {
        assert!(spans_for(&[]).is_empty());
        let (flat, spans) = flatten::<f32>(&[]);
        assert!(flat.is_empty());
        assert!(spans.is_empty());
    }

    #[test]
    fn test_span_range() {
        let span = Span::new(4, 3);
        assert_eq!(span.end(), 7);
        assert_eq!(span.range(), 4..7);
    }

    proptest! {
        #[test]
        fn prop_flatten_round_trips(
            items in proptest::collection::vec(proptest::collection::vec(any::<i32>(), 0..16), 0..32)
        ) {
            let (flat, spans) = flatten(&items);
            prop_assert_eq!(flat.len(), items.iter().map(Vec::len).sum::<usize>());
            for pair in spans.windows(2) {
                prop_assert_eq!(pair[0].end(), pair[1].offset);
            }
            prop_assert_eq!(unflatten(&flat, &spans), items);
        }
    }
}
