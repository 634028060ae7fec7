//! Block segmentation
//!
//! Splits a time-ordered series into maximal contiguous runs where a
//! predicate holds. Runs are strictly contiguous: a single false record ends
//! the block, there is no gap bridging.

/// A maximal run of consecutive records satisfying the predicate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block<'a, T> {
    /// Position of the first record in the segmented slice
    pub offset: usize,
    /// The records of the run (never empty)
    pub records: &'a [T],
}

impl<'a, T> Block<'a, T> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> &'a T {
        &self.records[0]
    }

    pub fn last(&self) -> &'a T {
        &self.records[self.records.len() - 1]
    }

    /// Collect one numeric column of the block
    pub fn column(&self, f: impl Fn(&T) -> f64) -> Vec<f64> {
        self.records.iter().map(f).collect()
    }
}

/// Lazy iterator over the blocks of a slice, see [`segment`]
pub struct Blocks<'a, T, P> {
    records: &'a [T],
    predicate: P,
    cursor: usize,
}

impl<'a, T, P> Iterator for Blocks<'a, T, P>
where
    P: FnMut(&T) -> bool,
{
    type Item = Block<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let records = self.records;

        while self.cursor < records.len() && !(self.predicate)(&records[self.cursor]) {
            self.cursor += 1;
        }
        if self.cursor >= records.len() {
            return None;
        }

        let start = self.cursor;
        while self.cursor < records.len() && (self.predicate)(&records[self.cursor]) {
            self.cursor += 1;
        }

        Some(Block {
            offset: start,
            records: &records[start..self.cursor],
        })
    }
}

/// Segment `records` into maximal runs where `predicate` is true.
///
/// A new block starts every time the predicate flips from false to true. No
/// true records means no blocks.
pub fn segment<T, P>(records: &[T], predicate: P) -> Blocks<'_, T, P>
where
    P: FnMut(&T) -> bool,
{
    Blocks {
        records,
        predicate,
        cursor: 0,
    }
}
