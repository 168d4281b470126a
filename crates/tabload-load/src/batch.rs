/// A bounded, ordered group of items loaded in one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<T> {
    /// 1-based position of the batch.
    pub index: usize,
    /// 1-based data row number of the first item.
    pub first_row: u64,
    pub items: Vec<T>,
}

impl<T> Batch<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_row(&self) -> u64 {
        self.first_row + self.items.len().saturating_sub(1) as u64
    }
}

/// Lazily splits an iterator into batches of `size`; the last may be shorter.
#[derive(Debug)]
pub struct Batches<I> {
    inner: I,
    size: usize,
    next_index: usize,
    next_row: u64,
}

pub fn batches<I: IntoIterator>(items: I, size: usize) -> Batches<I::IntoIter> {
    Batches {
        inner: items.into_iter(),
        size: size.max(1),
        next_index: 1,
        next_row: 1,
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Batch<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let items: Vec<I::Item> = self.inner.by_ref().take(self.size).collect();
        if items.is_empty() {
            return None;
        }

        let batch = Batch {
            index: self.next_index,
            first_row: self.next_row,
            items,
        };
        self.next_index += 1;
        self.next_row += batch.items.len() as u64;
        Some(batch)
    }
}
