//! Lazy prefix scans.

use std::collections::VecDeque;

use crate::entry::KvEntry;
use crate::error::KvResult;
use crate::key::Key;
use crate::traits::KvStore;

/// Options for [`KvStore::list`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListOptions {
    /// Yield keys in descending order.
    pub reverse: bool,
    /// Maximum number of entries yielded in total.
    pub limit: Option<usize>,
    /// Entries fetched from the store per page.
    pub batch_size: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            reverse: false,
            limit: None,
            batch_size: 100,
        }
    }
}

impl ListOptions {
    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Iterator over the entries under a prefix.
///
/// Pages are fetched on demand, each resuming after the last key yielded, so
/// no store lock is held between calls to `next`. Each page reflects the
/// store at the time it was fetched. The iterator is finite and cannot be
/// rewound; after an error it yields nothing further.
pub struct KvList<'a, S: KvStore + ?Sized> {
    store: &'a S,
    prefix: Key,
    options: ListOptions,
    cursor: Option<Key>,
    buffer: VecDeque<KvEntry>,
    yielded: usize,
    exhausted: bool,
}

impl<'a, S: KvStore + ?Sized> KvList<'a, S> {
    pub fn new(store: &'a S, prefix: Key, options: ListOptions) -> Self {
        Self {
            store,
            prefix,
            options,
            cursor: None,
            buffer: VecDeque::new(),
            yielded: 0,
            exhausted: false,
        }
    }

    fn remaining(&self) -> usize {
        match self.options.limit {
            Some(limit) => limit.saturating_sub(self.yielded),
            None => usize::MAX,
        }
    }

    fn fill(&mut self) -> KvResult<()> {
        let page_size = self.options.batch_size.max(1).min(self.remaining());
        let page = self.store.scan(
            &self.prefix,
            self.cursor.as_ref(),
            self.options.reverse,
            page_size,
        )?;
        if page.len() < page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = Some(last.key.clone());
        }
        self.buffer.extend(page);
        Ok(())
    }
}

impl<S: KvStore + ?Sized> Iterator for KvList<'_, S> {
    type Item = KvResult<KvEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining() == 0 {
            return None;
        }
        if self.buffer.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fill() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        let entry = self.buffer.pop_front()?;
        self.yielded += 1;
        Some(Ok(entry))
    }
}
