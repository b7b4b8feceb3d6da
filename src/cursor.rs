//! Lazy iteration over query results with guaranteed cursor release.
//!
//! ```no_run
//! use gdb_ext::{Gpkg, QueryFilter, RowExt, SearchExt};
//!
//! let gpkg = Gpkg::open_read_only("data/example.gpkg")?;
//! let layer = gpkg.open_layer("points")?;
//! let query = QueryFilter::new().with_where("name LIKE ?", ["a%"]);
//! for row in layer.search(Some(&query), false)? {
//!     let row = row?;
//!     println!("{:?}", row.get_value("name")?);
//! }
//! # Ok::<(), gdb_ext::GdbError>(())
//! ```

use crate::Result;
use crate::provider::{Cursor, Searchable};

/// Owns a cursor and releases it exactly once, at the latest when dropped.
pub struct CursorGuard<C: Cursor> {
    cursor: C,
    released: bool,
}

impl<C: Cursor> CursorGuard<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.cursor.release();
        }
    }

    fn next_row(&mut self) -> Result<Option<C::Row>> {
        if self.released {
            return Ok(None);
        }
        self.cursor.next_row()
    }
}

impl<C: Cursor> Drop for CursorGuard<C> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Iterator returned by [`search`].
///
/// Single pass: once it returns `None` (or an error) it stays exhausted and
/// the cursor has already been released.
pub struct SearchIter<C: Cursor> {
    guard: CursorGuard<C>,
    yielded: usize,
}

impl<C: Cursor> SearchIter<C> {
    fn finish(&mut self) {
        if !self.guard.is_released() {
            tracing::debug!(rows = self.yielded, "releasing cursor");
            self.guard.release();
        }
    }
}

impl<C: Cursor> Iterator for SearchIter<C> {
    type Item = Result<C::Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.guard.next_row() {
            Ok(Some(row)) => {
                self.yielded += 1;
                tracing::trace!(row = self.yielded, "cursor advanced");
                Some(Ok(row))
            }
            Ok(None) => {
                self.finish();
                None
            }
            Err(err) => {
                tracing::debug!(error = %err, "cursor advance failed");
                self.finish();
                Some(Err(err))
            }
        }
    }
}

impl<C: Cursor> std::iter::FusedIterator for SearchIter<C> {}

impl<C: Cursor> Drop for SearchIter<C> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Execute `query` on `container` right away and return a lazy sequence of
/// its rows.
///
/// `query = None` matches all rows. `recycling` is passed through to the
/// provider untouched; with providers that recycle rows, do not keep a row
/// past the next call to `next()`.
///
/// The cursor is released once the results are exhausted, after the first
/// provider error, or when the iterator is dropped early.
pub fn search<S>(
    container: &S,
    query: Option<&S::Query>,
    recycling: bool,
) -> Result<SearchIter<S::Cursor>>
where
    S: Searchable + ?Sized,
{
    let cursor = container.execute_query(query, recycling)?;
    tracing::debug!(recycling, filtered = query.is_some(), "query executed");
    Ok(SearchIter {
        guard: CursorGuard::new(cursor),
        yielded: 0,
    })
}

/// Method-call form of [`search`] for every [`Searchable`] container.
pub trait SearchExt: Searchable {
    fn search(
        &self,
        query: Option<&Self::Query>,
        recycling: bool,
    ) -> Result<SearchIter<Self::Cursor>> {
        search(self, query, recycling)
    }
}

impl<S: Searchable + ?Sized> SearchExt for S {}

#[cfg(test)]
mod tests {
    use super::{SearchExt, search};
    use crate::error::GdbError;
    use crate::provider::{Cursor, Searchable};
    use crate::{Result, Value};
    use std::cell::{Cell, RefCell};
    use std::collections::VecDeque;
    use std::rc::Rc;

    const RECYCLING: bool = true;

    #[derive(Default)]
    struct Calls {
        searches: RefCell<Vec<(Option<String>, bool)>>,
        advances: Cell<usize>,
        releases: Cell<usize>,
    }

    struct MockCursor {
        rows: VecDeque<Result<Value>>,
        calls: Rc<Calls>,
    }

    impl Cursor for MockCursor {
        type Row = Value;

        fn next_row(&mut self) -> Result<Option<Value>> {
            self.calls.advances.set(self.calls.advances.get() + 1);
            self.rows.pop_front().transpose()
        }

        fn release(&mut self) {
            self.calls.releases.set(self.calls.releases.get() + 1);
        }
    }

    struct MockFeatureClass {
        rows: RefCell<Option<Vec<Result<Value>>>>,
        calls: Rc<Calls>,
    }

    impl MockFeatureClass {
        fn with_rows(rows: Vec<Result<Value>>) -> Self {
            Self {
                rows: RefCell::new(Some(rows)),
                calls: Rc::new(Calls::default()),
            }
        }
    }

    impl Searchable for MockFeatureClass {
        type Query = String;
        type Cursor = MockCursor;

        fn execute_query(&self, query: Option<&String>, recycling: bool) -> Result<MockCursor> {
            self.calls
                .searches
                .borrow_mut()
                .push((query.cloned(), recycling));
            let rows = self
                .rows
                .borrow_mut()
                .take()
                .ok_or_else(|| GdbError::Message("searched twice".to_string()))?;
            Ok(MockCursor {
                rows: rows.into(),
                calls: Rc::clone(&self.calls),
            })
        }
    }

    fn rows(n: i64) -> Vec<Result<Value>> {
        (0..n).map(|i| Ok(Value::Integer(i))).collect()
    }

    #[test]
    fn empty_result_with_no_query_is_empty_and_released() -> Result<()> {
        let fc = MockFeatureClass::with_rows(Vec::new());

        let found = search(&fc, None, RECYCLING)?.collect::<Result<Vec<_>>>()?;

        assert!(found.is_empty());
        assert_eq!(fc.calls.releases.get(), 1);
        Ok(())
    }

    #[test]
    fn arguments_are_forwarded_to_the_provider_once() -> Result<()> {
        let fc = MockFeatureClass::with_rows(Vec::new());
        let query = "OWNER = 'city'".to_string();

        let found = fc.search(Some(&query), RECYCLING)?.count();

        assert_eq!(found, 0);
        assert_eq!(
            *fc.calls.searches.borrow(),
            vec![(Some(query), RECYCLING)]
        );
        Ok(())
    }

    #[test]
    fn query_runs_before_iteration_starts() -> Result<()> {
        let fc = MockFeatureClass::with_rows(rows(1));

        let iter = search(&fc, None, false)?;

        assert_eq!(fc.calls.searches.borrow().len(), 1);
        assert_eq!(fc.calls.advances.get(), 0);
        drop(iter);
        assert_eq!(fc.calls.releases.get(), 1);
        Ok(())
    }

    #[test]
    fn yields_every_row_in_order_then_releases_once() -> Result<()> {
        let fc = MockFeatureClass::with_rows(rows(2));
        let mut iter = search(&fc, None, RECYCLING)?;

        assert_eq!(iter.next().transpose()?, Some(Value::Integer(0)));
        assert_eq!(iter.next().transpose()?, Some(Value::Integer(1)));
        assert_eq!(fc.calls.releases.get(), 0);

        assert!(iter.next().is_none());
        assert_eq!(fc.calls.releases.get(), 1);

        // Fused, and dropping does not release again.
        assert!(iter.next().is_none());
        drop(iter);
        assert_eq!(fc.calls.releases.get(), 1);
        assert_eq!(fc.calls.advances.get(), 3);
        Ok(())
    }

    #[test]
    fn abandoning_early_still_releases_once() -> Result<()> {
        let fc = MockFeatureClass::with_rows(rows(5));

        let first_two = search(&fc, None, RECYCLING)?
            .take(2)
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(first_two, vec![Value::Integer(0), Value::Integer(1)]);
        assert_eq!(fc.calls.advances.get(), 2);
        assert_eq!(fc.calls.releases.get(), 1);
        Ok(())
    }

    #[test]
    fn provider_error_is_passed_through_and_releases() -> Result<()> {
        let fc = MockFeatureClass::with_rows(vec![
            Ok(Value::Integer(0)),
            Err(GdbError::Message("connection lost".to_string())),
            Ok(Value::Integer(2)),
        ]);
        let mut iter = search(&fc, None, false)?;

        assert!(matches!(iter.next(), Some(Ok(Value::Integer(0)))));
        match iter.next() {
            Some(Err(GdbError::Message(message))) => assert_eq!(message, "connection lost"),
            other => panic!("expected provider error, got {other:?}"),
        }
        assert_eq!(fc.calls.releases.get(), 1);

        assert!(iter.next().is_none());
        drop(iter);
        assert_eq!(fc.calls.releases.get(), 1);
        assert_eq!(fc.calls.advances.get(), 2);
        Ok(())
    }

    #[test]
    fn failed_query_returns_error_without_cursor() {
        let fc = MockFeatureClass::with_rows(Vec::new());
        let _ = search(&fc, None, false).expect("first search");

        let err = search(&fc, None, false).err().expect("second search fails");
        assert!(matches!(err, GdbError::Message(_)));
        assert_eq!(fc.calls.releases.get(), 1);
    }
}
