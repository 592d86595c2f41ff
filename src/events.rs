//! Change events and the source/observer protocol that keeps views live.
//!
//! A table (or a view acting as a source) notifies the views installed on it
//! with one [`TableEvent`] per mutation, emitted only after its own state
//! matches the post-condition. A nested view absorbs the event, adjusts its
//! index vector, and re-emits for the views installed on it.
//!
//! Neither side owns the other: a view keeps a weak reference to its source
//! and a source keeps weak references to its observers. The client owns both
//! through `Rc`.

use crate::column::ColumnMeta;
use crate::value::{DataType, Value};
use std::cell::RefCell;
use std::rc::Weak;

/// Sentinel for "no such row", carried by forwarded drop events whose row
/// never existed in the forwarding view.
pub const INVALID_INDEX: usize = usize::MAX;

/// Row order maintained by a table or view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// A single change, described in the emitter's logical coordinates.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// A row appeared at this logical index; rows at and after it shifted up.
    RowInserted(usize),
    /// The row at this logical index disappeared; rows after it shifted down.
    /// Views forward the event even when the row never existed locally, with
    /// [`INVALID_INDEX`] as the payload.
    RowDropped(usize),
    /// One cell changed. `old` is the replaced value; observers keyed on
    /// `column` need it to locate the row's pre-update position.
    DataUpdated { row: usize, column: usize, old: Value },
    /// Every cell of one column changed at once.
    ColumnTransformed(usize),
    /// The emitter restructured wholesale; observers must rebuild.
    Refresh,
    /// The emitter reversed its row order without changing its key column.
    SourceReversed,
    /// The emitter is going away; observers must detach. Always delivered,
    /// even while event processing is paused.
    AboutToDestruct,
}

/// The reading surface a view needs from whatever it is stacked on.
///
/// Both [`Table`](crate::table::Table) and
/// [`FilterView`](crate::view::FilterView) implement this, which is what
/// makes nesting work: a view neither knows nor cares whether its source is
/// the root table or another view. Row and column indices are always in the
/// implementor's own logical coordinates.
pub trait DataSource {
    fn name(&self) -> String;

    /// `Table[name]` or `FilterView[name]`; used in log messages to tell the
    /// layers apart.
    fn decorated_name(&self) -> String;

    fn sorting_order(&self) -> SortOrder;

    /// True between `pause_sorting` and `resume_sorting`; a source in this
    /// state cannot be observed meaningfully.
    fn is_sorting_paused(&self) -> bool;

    /// Index of the column the row order is keyed on.
    fn key_column(&self) -> usize;

    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    /// Index and type of the named column.
    fn find_column(&self, column_name: &str) -> Option<(usize, DataType)>;

    /// Name and type of the column at `column_index`.
    fn column_at(&self, column_index: usize) -> Option<(String, DataType)>;

    fn column_meta(&self, column_index: usize) -> Option<ColumnMeta>;

    fn display_name(&self, column_index: usize) -> String;

    /// The cell at logical `(row, column)`, bounds-checked.
    fn value_at(&self, row_index: usize, column_index: usize) -> Option<Value>;

    fn install_observer(&self, observer: Weak<dyn ViewObserver>);

    fn uninstall_observer(&self, observer: &Weak<dyn ViewObserver>);
}

/// Receiver half of the protocol. A view implements this to absorb events
/// from its source.
pub trait ViewObserver {
    fn absorb(&self, event: &TableEvent);
}

/// Ordered list of weak observer references shared by every source.
#[derive(Default)]
pub(crate) struct Observers {
    entries: RefCell<Vec<Weak<dyn ViewObserver>>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Observers { entries: RefCell::new(Vec::new()) }
    }

    /// Appends `observer`; delivery happens in installation order. Dead
    /// entries are pruned on the way in.
    pub(crate) fn install(&self, observer: Weak<dyn ViewObserver>) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|w| w.strong_count() > 0);
        if !entries.iter().any(|w| w.ptr_eq(&observer)) {
            entries.push(observer);
        }
    }

    pub(crate) fn uninstall(&self, observer: &Weak<dyn ViewObserver>) {
        self.entries.borrow_mut().retain(|w| !w.ptr_eq(observer));
    }

    /// Delivers `event` to every live observer. The list is snapshotted
    /// first so an observer may install or uninstall during delivery.
    pub(crate) fn emit(&self, event: &TableEvent) {
        let snapshot: Vec<_> = self.entries.borrow().clone();
        for weak in snapshot {
            if let Some(observer) = weak.upgrade() {
                observer.absorb(event);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().iter().filter(|w| w.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Recorder {
        seen: RefCell<Vec<TableEvent>>,
    }

    impl Recorder {
        fn new() -> Rc<Self> {
            Rc::new(Recorder { seen: RefCell::new(Vec::new()) })
        }
    }

    impl ViewObserver for Recorder {
        fn absorb(&self, event: &TableEvent) {
            self.seen.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn test_emit_in_install_order() {
        let observers = Observers::new();
        let first = Recorder::new();
        let second = Recorder::new();
        observers.install(Rc::downgrade(&first) as Weak<dyn ViewObserver>);
        observers.install(Rc::downgrade(&second) as Weak<dyn ViewObserver>);
        assert_eq!(observers.len(), 2);

        observers.emit(&TableEvent::RowInserted(3));
        assert_eq!(first.seen.borrow().as_slice(), [TableEvent::RowInserted(3)]);
        assert_eq!(second.seen.borrow().as_slice(), [TableEvent::RowInserted(3)]);
    }

    #[test]
    fn test_install_is_idempotent() {
        let observers = Observers::new();
        let only = Recorder::new();
        let weak = Rc::downgrade(&only) as Weak<dyn ViewObserver>;
        observers.install(weak.clone());
        observers.install(weak);
        assert_eq!(observers.len(), 1);

        observers.emit(&TableEvent::Refresh);
        assert_eq!(only.seen.borrow().len(), 1);
    }

    #[test]
    fn test_uninstall_and_dead_observers() {
        let observers = Observers::new();
        let kept = Recorder::new();
        let dropped = Recorder::new();
        observers.install(Rc::downgrade(&kept) as Weak<dyn ViewObserver>);
        let dead = Rc::downgrade(&dropped) as Weak<dyn ViewObserver>;
        observers.install(dead.clone());

        observers.uninstall(&dead);
        observers.emit(&TableEvent::Refresh);
        assert_eq!(kept.seen.borrow().len(), 1);
        assert_eq!(dropped.seen.borrow().len(), 0);

        // an observer that died without uninstalling is skipped
        let transient = Recorder::new();
        observers.install(Rc::downgrade(&transient) as Weak<dyn ViewObserver>);
        drop(transient);
        observers.emit(&TableEvent::Refresh);
        assert_eq!(kept.seen.borrow().len(), 2);
    }
}
