//! Live filtered projections over a table or another view.
//!
//! A [`FilterView`] selects a subset (and ordering) of its source's columns,
//! keeps only the source rows its filter formula accepts, and maintains its
//! own sort column and order. It never copies cell data: `indices` holds
//! source row numbers and every read goes back through the source.
//!
//! Views are live. On construction the view installs itself as an observer
//! of its source and from then on absorbs every change event, adjusting its
//! index vector incrementally and re-emitting in its own coordinates, which
//! is what lets views stack on views to arbitrary depth.
//!
//! ```
//! use livegrid::{Table, FilterView, ColumnMeta, DataType, SortOrder, Value, DataSource};
//! use std::rc::Rc;
//!
//! let table = Rc::new(Table::new(
//!     "student",
//!     vec![
//!         ColumnMeta::new("name", DataType::Str),
//!         ColumnMeta::new("marks", DataType::Int32),
//!     ],
//!     SortOrder::Ascending,
//! ).unwrap());
//! table.insert_row(vec!["Akash".into(), Value::Int32(80)]);
//! table.insert_row(vec!["Simmon".into(), Value::Int32(78)]);
//! table.insert_row(vec!["Jimmy".into(), Value::Int32(83)]);
//!
//! let toppers = FilterView::new(
//!     "topper students",
//!     table.clone(),
//!     &["name", "marks"],
//!     "isGreaterOrEqual($marks, 80)",
//!     "marks",
//!     SortOrder::Descending,
//! ).unwrap();
//!
//! assert_eq!(toppers.row_count(), 2);
//! assert_eq!(toppers.value_at(0, 0).unwrap(), Value::Str("Jimmy".into()));
//!
//! // the view follows the table by itself
//! table.insert_row(vec!["Martin".into(), Value::Int32(95)]);
//! assert_eq!(toppers.value_at(0, 0).unwrap(), Value::Str("Martin".into()));
//! ```

use crate::column::ColumnMeta;
use crate::error::Error;
use crate::events::{
    DataSource, Observers, SortOrder, TableEvent, ViewObserver, INVALID_INDEX,
};
use crate::expr::Program;
use crate::logging::{self, LogPause};
use crate::table::is_valid_table_name;
use crate::value::{value_greater, value_less, DataType, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

/// A derived projection that filters, reorders and re-sorts its source.
pub struct FilterView {
    name: RefCell<String>,
    raw_filter: String,
    /// Compiled filter; `None` accepts every row.
    program: Option<Program>,
    source: RefCell<Option<Weak<dyn DataSource>>>,
    /// Source column index of every selected column, in view order.
    selected: RefCell<Vec<usize>>,
    /// Source row indices passing the filter, sorted on the key column.
    indices: RefCell<Vec<usize>>,
    /// Index into `selected` of the sort column.
    key_column: Cell<usize>,
    sort_order: Cell<SortOrder>,
    process_events: Cell<bool>,
    observers: Observers,
    /// Kept for unregistering from the source on drop.
    self_weak: RefCell<Weak<FilterView>>,
}

impl FilterView {
    /// Builds a view over `source` and installs it as an observer.
    ///
    /// `column_names` picks and orders the visible columns; empty selects
    /// all of them in source order (duplicates are dropped). `filter_formula`
    /// must evaluate to a boolean, or be empty to accept every row.
    /// `sort_by` must name a selected column; empty sorts by the first one.
    ///
    /// Fails when the source is mid bulk-load or has no columns, when the
    /// view name is invalid, when a named column does not exist, or when the
    /// formula does not compile to a boolean.
    pub fn new(
        view_name: &str,
        source: Rc<dyn DataSource>,
        column_names: &[&str],
        filter_formula: &str,
        sort_by: &str,
        sort_order: SortOrder,
    ) -> Result<Rc<FilterView>, Error> {
        if source.is_sorting_paused() {
            logging::report(
                "FilterView ~ InvalidArgs",
                format!("`{}` passed to create view is not in ready state.", source.decorated_name()),
            );
            return Err(Error::InvalidArgument(format!(
                "source `{}` has sorting paused",
                source.name()
            )));
        }
        if source.column_count() == 0 {
            logging::report(
                "FilterView ~ NoColumn",
                format!(
                    "`{}` passed to create view `{view_name}` is empty.",
                    source.decorated_name()
                ),
            );
            return Err(Error::InvalidArgument(format!("source `{}` has no columns", source.name())));
        }
        if !is_valid_table_name(view_name) {
            logging::report("FilterView ~ Name", format!("Invalid view name `{view_name}`."));
            return Err(Error::InvalidArgument(format!("invalid view name `{view_name}`")));
        }

        let program = if filter_formula.is_empty() {
            None
        } else {
            let locker = LogPause::new();
            match Program::compile(filter_formula, &*source, DataType::Bool) {
                Ok(program) => {
                    drop(locker);
                    Some(program)
                }
                Err(e) => {
                    locker.resume();
                    logging::report(
                        "FilterView ~ FormulaEvaluation",
                        format!(
                            "Formula `{filter_formula}` passed to filter the `{}` in view `{view_name}` is invalid.",
                            source.decorated_name()
                        ),
                    );
                    return Err(e);
                }
            }
        };

        let selected = if column_names.is_empty() {
            (0..source.column_count()).collect::<Vec<_>>()
        } else {
            let mut picked = Vec::with_capacity(column_names.len());
            let mut seen = Vec::with_capacity(column_names.len());
            for &column_name in column_names {
                if seen.contains(&column_name) {
                    continue;
                }
                seen.push(column_name);
                match source.find_column(column_name) {
                    Some((index, _)) => picked.push(index),
                    None => {
                        logging::report(
                            "FilterView ~ InvalidArgs",
                            format!(
                                "Column `{column_name}` does not exist in `{}`.",
                                source.decorated_name()
                            ),
                        );
                        return Err(Error::InvalidArgument(format!(
                            "column `{column_name}` does not exist in source"
                        )));
                    }
                }
            }
            picked
        };

        let (key_column, sort_column_name) = if sort_by.is_empty() {
            let (name, _) = source
                .column_at(selected[0])
                .ok_or_else(|| Error::Unknown("source lost its columns".into()))?;
            (0, name)
        } else {
            let position = source
                .find_column(sort_by)
                .and_then(|(index, _)| selected.iter().position(|&c| c == index));
            match position {
                Some(position) => (position, sort_by.to_string()),
                None => {
                    logging::report(
                        "FilterView ~ InvalidArgs",
                        format!("Column `{sort_by}` does not exist in selected columns in the view."),
                    );
                    return Err(Error::InvalidArgument(format!(
                        "sort column `{sort_by}` is not part of the view"
                    )));
                }
            }
        };

        let indices = match &program {
            None => (0..source.row_count()).collect(),
            Some(program) => program.filter_rows(&*source)?,
        };

        let view = Rc::new(FilterView {
            name: RefCell::new(view_name.to_string()),
            raw_filter: filter_formula.to_string(),
            program,
            source: RefCell::new(Some(Rc::downgrade(&source))),
            selected: RefCell::new(selected),
            indices: RefCell::new(indices),
            key_column: Cell::new(key_column),
            sort_order: Cell::new(sort_order),
            process_events: Cell::new(true),
            observers: Observers::new(),
            self_weak: RefCell::new(Weak::new()),
        });
        *view.self_weak.borrow_mut() = Rc::downgrade(&view);
        source.install_observer(Rc::downgrade(&view) as Weak<dyn ViewObserver>);
        view.sort_by(&sort_column_name, sort_order);
        Ok(view)
    }

    /// All columns, no filter, ascending by the source's first column.
    pub fn select_all(
        view_name: &str,
        source: Rc<dyn DataSource>,
    ) -> Result<Rc<FilterView>, Error> {
        FilterView::new(view_name, source, &[], "", "", SortOrder::Ascending)
    }

    /// All columns, ascending by the first column, rows passing `formula`.
    pub fn filtered(
        view_name: &str,
        source: Rc<dyn DataSource>,
        formula: &str,
    ) -> Result<Rc<FilterView>, Error> {
        FilterView::new(view_name, source, &[], formula, "", SortOrder::Ascending)
    }

    fn source(&self) -> Option<Rc<dyn DataSource>> {
        self.source.borrow().as_ref()?.upgrade()
    }

    fn emit(&self, event: TableEvent) {
        if self.process_events.get() {
            self.observers.emit(&event);
        }
    }

    /// The filter text this view was built with; empty when unfiltered.
    pub fn filter_formula(&self) -> String {
        self.raw_filter.clone()
    }

    /// Renames the view. Unlike tables, views may be renamed; an invalid
    /// name is discarded.
    pub fn set_view_name(&self, view_name: &str) -> bool {
        if !is_valid_table_name(view_name) {
            return false;
        }
        *self.name.borrow_mut() = view_name.to_string();
        true
    }

    /// Number of installed observers still alive.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    fn value_comparator(&self) -> fn(&Value, &Value) -> bool {
        match self.sort_order.get() {
            SortOrder::Ascending => value_less,
            SortOrder::Descending => value_greater,
        }
    }

    /// Key cell of the source row `src_row`, read through the view's key
    /// column.
    fn key_of(&self, source: &dyn DataSource, src_row: usize) -> Option<Value> {
        let key_source_column = self.selected.borrow()[self.key_column.get()];
        source.value_at(src_row, key_source_column)
    }

    /// Maps a source row index to this view's logical index, or `None` when
    /// the row is not part of the view (or the view is detached).
    pub fn map_to_local(&self, src_row: usize) -> Option<usize> {
        let source = self.source()?;
        let key_data = self.key_of(&*source, src_row)?;
        self.map_to_local_with(src_row, &key_data)
    }

    /// Binary search over `indices` guided by `key_data`, narrowing until
    /// the entry is found or the range empties. The key-guided variant is
    /// what lets an update that changed the key column still find the row's
    /// pre-update position through its old value.
    fn map_to_local_with(&self, src_row: usize, key_data: &Value) -> Option<usize> {
        let source = self.source()?;
        let indices = self.indices.borrow();
        let less = self.value_comparator();
        let mut lower: i64 = 0;
        let mut upper: i64 = indices.len() as i64 - 1;
        while lower <= upper {
            let mid = ((lower + upper) / 2) as usize;
            if indices[mid] == src_row {
                return Some(mid);
            }
            let mid_key = self.key_of(&*source, indices[mid])?;
            if less(key_data, &mid_key) {
                upper = mid as i64 - 1;
            } else {
                lower = mid as i64 + 1;
            }
        }
        None
    }

    /// Stable upper-bound position for a row whose key cell is `key_data`:
    /// a new row lands after every row with an equal key.
    pub fn insertable_position(&self, key_data: &Value) -> usize {
        let Some(source) = self.source() else { return 0 };
        let less = self.value_comparator();
        let indices = self.indices.borrow();
        indices.partition_point(|&mid| match self.key_of(&*source, mid) {
            Some(mid_key) => !less(key_data, &mid_key),
            None => true,
        })
    }

    /// Reverses the row order when `sort_order` differs from the current
    /// order. Cheap path: no re-sort, observers get [`TableEvent::SourceReversed`].
    pub fn sort_by_order(&self, sort_order: SortOrder) {
        if self.sort_order.get() != sort_order {
            self.indices.borrow_mut().reverse();
            self.sort_order.set(sort_order);
            self.emit(TableEvent::SourceReversed);
        }
    }

    /// Re-sorts on `column_name` (which must be one of the view's columns,
    /// otherwise nothing happens), makes it the key column, and tells
    /// observers to rebuild.
    pub fn sort_by_column(&self, column_name: &str) {
        let Some(source) = self.source() else { return };
        let Some((local_index, _)) = self.find_column(column_name) else { return };
        let source_column = self.selected.borrow()[local_index];
        let less = self.value_comparator();
        {
            let mut indices = self.indices.borrow_mut();
            indices.sort_by(|&a, &b| {
                let Some(ka) = source.value_at(a, source_column) else {
                    return std::cmp::Ordering::Equal;
                };
                let Some(kb) = source.value_at(b, source_column) else {
                    return std::cmp::Ordering::Equal;
                };
                if less(&ka, &kb) {
                    std::cmp::Ordering::Less
                } else if less(&kb, &ka) {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            });
        }
        self.key_column.set(local_index);
        self.emit(TableEvent::Refresh);
    }

    /// Sets the order, then re-sorts by `column_name`.
    pub fn sort_by(&self, column_name: &str, sort_order: SortOrder) {
        self.sort_order.set(sort_order);
        self.sort_by_column(column_name);
    }

    /// Recomputes the whole view from its source: filter every row again,
    /// re-sort on the current key, then emit one refresh. Events stay
    /// paused during the internal re-sort so observers see a single event.
    pub fn refresh(&self) {
        let Some(source) = self.source() else { return };
        {
            let mut indices = self.indices.borrow_mut();
            match &self.program {
                None => *indices = (0..source.row_count()).collect(),
                Some(program) => {
                    *indices = program.filter_rows(&*source).unwrap_or_default();
                }
            }
        }
        self.process_events.set(false);
        if let Some((column_name, _)) = self.column_at(self.key_column.get()) {
            self.sort_by(&column_name, self.sort_order.get());
        }
        self.process_events.set(true);
        self.emit(TableEvent::Refresh);
    }

    fn on_row_inserted(&self, src_row: usize) {
        let Some(source) = self.source() else { return };
        {
            let mut indices = self.indices.borrow_mut();
            for index in indices.iter_mut() {
                if *index >= src_row {
                    *index += 1;
                }
            }
        }
        if let Some(program) = &self.program {
            if !program.matches(&*source, src_row).unwrap_or(false) {
                return;
            }
        }
        let Some(key_data) = self.key_of(&*source, src_row) else { return };
        let position = self.insertable_position(&key_data);
        self.indices.borrow_mut().insert(position, src_row);
        self.emit(TableEvent::RowInserted(position));
    }

    fn on_row_dropped(&self, src_row: usize) {
        let local = self.map_to_local(src_row);
        {
            let mut indices = self.indices.borrow_mut();
            if let Some(local) = local {
                indices.remove(local);
            }
            for index in indices.iter_mut() {
                if *index > src_row {
                    *index -= 1;
                }
            }
        }
        // forwarded even on a miss so nested views renumber too
        self.emit(TableEvent::RowDropped(local.unwrap_or(INVALID_INDEX)));
    }

    fn on_data_updated(&self, src_row: usize, src_column: usize, old: &Value) {
        let Some(source) = self.source() else { return };
        let key_source_column = self.selected.borrow()[self.key_column.get()];
        let filter_uses_column =
            self.program.as_ref().is_some_and(|p| p.references_column(src_column));
        let key_changed = src_column == key_source_column;
        let local = if key_changed {
            self.map_to_local_with(src_row, old)
        } else {
            self.map_to_local(src_row)
        };
        let row_exists = local.is_some();
        let passes = filter_uses_column
            && self
                .program
                .as_ref()
                .is_some_and(|p| p.matches(&*source, src_row).unwrap_or(false));

        // plain cell change, row stays where it is: relay in view coordinates
        if (!filter_uses_column || passes) && row_exists && !key_changed {
            let view_column = self.selected.borrow().iter().position(|&c| c == src_column);
            if let (Some(local), Some(view_column)) = (local, view_column) {
                self.emit(TableEvent::DataUpdated {
                    row: local,
                    column: view_column,
                    old: old.clone(),
                });
            }
            return;
        }
        // untouched by this view
        if (!filter_uses_column || !passes) && !row_exists {
            return;
        }
        // the row now satisfies the filter: enter at its sorted position
        if filter_uses_column && passes && !row_exists {
            let Some(key_data) = self.key_of(&*source, src_row) else { return };
            let position = self.insertable_position(&key_data);
            self.indices.borrow_mut().insert(position, src_row);
            self.emit(TableEvent::RowInserted(position));
            return;
        }
        // the row no longer satisfies the filter: leave
        if filter_uses_column && !passes {
            if let Some(local) = local {
                self.indices.borrow_mut().remove(local);
                self.emit(TableEvent::RowDropped(local));
            }
            return;
        }
        // key cell changed: the row moves to its new sorted position
        if let (Some(local), true) = (local, key_changed) {
            self.indices.borrow_mut().remove(local);
            self.emit(TableEvent::RowDropped(local));
            let Some(key_data) = self.key_of(&*source, src_row) else { return };
            let position = self.insertable_position(&key_data);
            self.indices.borrow_mut().insert(position, src_row);
            self.emit(TableEvent::RowInserted(position));
        }
    }

    fn on_column_transformed(&self, src_column: usize) {
        // the key column is always selected, so a key transform lands in the
        // refresh path as well
        if self.selected.borrow().contains(&src_column) {
            self.refresh();
        }
    }

    fn on_source_reversed(&self) {
        let Some(source) = self.source() else { return };
        let row_count = source.row_count();
        let mut indices = self.indices.borrow_mut();
        for index in indices.iter_mut() {
            *index = row_count - 1 - *index;
        }
    }

    fn on_source_destruct(&self) {
        self.observers.emit(&TableEvent::AboutToDestruct);
        self.indices.borrow_mut().clear();
        self.selected.borrow_mut().clear();
        self.key_column.set(INVALID_INDEX);
        *self.source.borrow_mut() = None;
    }
}

impl ViewObserver for FilterView {
    fn absorb(&self, event: &TableEvent) {
        match event {
            TableEvent::RowInserted(src_row) => self.on_row_inserted(*src_row),
            TableEvent::RowDropped(src_row) => self.on_row_dropped(*src_row),
            TableEvent::DataUpdated { row, column, old } => {
                self.on_data_updated(*row, *column, old)
            }
            TableEvent::ColumnTransformed(src_column) => {
                self.on_column_transformed(*src_column)
            }
            TableEvent::Refresh => self.refresh(),
            TableEvent::SourceReversed => self.on_source_reversed(),
            TableEvent::AboutToDestruct => self.on_source_destruct(),
        }
    }
}

impl DataSource for FilterView {
    fn name(&self) -> String {
        self.name.borrow().clone()
    }

    fn decorated_name(&self) -> String {
        format!("FilterView[{}]", self.name.borrow())
    }

    fn sorting_order(&self) -> SortOrder {
        self.sort_order.get()
    }

    fn is_sorting_paused(&self) -> bool {
        false
    }

    fn key_column(&self) -> usize {
        self.key_column.get()
    }

    fn row_count(&self) -> usize {
        self.indices.borrow().len()
    }

    fn column_count(&self) -> usize {
        self.selected.borrow().len()
    }

    fn find_column(&self, column_name: &str) -> Option<(usize, DataType)> {
        let source = self.source()?;
        let selected = self.selected.borrow();
        for (local_index, &source_index) in selected.iter().enumerate() {
            let (name, data_type) = source.column_at(source_index)?;
            if name == column_name {
                return Some((local_index, data_type));
            }
        }
        None
    }

    fn column_at(&self, column_index: usize) -> Option<(String, DataType)> {
        let source = self.source()?;
        let source_index = *self.selected.borrow().get(column_index)?;
        source.column_at(source_index)
    }

    fn column_meta(&self, column_index: usize) -> Option<ColumnMeta> {
        let source = self.source()?;
        let source_index = *self.selected.borrow().get(column_index)?;
        source.column_meta(source_index)
    }

    fn display_name(&self, column_index: usize) -> String {
        let Some(source) = self.source() else { return String::new() };
        let selected = self.selected.borrow();
        match selected.get(column_index) {
            Some(&source_index) => source.display_name(source_index),
            None => String::new(),
        }
    }

    fn value_at(&self, row_index: usize, column_index: usize) -> Option<Value> {
        let source = self.source()?;
        let src_row = *self.indices.borrow().get(row_index)?;
        let src_column = *self.selected.borrow().get(column_index)?;
        source.value_at(src_row, src_column)
    }

    fn install_observer(&self, observer: Weak<dyn ViewObserver>) {
        self.observers.install(observer);
    }

    fn uninstall_observer(&self, observer: &Weak<dyn ViewObserver>) {
        self.observers.uninstall(observer);
    }
}

impl Drop for FilterView {
    fn drop(&mut self) {
        self.observers.emit(&TableEvent::AboutToDestruct);
        if let Some(source) = self.source() {
            let weak = self.self_weak.borrow().clone() as Weak<dyn ViewObserver>;
            source.uninstall_observer(&weak);
        }
    }
}

impl std::fmt::Debug for FilterView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "FilterView {{ name: '{}', columns: {}, rows: {}, filter: '{}' }}",
            self.name.borrow(),
            self.column_count(),
            self.row_count(),
            self.raw_filter
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{register_function, FunctionInfo};
    use crate::table::Table;

    fn ensure_is_odd() {
        fn is_odd(args: &[Value]) -> Result<Value, Error> {
            Ok(Value::Bool(args[0].as_int32()? % 2 != 0))
        }
        register_function(
            "isOdd_i",
            FunctionInfo { function: is_odd, return_type: DataType::Bool, argc: 1 },
        );
    }

    fn student_table() -> Rc<Table> {
        let table = Rc::new(
            Table::new(
                "table",
                vec![
                    ColumnMeta::with_display("name", "your name", DataType::Str),
                    ColumnMeta::with_display("id", "your id", DataType::Int32),
                ],
                SortOrder::Ascending,
            )
            .unwrap(),
        );
        for (name, id) in [
            ("Keshav", 1),
            ("Hemant", 2),
            ("Hema", 3),
            ("Hema", 4),
            ("Aarati", 6),
            ("Chhatrapal", 5),
            ("Ketan", 8),
            ("Bhupendra", 7),
            ("Teman", 9),
            ("Janaki", 10),
        ] {
            table.insert_row(vec![name.into(), Value::Int32(id)]).unwrap();
        }
        table
    }

    fn column_values(view: &FilterView, column: usize) -> Vec<Value> {
        (0..view.row_count()).map(|r| view.value_at(r, column).unwrap()).collect()
    }

    fn is_sorted(source: &dyn DataSource, column: usize, order: SortOrder) -> bool {
        let values: Vec<Value> =
            (0..source.row_count()).map(|r| source.value_at(r, column).unwrap()).collect();
        values.windows(2).all(|pair| match order {
            SortOrder::Ascending => !value_greater(&pair[0], &pair[1]),
            SortOrder::Descending => !value_less(&pair[0], &pair[1]),
        })
    }

    #[test]
    fn test_construction_preconditions() {
        ensure_is_odd();
        let empty = Rc::new(Table::new("empty_table", vec![], SortOrder::Ascending).unwrap());
        assert!(FilterView::select_all("view", empty).is_err());

        let table = student_table();
        assert!(FilterView::select_all("@bad \\name/", table.clone()).is_err());
        // unknown filter column, unknown selected column, sort-by outside selection
        assert!(FilterView::filtered("view", table.clone(), "NOT(isEqual($xyz, 10))").is_err());
        assert!(FilterView::new("view", table.clone(), &["name", "num3"], "", "", SortOrder::Ascending)
            .is_err());
        assert!(FilterView::new("view", table.clone(), &["name"], "", "id", SortOrder::Ascending)
            .is_err());
        // non-boolean filter
        assert!(FilterView::filtered("view", table.clone(), "add($id, 1)").is_err());

        table.pause_sorting();
        assert!(FilterView::select_all("view", table.clone()).is_err());
        table.resume_sorting();
        assert!(FilterView::select_all("valid_view_name", table.clone()).is_ok());
    }

    #[test]
    fn test_selection_and_reorder() {
        let table = student_table();
        let view = FilterView::new(
            "my_view",
            table.clone(),
            &["id", "name"],
            "",
            "name",
            SortOrder::Ascending,
        )
        .unwrap();

        assert_eq!(view.row_count(), 10);
        assert_eq!(view.column_count(), 2);
        // columns swapped relative to the table
        assert_eq!(table.find_column("name").unwrap().0, 0);
        assert_eq!(view.find_column("name").unwrap().0, 1);
        assert_eq!(view.find_column("id").unwrap().0, 0);
        assert_eq!(view.key_column(), 1);
        for row in 0..view.row_count() {
            assert_eq!(table.value_at(row, 0), view.value_at(row, 1));
            assert_eq!(table.value_at(row, 1), view.value_at(row, 0));
        }
        // duplicates in the selection collapse
        let deduped = FilterView::new(
            "dedup",
            table.clone(),
            &["id", "id", "name"],
            "",
            "",
            SortOrder::Ascending,
        )
        .unwrap();
        assert_eq!(deduped.column_count(), 2);

        assert_eq!(view.display_name(0), "your id");
        assert_eq!(view.column_meta(1).unwrap().name, "name");
    }

    #[test]
    fn test_filtering_and_row_count() {
        ensure_is_odd();
        let table = student_table();

        let odd = FilterView::filtered("odd", table.clone(), "isOdd($id)").unwrap();
        assert_eq!(odd.row_count(), 5);
        assert_eq!(odd.filter_formula(), "isOdd($id)");
        for row in 0..odd.row_count() {
            assert_eq!(odd.value_at(row, 1).unwrap().as_int32().unwrap() % 2, 1);
        }

        let all = FilterView::filtered("always", table.clone(), "True").unwrap();
        assert_eq!(all.row_count(), 10);
        let none = FilterView::filtered("never", table.clone(), "False").unwrap();
        assert_eq!(none.row_count(), 0);

        // sort order flip on an empty view holds no surprises
        none.sort_by_order(SortOrder::Descending);
        assert_eq!(none.row_count(), 0);
    }

    #[test]
    fn test_sort_by_column_and_order() {
        let table = student_table();
        let view = FilterView::select_all("my_view", table.clone()).unwrap();
        assert_eq!(view.key_column(), 0);

        view.sort_by_column("non_existing_column");
        assert_eq!(view.key_column(), 0);

        view.sort_by_column("id");
        assert_eq!(view.key_column(), 1);
        assert_eq!(
            column_values(&view, 0),
            vec![
                Value::Str("Keshav".into()),
                Value::Str("Hemant".into()),
                Value::Str("Hema".into()),
                Value::Str("Hema".into()),
                Value::Str("Chhatrapal".into()),
                Value::Str("Aarati".into()),
                Value::Str("Bhupendra".into()),
                Value::Str("Ketan".into()),
                Value::Str("Teman".into()),
                Value::Str("Janaki".into()),
            ]
        );

        view.sort_by_order(SortOrder::Descending);
        assert_eq!(view.value_at(0, 0).unwrap(), Value::Str("Janaki".into()));
        assert!(is_sorted(&*view, 1, SortOrder::Descending));
    }

    #[test]
    fn test_insertion_event_propagates() {
        ensure_is_odd();
        let table = student_table();

        let by_name = FilterView::select_all("view", table.clone()).unwrap();
        by_name.sort_by_order(SortOrder::Descending);

        let by_id = FilterView::filtered("view", table.clone(), "isLess($id, 20)").unwrap();
        by_id.sort_by_column("id");

        assert_eq!(by_name.row_count(), 10);
        assert_eq!(by_id.row_count(), 10);

        table.insert_row(vec!["Ranga".into(), Value::Int32(23)]).unwrap();
        table.insert_row(vec!["Billa".into(), Value::Int32(19)]).unwrap();

        assert_eq!(by_name.row_count(), 12);
        assert_eq!(by_id.row_count(), 11);
        assert_eq!(by_name.value_at(9, 0).unwrap(), Value::Str("Billa".into()));
        assert_eq!(by_id.value_at(10, 0).unwrap(), Value::Str("Billa".into()));
        assert_eq!(table.value_at(2, 0).unwrap(), Value::Str("Billa".into()));
        assert!(is_sorted(&*by_name, 0, SortOrder::Descending));
        assert!(is_sorted(&*by_id, 1, SortOrder::Ascending));
    }

    #[test]
    fn test_drop_event_propagates() {
        ensure_is_odd();
        let table = student_table();

        let by_name = FilterView::select_all("by_name", table.clone()).unwrap();
        let by_id = FilterView::new(
            "by_id",
            table.clone(),
            &[],
            "isOdd($id)",
            "id",
            SortOrder::Descending,
        )
        .unwrap();

        assert_eq!(by_name.row_count(), 10);
        assert_eq!(by_id.row_count(), 5);

        table.drop_row(3); // Hema, id 3: in both views
        table.drop_row(5); // after the shift this is Janaki, id 10: by_name only

        assert_eq!(by_name.row_count(), 8);
        assert_eq!(by_id.row_count(), 4);
        assert_eq!(by_name.value_at(5, 0).unwrap(), Value::Str("Keshav".into()));
        assert_eq!(by_id.value_at(3, 0).unwrap(), Value::Str("Keshav".into()));
        assert_eq!(table.value_at(5, 0).unwrap(), Value::Str("Keshav".into()));
    }

    #[test]
    fn test_nested_views_after_table_drop() {
        ensure_is_odd();
        let table = student_table();

        let v1 = FilterView::select_all("v1", table.clone()).unwrap();
        let v2 = FilterView::new(
            "v2",
            v1.clone() as Rc<dyn DataSource>,
            &[],
            "isOdd($id)",
            "id",
            SortOrder::Descending,
        )
        .unwrap();

        assert_eq!(v1.row_count(), 10);
        assert_eq!(v2.row_count(), 5);

        // drop the second Hema (id 3 at logical index 3)
        assert!(table.drop_row(3));

        assert_eq!(v1.row_count(), 9);
        assert_eq!(v2.row_count(), 4);
        assert_eq!(v2.value_at(0, 0).unwrap(), Value::Str("Teman".into()));
        assert_eq!(v2.value_at(0, 1).unwrap(), Value::Int32(9));
    }

    #[test]
    fn test_data_update_reorders_views() {
        let table = Rc::new(
            Table::new(
                "simple_table",
                vec![
                    ColumnMeta::new("x", DataType::Int32),
                    ColumnMeta::new("y", DataType::Int32),
                    ColumnMeta::new("z", DataType::Int32),
                ],
                SortOrder::Ascending,
            )
            .unwrap(),
        );
        for i in 0..10 {
            table.insert_row(vec![Value::Int32(i), Value::Int32(i), Value::Int32(i)]);
        }
        let view1 = FilterView::select_all("view1", table.clone()).unwrap();
        let view2 = FilterView::select_all("view2", view1.clone() as Rc<dyn DataSource>).unwrap();
        view1.sort_by("y", SortOrder::Descending);
        view2.sort_by("z", SortOrder::Ascending);

        assert_eq!(view1.value_at(0, 0).unwrap(), Value::Int32(9));
        assert_eq!(view2.value_at(0, 0).unwrap(), Value::Int32(0));

        // {0,0,0} -> {0,100,0} rises to the top of view1, view2 unmoved
        table.set_data(0, 1, Value::Int32(100));
        assert_eq!(view1.value_at(0, 0).unwrap(), Value::Int32(0));
        assert_eq!(view2.value_at(0, 0).unwrap(), Value::Int32(0));

        // {5,5,5} -> {5,0,5} sinks to the bottom of view1
        table.set_data(5, 1, Value::Int32(0));
        assert_eq!(view1.value_at(9, 0).unwrap(), Value::Int32(5));
        assert_eq!(view2.value_at(9, 0).unwrap(), Value::Int32(9));

        // z changes do not move view1 but re-sort view2
        table.set_data(5, 2, Value::Int32(20));
        assert_eq!(view1.value_at(9, 0).unwrap(), Value::Int32(5));
        assert_eq!(view2.value_at(9, 0).unwrap(), Value::Int32(5));

        assert_eq!(view1.value_at(5, 0).unwrap(), Value::Int32(4));
        assert_eq!(view2.value_at(4, 0).unwrap(), Value::Int32(4));
        table.set_data(4, 2, Value::Int32(10));
        assert_eq!(view1.value_at(5, 0).unwrap(), Value::Int32(4));
        assert_eq!(view2.value_at(8, 0).unwrap(), Value::Int32(4));
    }

    #[test]
    fn test_update_cascade_through_filters() {
        ensure_is_odd();
        let table = Rc::new(
            Table::new(
                "simple_table",
                vec![
                    ColumnMeta::new("x", DataType::Int32),
                    ColumnMeta::new("y", DataType::Int32),
                    ColumnMeta::new("z", DataType::Int32),
                ],
                SortOrder::Ascending,
            )
            .unwrap(),
        );
        for i in 0..30 {
            table.insert_row(vec![Value::Int32(i), Value::Int32(i), Value::Int32(i)]);
        }
        let view1 = FilterView::filtered("view1", table.clone(), "isOdd($z)").unwrap();
        let view2 = FilterView::filtered(
            "view2",
            view1.clone() as Rc<dyn DataSource>,
            "isEqual(mod($y, 3), 0)",
        )
        .unwrap();

        assert_eq!(view1.row_count(), 15);
        assert_eq!(view2.row_count(), 5);
        assert_eq!(
            column_values(&view2, 1),
            vec![
                Value::Int32(3),
                Value::Int32(9),
                Value::Int32(15),
                Value::Int32(21),
                Value::Int32(27)
            ]
        );

        // {10,10,10} -> {10,100,10}: in neither view
        table.set_data(10, 1, Value::Int32(100));
        assert_eq!(view1.row_count(), 15);
        assert_eq!(view2.row_count(), 5);

        // {11,11,11} -> {11,100,11}: in view1, not view2
        table.set_data(11, 1, Value::Int32(100));
        assert_eq!(view1.row_count(), 15);
        assert_eq!(view2.row_count(), 5);

        // {13,13,13} -> {13,13,30}: leaves view1, view2 untouched
        table.set_data(13, 2, Value::Int32(30));
        assert_eq!(view1.row_count(), 14);
        assert_eq!(view2.row_count(), 5);
        assert_eq!(view2.value_at(4, 0).unwrap(), Value::Int32(27));

        // {14,14,14} -> {14,39,14}: affects neither (row not in view1 yet)
        table.set_data(14, 1, Value::Int32(39));
        assert_eq!(view1.row_count(), 14);
        assert_eq!(view2.row_count(), 5);

        // {14,39,14} -> {14,39,37}: enters view1 and, with y=39, view2
        table.set_data(14, 2, Value::Int32(37));
        assert_eq!(view1.row_count(), 15);
        assert_eq!(view2.row_count(), 6);
        assert_eq!(view1.value_at(6, 2).unwrap(), Value::Int32(37));
        assert_eq!(view2.value_at(2, 1).unwrap(), Value::Int32(39));

        // {15,15,15} -> {15,15,61}: stays in both
        table.set_data(15, 2, Value::Int32(61));
        assert_eq!(view1.row_count(), 15);
        assert_eq!(view2.row_count(), 6);
        assert_eq!(view1.value_at(7, 2).unwrap(), Value::Int32(61));
        assert_eq!(view2.value_at(3, 0).unwrap(), Value::Int32(15));

        // {15,15,61} -> {15,61,61}: leaves view2 only
        table.set_data(15, 1, Value::Int32(61));
        assert_eq!(view1.row_count(), 15);
        assert_eq!(view2.row_count(), 5);
        assert_eq!(view1.value_at(7, 2).unwrap(), Value::Int32(61));
        assert_eq!(view2.value_at(3, 0).unwrap(), Value::Int32(21));

        // {20,20,20} -> {20,20,91}: enters view1 only
        table.set_data(20, 2, Value::Int32(91));
        assert_eq!(view1.row_count(), 16);
        assert_eq!(view2.row_count(), 5);
        assert_eq!(view1.value_at(10, 2).unwrap(), Value::Int32(91));

        // both views re-key on y, in opposite orders
        view1.sort_by("y", SortOrder::Descending);
        table.set_data(27, 1, Value::Int32(15));
        assert_eq!(view1.row_count(), 16);
        assert_eq!(view2.row_count(), 5);
        assert_eq!(view1.value_at(10, 0).unwrap(), Value::Int32(27));
        assert_eq!(view2.value_at(4, 0).unwrap(), Value::Int32(27));

        view2.sort_by("y", SortOrder::Ascending);
        assert_eq!(view2.value_at(2, 0).unwrap(), Value::Int32(27));
    }

    #[test]
    fn test_column_transform_refreshes_views() {
        let table = student_table();
        let view = FilterView::new(
            "low_ids",
            table.clone(),
            &[],
            "isLess($id, 6)",
            "id",
            SortOrder::Ascending,
        )
        .unwrap();
        assert_eq!(view.row_count(), 5);

        // tripling every id leaves a single row under the < 6 filter
        assert!(table.transform_column("id", "mul($id, 3)"));
        assert_eq!(view.row_count(), 1);
        assert_eq!(view.value_at(0, 1).unwrap(), Value::Int32(3));
    }

    #[test]
    fn test_source_teardown_empties_views() {
        ensure_is_odd();
        let table = student_table();
        let v1 = FilterView::select_all("v1", table.clone()).unwrap();
        let v2 =
            FilterView::filtered("v2", v1.clone() as Rc<dyn DataSource>, "isOdd($id)").unwrap();
        assert_eq!(v2.row_count(), 5);

        drop(table);
        assert_eq!(v1.row_count(), 0);
        assert_eq!(v1.column_count(), 0);
        assert_eq!(v2.row_count(), 0);
        assert_eq!(v2.column_count(), 0);
        assert_eq!(v1.value_at(0, 0), None);
        assert!(v1.find_column("name").is_none());
        // detached views stay inert
        v1.refresh();
        v1.sort_by_order(SortOrder::Descending);
        assert_eq!(v1.row_count(), 0);
    }

    #[test]
    fn test_view_drop_unregisters_from_source() {
        let table = student_table();
        {
            let _view = FilterView::select_all("short_lived", table.clone()).unwrap();
            assert_eq!(table.observer_count(), 1);
        }
        assert_eq!(table.observer_count(), 0);
        // mutations after the view died must not misfire
        table.insert_row(vec!["Zara".into(), Value::Int32(42)]).unwrap();
        assert_eq!(table.row_count(), 11);
    }

    #[test]
    fn test_refresh_is_idempotent() {
        ensure_is_odd();
        let table = student_table();
        let view = FilterView::filtered("odd", table.clone(), "isOdd($id)").unwrap();
        let before: Vec<Value> = column_values(&view, 1);
        view.refresh();
        assert_eq!(column_values(&view, 1), before);
        view.refresh();
        assert_eq!(column_values(&view, 1), before);
    }

    #[test]
    fn test_map_to_local() {
        ensure_is_odd();
        let table = student_table();
        let odd = FilterView::filtered("odd", table.clone(), "isOdd($id)").unwrap();
        // view holds source rows with odd ids, sorted by name
        for row in 0..odd.row_count() {
            let src_row = odd.indices.borrow()[row];
            assert_eq!(odd.map_to_local(src_row), Some(row));
        }
        // an even-id row maps nowhere
        let even_row = table.search("id", &Value::Int32(2))[0];
        assert_eq!(odd.map_to_local(even_row), None);
    }

    #[test]
    fn test_set_view_name() {
        let table = student_table();
        let view = FilterView::select_all("first_name", table.clone()).unwrap();
        assert!(view.set_view_name("second name"));
        assert_eq!(view.name(), "second name");
        assert_eq!(view.decorated_name(), "FilterView[second name]");
        assert!(!view.set_view_name("bad\\name"));
        assert_eq!(view.name(), "second name");
    }
}
