//! The columnar table engine.
//!
//! A [`Table`] owns typed columns plus a sorted primary index. Cells live at
//! stable *physical slots* inside the columns; the logical row order is the
//! `indices` vector, kept stably sorted on column 0 under the table's sort
//! order. Dropped rows park their slot on a free list for reuse; once the
//! free list reaches the tolerance threshold the columns are rebuilt densely.
//!
//! All mutators go through `&self`: internal state sits behind `Cell` and
//! `RefCell` so change events can cascade through observing views (which
//! read back through [`DataSource`]) while the mutation call is still on the
//! stack.
//!
//! ```
//! use livegrid::{Table, ColumnMeta, DataType, SortOrder, Value, DataSource};
//!
//! let table = Table::new(
//!     "student",
//!     vec![
//!         ColumnMeta::with_display("name", "Name", DataType::Str),
//!         ColumnMeta::with_display("age", "Age", DataType::Int32),
//!     ],
//!     SortOrder::Ascending,
//! )
//! .unwrap();
//!
//! table.insert_row(vec!["Keshav".into(), Value::Int32(25)]);
//! table.insert_row(vec!["Adil".into(), Value::Int32(18)]);
//!
//! // rows are kept sorted on the first column
//! assert_eq!(table.value_at(0, 0).unwrap(), Value::Str("Adil".into()));
//! ```

use crate::column::{Column, ColumnMeta};
use crate::error::Error;
use crate::events::{DataSource, Observers, SortOrder, TableEvent, ViewObserver};
use crate::expr::Program;
use crate::logging::{self, LogPause};
use crate::value::{DataType, Value};
use std::cell::{Cell, RefCell};
use std::rc::Weak;

/// Free slots tolerated before a drop triggers compaction.
const DEFAULT_FREE_TOLERANCE: usize = 64;

/// A valid column name starts with a letter or underscore and continues
/// with letters, digits and underscores. Nothing else, or formulas could
/// not reference the column.
pub fn is_valid_column_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A valid table name starts with a letter or underscore and continues with
/// printable characters other than `/` and `\`. Spaces are allowed; tabs and
/// newlines are not.
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c != '/' && c != '\\' && !c.is_control())
}

/// Root store: typed columns, a sorted primary index and a free-slot list.
pub struct Table {
    name: String,
    sort_order: SortOrder,
    columns: RefCell<Vec<Column>>,
    /// Logical row order; holds the physical slot of every live row.
    indices: RefCell<Vec<usize>>,
    /// Physical slots ready for reuse, most recently freed last.
    free: RefCell<Vec<usize>>,
    max_free_tolerance: Cell<usize>,
    sorting_paused: Cell<bool>,
    process_events: Cell<bool>,
    observers: Observers,
}

impl Table {
    /// Builds a table from a schema. The first column is the key column and
    /// its order is fixed for the table's lifetime. Fails on an invalid
    /// table name, an invalid or duplicate column name.
    pub fn new(
        table_name: &str,
        column_list: Vec<ColumnMeta>,
        sort_order: SortOrder,
    ) -> Result<Table, Error> {
        if !is_valid_table_name(table_name) {
            logging::report("Table ~ Name", format!("Invalid table name `{table_name}`."));
            return Err(Error::InvalidArgument(format!("invalid table name `{table_name}`")));
        }

        for (i, meta) in column_list.iter().enumerate() {
            if !is_valid_column_name(&meta.name) {
                logging::report(
                    "Table ~ Name",
                    format!(
                        "Invalid column name `{}` at index {i} given to create table `{table_name}`.",
                        meta.name
                    ),
                );
                return Err(Error::InvalidArgument(format!("invalid column name `{}`", meta.name)));
            }
            if let Some(j) = column_list[i + 1..].iter().position(|m| m.name == meta.name) {
                logging::report(
                    "Table ~ Name",
                    format!(
                        "Duplicate column name `{}` found at index {i} and at index {} given to create table `{table_name}`.",
                        meta.name,
                        i + 1 + j
                    ),
                );
                return Err(Error::InvalidArgument(format!(
                    "duplicate column name `{}`",
                    meta.name
                )));
            }
        }

        let columns = column_list.into_iter().map(Column::new).collect();
        Ok(Table {
            name: table_name.to_string(),
            sort_order,
            columns: RefCell::new(columns),
            indices: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
            max_free_tolerance: Cell::new(DEFAULT_FREE_TOLERANCE),
            sorting_paused: Cell::new(false),
            process_events: Cell::new(true),
            observers: Observers::new(),
        })
    }

    fn emit(&self, event: TableEvent) {
        if self.process_events.get() {
            self.observers.emit(&event);
        }
    }

    /// Physical capacity shared by every column.
    fn capacity(&self) -> usize {
        self.indices.borrow().len() + self.free.borrow().len()
    }

    /// True between [`pause_sorting`](Table::pause_sorting) and
    /// [`resume_sorting`](Table::resume_sorting).
    pub fn is_sorting_paused(&self) -> bool {
        self.sorting_paused.get()
    }

    /// Suspends sorting and event delivery for a bulk load. Inserted rows
    /// append unsorted until [`resume_sorting`](Table::resume_sorting).
    pub fn pause_sorting(&self) {
        self.process_events.set(false);
        self.sorting_paused.set(true);
    }

    /// Re-sorts once, resumes event delivery, and emits a refresh.
    pub fn resume_sorting(&self) {
        if self.sorting_paused.get() {
            self.process_events.set(true);
            self.sort();
            self.sorting_paused.set(false);
        }
    }

    /// Upper-bound position for `slot` in the logical order: the count of
    /// rows strictly ahead of it, so equal keys keep insertion order.
    fn insertion_position(&self, slot: usize) -> usize {
        let columns = self.columns.borrow();
        let key = &columns[0];
        let indices = self.indices.borrow();
        match self.sort_order {
            SortOrder::Ascending => indices.partition_point(|&mid| !key.is_less(slot, mid)),
            SortOrder::Descending => indices.partition_point(|&mid| !key.is_greater(slot, mid)),
        }
    }

    /// Inserts one row. `values` must carry one value per column, each with
    /// the column's type. Returns the logical index the row landed at, or
    /// `None` after logging the failure. While sorting is paused the row is
    /// appended at the end instead of binary-inserted.
    pub fn insert_row(&self, values: Vec<Value>) -> Option<usize> {
        {
            let columns = self.columns.borrow();
            if columns.is_empty() || values.len() != columns.len() {
                logging::report(
                    &format!("{} ~ InvalidArgs", self.decorated_name()),
                    "Invalid number of values are given to insert.",
                );
                return None;
            }
            for (value, column) in values.iter().zip(columns.iter()) {
                if value.data_type() != column.data_type() {
                    logging::report(
                        &format!("{} ~ DataType", self.decorated_name()),
                        "Couldn't insert the row, insertion failed due to `type mismatch`.",
                    );
                    return None;
                }
            }
        }

        let slot = {
            let mut columns = self.columns.borrow_mut();
            let reused = self.free.borrow().last().copied();
            match reused {
                Some(slot) => {
                    for (column, value) in columns.iter_mut().zip(values) {
                        // tags were checked above, the slot is in range
                        let _ = column.set(slot, value);
                    }
                    self.free.borrow_mut().pop();
                    slot
                }
                None => {
                    let slot = columns[0].len();
                    for (column, value) in columns.iter_mut().zip(values) {
                        let _ = column.push(value);
                    }
                    slot
                }
            }
        };

        if self.sorting_paused.get() {
            let mut indices = self.indices.borrow_mut();
            indices.push(slot);
            Some(indices.len() - 1)
        } else {
            let position = self.insertion_position(slot);
            self.indices.borrow_mut().insert(position, slot);
            self.emit(TableEvent::RowInserted(position));
            Some(position)
        }
    }

    /// Removes the row at `row_index`. The freed slot is reclaimable; once
    /// enough slots pile up the columns are compacted. Compaction happens
    /// after the drop event has fully propagated and emits nothing itself.
    pub fn drop_row(&self, row_index: usize) -> bool {
        {
            let mut indices = self.indices.borrow_mut();
            if row_index >= indices.len() {
                return false;
            }
            let slot = indices.remove(row_index);
            self.free.borrow_mut().push(slot);
        }
        self.emit(TableEvent::RowDropped(row_index));
        if self.max_free_tolerance.get() <= self.free.borrow().len() {
            self.compact();
        }
        true
    }

    /// Rebuilds every column with live cells in logical order and resets the
    /// index map to the identity. Physical slot identities change here, but
    /// no logical index does, so observers are not told.
    fn compact(&self) {
        let slots: Vec<usize> = self.indices.borrow().clone();
        let mut columns = self.columns.borrow_mut();
        for column in columns.iter_mut() {
            *column = column.compacted(&slots);
        }
        let mut indices = self.indices.borrow_mut();
        for (i, slot) in indices.iter_mut().enumerate() {
            *slot = i;
        }
        self.free.borrow_mut().clear();
    }

    /// Overwrites one cell. Rejects the key column (column 0), out-of-range
    /// indices and mismatched tags. The emitted event carries the replaced
    /// value so views keyed on this column can find the old position.
    pub fn set_data(&self, row_index: usize, column_index: usize, value: Value) -> bool {
        let old = {
            let mut columns = self.columns.borrow_mut();
            let indices = self.indices.borrow();
            if column_index == 0
                || row_index >= indices.len()
                || column_index >= columns.len()
                || columns[column_index].data_type() != value.data_type()
            {
                return false;
            }
            let slot = indices[row_index];
            let old = columns[column_index].get(slot);
            if columns[column_index].set(slot, value).is_err() {
                return false;
            }
            match old {
                Some(old) => old,
                None => return false,
            }
        };
        self.emit(TableEvent::DataUpdated { row: row_index, column: column_index, old });
        true
    }

    /// Finds all rows whose cell in `column_name` equals `value` under the
    /// column's equality. The key column is binary-searched and the equality
    /// run expanded; other columns scan linearly. An unknown column or a
    /// mismatched tag yields no rows.
    pub fn search(&self, column_name: &str, value: &Value) -> Vec<usize> {
        if self.row_count() == 0 {
            return Vec::new();
        }
        let Some((column_index, data_type)) = self.find_column(column_name) else {
            return Vec::new();
        };
        if data_type != value.data_type() {
            return Vec::new();
        }
        if column_index == 0 {
            return self.search_key_column(value);
        }
        let columns = self.columns.borrow();
        let column = &columns[column_index];
        let indices = self.indices.borrow();
        indices
            .iter()
            .enumerate()
            .filter(|&(_, &slot)| column.is_equal_value(slot, value))
            .map(|(row, _)| row)
            .collect()
    }

    /// Binary search over the sorted key column, then a linear walk across
    /// the run of equal keys in both directions.
    pub fn search_key_column(&self, value: &Value) -> Vec<usize> {
        let columns = self.columns.borrow();
        let indices = self.indices.borrow();
        let n = indices.len();
        if n == 0 {
            return Vec::new();
        }
        let key = &columns[0];
        if key.data_type() != value.data_type() {
            return Vec::new();
        }

        let mut index = match self.sort_order {
            SortOrder::Ascending => indices.partition_point(|&slot| key.is_less_value(slot, value)),
            SortOrder::Descending => {
                indices.partition_point(|&slot| key.is_greater_value(slot, value))
            }
        };
        if index == n {
            index -= 1;
            if !key.is_equal_value(indices[index], value) {
                return Vec::new();
            }
        }

        let mut start = index;
        while start > 0 && key.is_equal_value(indices[start - 1], value) {
            start -= 1;
        }
        let mut end = index;
        while end < n && key.is_equal_value(indices[end], value) {
            end += 1;
        }
        (start..end).collect()
    }

    /// Recompiles every cell of a column from `formula` (which may read any
    /// column, including the one being transformed). Transforming the key
    /// column triggers a full re-sort; any other column announces itself to
    /// observers instead.
    pub fn transform_column(&self, column_name: &str, formula: &str) -> bool {
        let Some((column_index, data_type)) = self.find_column(column_name) else {
            logging::report(
                &format!("{} ~ Name", self.decorated_name()),
                format!("Given column name `{column_name}` to transform doesn't exist in this table."),
            );
            return false;
        };

        let locker = LogPause::new();
        let program = match Program::compile(formula, self, data_type) {
            Ok(program) => program,
            Err(_) => {
                locker.resume();
                logging::report(
                    &format!("{} ~ ExpressionEvaluator", self.decorated_name()),
                    format!(
                        "Given formula `{formula}` to transform column `{column_name}` is invalid."
                    ),
                );
                return false;
            }
        };
        drop(locker);

        if !self.fill_column(column_index, &program) {
            return false;
        }
        if column_index == 0 {
            self.sort();
        } else {
            self.emit(TableEvent::ColumnTransformed(column_index));
        }
        true
    }

    /// Evaluates `program` row by row, writing each result into the column's
    /// physical slot. Row `r` sees the already-updated cells of rows before
    /// it, which is what lets a formula reference its own column.
    fn fill_column(&self, column_index: usize, program: &Program) -> bool {
        for row_index in 0..self.row_count() {
            let value = match program.evaluate(self, row_index) {
                Ok(value) => value,
                Err(e) => {
                    logging::report(
                        &format!("{} ~ ExpressionEvaluator", self.decorated_name()),
                        format!("Formula evaluation failed at row {row_index}: {e}."),
                    );
                    return false;
                }
            };
            let slot = self.indices.borrow()[row_index];
            if self.columns.borrow_mut()[column_index].set(slot, value).is_err() {
                return false;
            }
        }
        true
    }

    fn validate_new_column(&self, meta: &ColumnMeta) -> bool {
        if !is_valid_column_name(&meta.name) {
            logging::report(
                &format!("{} ~ Name", self.decorated_name()),
                format!(
                    "Invalid column name `{}` is passed to add new column to the table. Ignoring it, column is not added.",
                    meta.name
                ),
            );
            return false;
        }
        if self.find_column(&meta.name).is_some() {
            logging::report(
                &format!("{} ~ Name", self.decorated_name()),
                format!(
                    "Column name `{}` passed to add new column, already exists in this table. Ignoring it, column is not added.",
                    meta.name
                ),
            );
            return false;
        }
        true
    }

    fn finish_added_column(&self) {
        if self.columns.borrow().len() == 1 {
            // the very first column becomes the key column
            self.sort();
        }
    }

    /// Appends a column, filling every live row with `fill_with`.
    pub fn add_column(&self, meta: ColumnMeta, fill_with: Value) -> bool {
        if !self.validate_new_column(&meta) {
            return false;
        }
        if fill_with.data_type() != meta.data_type {
            logging::report(
                &format!("{} ~ InvalidArgs", self.decorated_name()),
                format!(
                    "Couldn't add column `{}` due to type mismatch. Note passed datatype is `{}` and passed data `{fill_with}` has type `{}`.",
                    meta.name,
                    meta.data_type,
                    fill_with.data_type()
                ),
            );
            return false;
        }

        let mut column = Column::new(meta);
        column.resize(self.capacity());
        for &slot in self.indices.borrow().iter() {
            // resized to capacity above, the tag was checked
            let _ = column.set(slot, fill_with.clone());
        }
        self.columns.borrow_mut().push(column);
        self.finish_added_column();
        true
    }

    /// Appends a column whose cells come from evaluating `formula` per row.
    /// The formula may reference the new column itself; it reads default
    /// cells. With no rows present the formula is not even compiled.
    pub fn add_column_expr(&self, meta: ColumnMeta, formula: &str) -> bool {
        if !self.validate_new_column(&meta) {
            return false;
        }
        let data_type = meta.data_type;
        let column_name = meta.name.clone();
        let mut column = Column::new(meta);
        column.resize(self.capacity());
        self.columns.borrow_mut().push(column);
        let column_index = self.columns.borrow().len() - 1;

        if self.row_count() > 0 {
            let locker = LogPause::new();
            let program = match Program::compile(formula, self, data_type) {
                Ok(program) => program,
                Err(_) => {
                    locker.resume();
                    logging::report(
                        &format!("{} ~ ExpressionEvaluator", self.decorated_name()),
                        format!(
                            "Given formula `{formula}` to add new column `{column_name}` is invalid."
                        ),
                    );
                    self.columns.borrow_mut().pop();
                    return false;
                }
            };
            drop(locker);
            if !self.fill_column(column_index, &program) {
                self.columns.borrow_mut().pop();
                return false;
            }
        }
        self.finish_added_column();
        true
    }

    /// Appends a column whose cells come from calling `generator` with each
    /// logical row index. A generator error abandons the column.
    pub fn add_column_with<F>(&self, meta: ColumnMeta, mut generator: F) -> bool
    where
        F: FnMut(usize) -> Result<Value, Error>,
    {
        if !self.validate_new_column(&meta) {
            return false;
        }
        let column_name = meta.name.clone();
        let mut column = Column::new(meta);
        column.resize(self.capacity());

        for row_index in 0..self.row_count() {
            let produced = generator(row_index).and_then(|value| {
                let slot = self.indices.borrow()[row_index];
                column.set(slot, value)
            });
            if produced.is_err() {
                logging::report(
                    &format!("{} ~ InvalidArgs", self.decorated_name()),
                    format!(
                        "Bad argument is passed to add new column `{column_name}`. Ignoring it, column is not added."
                    ),
                );
                return false;
            }
        }
        self.columns.borrow_mut().push(column);
        self.finish_added_column();
        true
    }

    /// Stable sort of the logical order by the key column, then a refresh
    /// notification.
    pub fn sort(&self) {
        {
            let columns = self.columns.borrow();
            if columns.is_empty() {
                return;
            }
            let key = &columns[0];
            let mut indices = self.indices.borrow_mut();
            match self.sort_order {
                SortOrder::Ascending => indices.sort_by(|&a, &b| {
                    if key.is_less(a, b) {
                        std::cmp::Ordering::Less
                    } else if key.is_less(b, a) {
                        std::cmp::Ordering::Greater
                    } else {
                        std::cmp::Ordering::Equal
                    }
                }),
                SortOrder::Descending => indices.sort_by(|&a, &b| {
                    if key.is_greater(a, b) {
                        std::cmp::Ordering::Less
                    } else if key.is_greater(b, a) {
                        std::cmp::Ordering::Greater
                    } else {
                        std::cmp::Ordering::Equal
                    }
                }),
            }
        }
        self.emit(TableEvent::Refresh);
    }

    /// Pre-allocates for `row_count` additional rows.
    pub fn reserve(&self, row_count: usize) {
        self.indices.borrow_mut().reserve(row_count);
        for column in self.columns.borrow_mut().iter_mut() {
            column.reserve(row_count);
        }
    }

    /// Sets the float-equality epsilon on a column. Ignored for unknown
    /// columns and non-float columns.
    pub fn set_epsilon(&self, column_name: &str, epsilon: &Value) {
        if let Some((column_index, _)) = self.find_column(column_name) {
            self.columns.borrow_mut()[column_index].set_epsilon(epsilon);
        }
    }

    pub fn set_display_name(&self, display_name: &str, column_index: usize) {
        let mut columns = self.columns.borrow_mut();
        if let Some(column) = columns.get_mut(column_index) {
            column.set_display_name(display_name);
        }
    }

    pub fn set_max_free_tolerance(&self, size: usize) {
        self.max_free_tolerance.set(size);
    }

    pub fn max_free_tolerance(&self) -> usize {
        self.max_free_tolerance.get()
    }

    /// Number of installed observers still alive.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

impl DataSource for Table {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn decorated_name(&self) -> String {
        format!("Table[{}]", self.name)
    }

    fn sorting_order(&self) -> SortOrder {
        self.sort_order
    }

    fn is_sorting_paused(&self) -> bool {
        self.sorting_paused.get()
    }

    fn key_column(&self) -> usize {
        0
    }

    fn row_count(&self) -> usize {
        self.indices.borrow().len()
    }

    fn column_count(&self) -> usize {
        self.columns.borrow().len()
    }

    fn find_column(&self, column_name: &str) -> Option<(usize, DataType)> {
        self.columns
            .borrow()
            .iter()
            .position(|c| c.name() == column_name)
            .map(|i| (i, self.columns.borrow()[i].data_type()))
    }

    fn column_at(&self, column_index: usize) -> Option<(String, DataType)> {
        self.columns
            .borrow()
            .get(column_index)
            .map(|c| (c.name().to_string(), c.data_type()))
    }

    fn column_meta(&self, column_index: usize) -> Option<ColumnMeta> {
        self.columns.borrow().get(column_index).map(|c| c.meta().clone())
    }

    fn display_name(&self, column_index: usize) -> String {
        self.columns
            .borrow()
            .get(column_index)
            .map(|c| c.display_name().to_string())
            .unwrap_or_default()
    }

    fn value_at(&self, row_index: usize, column_index: usize) -> Option<Value> {
        let indices = self.indices.borrow();
        let slot = *indices.get(row_index)?;
        self.columns.borrow().get(column_index)?.get(slot)
    }

    fn install_observer(&self, observer: Weak<dyn ViewObserver>) {
        self.observers.install(observer);
    }

    fn uninstall_observer(&self, observer: &Weak<dyn ViewObserver>) {
        self.observers.uninstall(observer);
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        // delivered even while event processing is paused
        self.observers.emit(&TableEvent::AboutToDestruct);
    }
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Table {{ name: '{}', columns: {}, rows: {} }}",
            self.name,
            self.column_count(),
            self.row_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student_table() -> Table {
        let table = Table::new(
            "table",
            vec![
                ColumnMeta::with_display("name", "your name", DataType::Str),
                ColumnMeta::with_display("id", "your id", DataType::Int32),
            ],
            SortOrder::Ascending,
        )
        .unwrap();
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

    fn names(table: &Table) -> Vec<String> {
        (0..table.row_count())
            .map(|r| table.value_at(r, 0).unwrap().into_string().unwrap())
            .collect()
    }

    /// Slot disjointness plus key-column ordering, the two core invariants.
    fn assert_invariants(table: &Table) {
        let indices = table.indices.borrow();
        let free = table.free.borrow();
        let capacity = indices.len() + free.len();
        let mut seen = vec![false; capacity];
        for &slot in indices.iter().chain(free.iter()) {
            assert!(slot < capacity, "slot {slot} beyond capacity {capacity}");
            assert!(!seen[slot], "slot {slot} appears twice");
            seen[slot] = true;
        }
        let columns = table.columns.borrow();
        for column in columns.iter() {
            assert_eq!(column.len(), capacity);
        }
        if let Some(key) = columns.first() {
            for pair in indices.windows(2) {
                match table.sort_order {
                    SortOrder::Ascending => assert!(!key.is_greater(pair[0], pair[1])),
                    SortOrder::Descending => assert!(!key.is_less(pair[0], pair[1])),
                }
            }
        }
    }

    #[test]
    fn test_construction_validation() {
        assert!(Table::new("ok name", vec![], SortOrder::Ascending).is_ok());
        assert!(Table::new("1bad", vec![], SortOrder::Ascending).is_err());
        assert!(Table::new("bad\\name", vec![], SortOrder::Ascending).is_err());
        assert!(Table::new("bad/name", vec![], SortOrder::Ascending).is_err());
        assert!(Table::new("bad\tname", vec![], SortOrder::Ascending).is_err());

        assert!(Table::new(
            "t",
            vec![ColumnMeta::new("no spaces", DataType::Int32)],
            SortOrder::Ascending
        )
        .is_err());
        assert!(Table::new(
            "t",
            vec![
                ColumnMeta::new("twice", DataType::Int32),
                ColumnMeta::new("twice", DataType::Str)
            ],
            SortOrder::Ascending
        )
        .is_err());
    }

    #[test]
    fn test_insert_keeps_sorted_with_stable_duplicates() {
        let table = student_table();
        assert_eq!(
            names(&table),
            vec![
                "Aarati", "Bhupendra", "Chhatrapal", "Hema", "Hema", "Hemant", "Janaki",
                "Keshav", "Ketan", "Teman"
            ]
        );
        // stable: first inserted Hema (id 3) comes before the second (id 4)
        assert_eq!(table.value_at(3, 1).unwrap(), Value::Int32(3));
        assert_eq!(table.value_at(4, 1).unwrap(), Value::Int32(4));
        assert_invariants(&table);
    }

    #[test]
    fn test_insert_into_empty_and_bad_rows() {
        let table = Table::new(
            "t",
            vec![ColumnMeta::new("x", DataType::Int32)],
            SortOrder::Ascending,
        )
        .unwrap();
        assert_eq!(table.insert_row(vec![Value::Int32(5)]), Some(0));

        // arity and tag mismatches leave the table untouched
        assert_eq!(table.insert_row(vec![]), None);
        assert_eq!(table.insert_row(vec![Value::Int32(1), Value::Int32(2)]), None);
        assert_eq!(table.insert_row(vec![Value::Int64(1)]), None);
        assert_eq!(table.row_count(), 1);
        assert_invariants(&table);

        let empty = Table::new("empty", vec![], SortOrder::Ascending).unwrap();
        assert_eq!(empty.insert_row(vec![]), None);
    }

    #[test]
    fn test_descending_order() {
        let table = Table::new(
            "desc",
            vec![ColumnMeta::new("x", DataType::Int32)],
            SortOrder::Descending,
        )
        .unwrap();
        for x in [3, 1, 4, 1, 5] {
            table.insert_row(vec![Value::Int32(x)]);
        }
        let xs: Vec<i32> =
            (0..5).map(|r| table.value_at(r, 0).unwrap().as_int32().unwrap()).collect();
        assert_eq!(xs, vec![5, 4, 3, 1, 1]);
        assert_invariants(&table);
    }

    #[test]
    fn test_drop_row_and_slot_reuse() {
        let table = student_table();
        // second Hema holds id 4
        assert!(table.drop_row(4));
        assert_eq!(table.row_count(), 9);
        assert!(table.search("id", &Value::Int32(4)).is_empty());
        assert_invariants(&table);

        // the freed slot is reused by the next insertion
        let capacity_before = table.capacity();
        table.insert_row(vec!["Zoya".into(), Value::Int32(11)]).unwrap();
        assert_eq!(table.capacity(), capacity_before);
        assert_eq!(names(&table).last().map(String::as_str), Some("Zoya"));
        assert_invariants(&table);

        assert!(!table.drop_row(100));
    }

    #[test]
    fn test_compaction_preserves_logical_view() {
        let table = student_table();
        table.set_max_free_tolerance(2);

        let before: Vec<Vec<Value>> = (0..table.row_count())
            .map(|r| vec![table.value_at(r, 0).unwrap(), table.value_at(r, 1).unwrap()])
            .collect();

        assert!(table.drop_row(0)); // free list: 1
        assert!(table.drop_row(0)); // free list reaches tolerance, compacts
        assert_eq!(table.free.borrow().len(), 0);
        assert_eq!(table.capacity(), 8);

        for (r, row) in before[2..].iter().enumerate() {
            assert_eq!(table.value_at(r, 0).unwrap(), row[0]);
            assert_eq!(table.value_at(r, 1).unwrap(), row[1]);
        }
        assert_invariants(&table);
    }

    #[test]
    fn test_set_data_rules() {
        let table = student_table();
        // key column is immutable
        assert!(!table.set_data(0, 0, Value::Str("Nope".into())));
        // bad indices and tags
        assert!(!table.set_data(100, 1, Value::Int32(0)));
        assert!(!table.set_data(0, 100, Value::Int32(0)));
        assert!(!table.set_data(0, 1, Value::Int64(0)));

        assert!(table.set_data(0, 1, Value::Int32(60)));
        assert_eq!(table.value_at(0, 1).unwrap(), Value::Int32(60));
        assert_invariants(&table);
    }

    #[test]
    fn test_set_data_commutes_on_disjoint_cells() {
        let build = || {
            let t = Table::new(
                "t",
                vec![
                    ColumnMeta::new("k", DataType::Int32),
                    ColumnMeta::new("a", DataType::Int32),
                    ColumnMeta::new("b", DataType::Int32),
                ],
                SortOrder::Ascending,
            )
            .unwrap();
            for i in 0..4 {
                t.insert_row(vec![Value::Int32(i), Value::Int32(0), Value::Int32(0)]);
            }
            t
        };
        let snapshot = |t: &Table| -> Vec<Vec<Value>> {
            (0..t.row_count())
                .map(|r| (0..t.column_count()).map(|c| t.value_at(r, c).unwrap()).collect())
                .collect()
        };

        let one = build();
        one.set_data(1, 1, Value::Int32(10));
        one.set_data(2, 2, Value::Int32(20));
        let two = build();
        two.set_data(2, 2, Value::Int32(20));
        two.set_data(1, 1, Value::Int32(10));
        assert_eq!(snapshot(&one), snapshot(&two));
    }

    #[test]
    fn test_search_key_column_returns_equality_run() {
        let table = student_table();
        assert_eq!(table.search("name", &Value::Str("Hema".into())), vec![3, 4]);
        assert_eq!(table.search("name", &Value::Str("Aarati".into())), vec![0]);
        assert_eq!(table.search("name", &Value::Str("Zzz".into())), Vec::<usize>::new());
        // type mismatch and unknown columns yield nothing
        assert_eq!(table.search("name", &Value::Int32(1)), Vec::<usize>::new());
        assert_eq!(table.search("ghost", &Value::Int32(1)), Vec::<usize>::new());
    }

    #[test]
    fn test_search_non_key_column_scans() {
        let table = student_table();
        assert_eq!(table.search("id", &Value::Int32(5)), vec![2]);
        assert_eq!(table.search("id", &Value::Int32(404)), Vec::<usize>::new());
    }

    #[test]
    fn test_search_float_with_epsilon() {
        let table = Table::new(
            "search_example",
            vec![
                ColumnMeta::new("name", DataType::Str),
                ColumnMeta::new("values", DataType::Float64),
            ],
            SortOrder::Ascending,
        )
        .unwrap();
        for (name, v) in [
            ("a", 1.0000000000002645e-4),
            ("b", 1.0000000000000032e-4),
            ("c", 1.0000000000001242e-4),
        ] {
            table.insert_row(vec![name.into(), Value::Float64(v)]);
        }
        table.set_epsilon("values", &Value::Float64(1e-17));
        let matches = table.search("values", &Value::Float64(1e-4));
        assert_eq!(matches.len(), 1);
        assert_eq!(table.value_at(matches[0], 0).unwrap(), Value::Str("b".into()));
    }

    #[test]
    fn test_transform_column() {
        let table = Table::new(
            "student",
            vec![
                ColumnMeta::new("name", DataType::Str),
                ColumnMeta::new("per", DataType::Float32),
            ],
            SortOrder::Ascending,
        )
        .unwrap();
        table.insert_row(vec!["a".into(), Value::Float32(80.0)]);
        table.insert_row(vec!["b".into(), Value::Float32(90.0)]);

        assert!(table.transform_column("per", "add($per, 5.0f)"));
        assert_eq!(table.value_at(0, 1).unwrap(), Value::Float32(85.0));
        assert_eq!(table.value_at(1, 1).unwrap(), Value::Float32(95.0));

        // key-column transform re-sorts
        assert!(table.transform_column("name", r#"concatenate("z_", $name)"#));
        assert_eq!(table.value_at(0, 0).unwrap(), Value::Str("z_a".into()));
        assert_invariants(&table);

        assert!(!table.transform_column("ghost", "add($per, 1.0f)"));
        assert!(!table.transform_column("per", "add($per, 1)"));
        assert!(!table.transform_column("per", "add($per"));
    }

    #[test]
    fn test_add_column_variants() {
        let table = student_table();

        assert!(table.add_column(ColumnMeta::new("marks", DataType::Int32), Value::Int32(0)));
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.value_at(5, 2).unwrap(), Value::Int32(0));

        // fill value of the wrong type is rejected
        assert!(!table.add_column(ColumnMeta::new("bad", DataType::Int32), Value::Str("x".into())));
        // duplicate and invalid names are rejected
        assert!(!table.add_column(ColumnMeta::new("marks", DataType::Int32), Value::Int32(0)));
        assert!(!table.add_column(ColumnMeta::new("1bad", DataType::Int32), Value::Int32(0)));

        assert!(table
            .add_column_expr(ColumnMeta::new("is_senior", DataType::Bool), "isGreater($id, 5)"));
        assert_eq!(table.value_at(0, 3).unwrap(), Value::Bool(true)); // Aarati, id 6
        assert_eq!(table.value_at(7, 3).unwrap(), Value::Bool(false)); // Keshav, id 1

        // broken formulas leave no trace behind
        assert!(!table.add_column_expr(ColumnMeta::new("broken", DataType::Bool), "isGreater($id"));
        assert!(table.find_column("broken").is_none());

        assert!(table.add_column_with(ColumnMeta::new("row_no", DataType::Int64), |row| {
            Ok(Value::Int64(row as i64))
        }));
        assert_eq!(table.value_at(9, 4).unwrap(), Value::Int64(9));

        // a generator returning the wrong type abandons the column
        assert!(!table.add_column_with(ColumnMeta::new("oops", DataType::Int64), |_| {
            Ok(Value::Int32(0))
        }));
        assert!(table.find_column("oops").is_none());
        assert_invariants(&table);
    }

    #[test]
    fn test_first_added_column_becomes_key_and_sorts() {
        let table = Table::new("grow", vec![], SortOrder::Ascending).unwrap();
        assert!(table.add_column(ColumnMeta::new("x", DataType::Int32), Value::Int32(0)));
        for x in [3, 1, 2] {
            table.insert_row(vec![Value::Int32(x)]);
        }
        let xs: Vec<i32> =
            (0..3).map(|r| table.value_at(r, 0).unwrap().as_int32().unwrap()).collect();
        assert_eq!(xs, vec![1, 2, 3]);
    }

    #[test]
    fn test_pause_resume_sorting() {
        let table = Table::new(
            "bulk",
            vec![
                ColumnMeta::new("num", DataType::Int32),
                ColumnMeta::new("num2", DataType::Int64),
            ],
            SortOrder::Ascending,
        )
        .unwrap();
        table.pause_sorting();
        assert!(table.is_sorting_paused());
        for i in 0..100 {
            let at = table.insert_row(vec![Value::Int32(100 - i), Value::Int64(i as i64)]);
            assert_eq!(at, Some(i as usize)); // appended, not sorted in
        }
        table.resume_sorting();
        assert!(!table.is_sorting_paused());
        assert_eq!(table.value_at(0, 0).unwrap(), Value::Int32(1));
        assert_eq!(table.value_at(99, 0).unwrap(), Value::Int32(100));
        assert_invariants(&table);
    }

    #[test]
    fn test_sort_is_idempotent() {
        let table = student_table();
        let first = table.indices.borrow().clone();
        table.sort();
        assert_eq!(*table.indices.borrow(), first);
        table.sort();
        assert_eq!(*table.indices.borrow(), first);
    }

    #[test]
    fn test_metadata_accessors() {
        let table = student_table();
        assert_eq!(table.name(), "table");
        assert_eq!(table.decorated_name(), "Table[table]");
        assert_eq!(table.key_column(), 0);
        assert_eq!(table.find_column("id"), Some((1, DataType::Int32)));
        assert_eq!(table.column_at(0), Some(("name".to_string(), DataType::Str)));
        assert_eq!(table.column_at(7), None);
        assert_eq!(table.display_name(1), "your id");
        table.set_display_name("Identifier", 1);
        assert_eq!(table.display_name(1), "Identifier");

        table.reserve(1000);
        assert_eq!(table.row_count(), 10);
    }
}
