//! Typed column storage with comparison hooks.
//!
//! A [`Column`] is a homogeneously typed dense vector of cells. The table
//! never touches cell storage directly; every ordering decision goes through
//! the column's comparison predicates, which is what lets floating-point
//! columns honor a per-column epsilon uniformly across sorting, searching and
//! filter evaluation.

use crate::error::Error;
use crate::value::{DataType, Date, DateTime, Value};

/// Column name, display name and cell type.
///
/// The display name defaults to the column name when left empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    pub display: String,
    pub data_type: DataType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        ColumnMeta { display: name.clone(), name, data_type }
    }

    pub fn with_display(
        name: impl Into<String>,
        display: impl Into<String>,
        data_type: DataType,
    ) -> Self {
        let name = name.into();
        let display = display.into();
        let display = if display.is_empty() { name.clone() } else { display };
        ColumnMeta { name, display, data_type }
    }
}

/// One dense vector per cell type. Float storage carries the equality
/// epsilon alongside the cells.
#[derive(Debug, Clone)]
enum Cells {
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32 { values: Vec<f32>, epsilon: f32 },
    Float64 { values: Vec<f64>, epsilon: f64 },
    Str(Vec<String>),
    Bool(Vec<bool>),
    Date(Vec<Date>),
    DateTime(Vec<DateTime>),
}

impl Cells {
    fn empty(data_type: DataType) -> Cells {
        match data_type {
            DataType::Int32 => Cells::Int32(Vec::new()),
            DataType::Int64 => Cells::Int64(Vec::new()),
            DataType::Float32 => Cells::Float32 { values: Vec::new(), epsilon: f32::EPSILON },
            DataType::Float64 => Cells::Float64 { values: Vec::new(), epsilon: f64::EPSILON },
            DataType::Str => Cells::Str(Vec::new()),
            DataType::Bool => Cells::Bool(Vec::new()),
            DataType::Date => Cells::Date(Vec::new()),
            DataType::DateTime => Cells::DateTime(Vec::new()),
        }
    }
}

/// A typed dense vector of cells plus metadata.
#[derive(Debug, Clone)]
pub struct Column {
    meta: ColumnMeta,
    cells: Cells,
}

macro_rules! per_cells {
    ($self:expr, $values:ident => $body:expr) => {
        match &$self.cells {
            Cells::Int32($values) => $body,
            Cells::Int64($values) => $body,
            Cells::Float32 { values: $values, .. } => $body,
            Cells::Float64 { values: $values, .. } => $body,
            Cells::Str($values) => $body,
            Cells::Bool($values) => $body,
            Cells::Date($values) => $body,
            Cells::DateTime($values) => $body,
        }
    };
}

macro_rules! per_cells_mut {
    ($self:expr, $values:ident => $body:expr) => {
        match &mut $self.cells {
            Cells::Int32($values) => $body,
            Cells::Int64($values) => $body,
            Cells::Float32 { values: $values, .. } => $body,
            Cells::Float64 { values: $values, .. } => $body,
            Cells::Str($values) => $body,
            Cells::Bool($values) => $body,
            Cells::Date($values) => $body,
            Cells::DateTime($values) => $body,
        }
    };
}

impl Column {
    pub fn new(meta: ColumnMeta) -> Self {
        let cells = Cells::empty(meta.data_type);
        Column { meta, cells }
    }

    pub fn name(&self) -> &str {
        &self.meta.name
    }

    pub fn display_name(&self) -> &str {
        &self.meta.display
    }

    /// An empty display name falls back to the column name.
    pub fn set_display_name(&mut self, display: impl Into<String>) {
        let display = display.into();
        self.meta.display = if display.is_empty() { self.meta.name.clone() } else { display };
    }

    pub fn data_type(&self) -> DataType {
        self.meta.data_type
    }

    pub fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        per_cells!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a cell. The value's tag must match the column type.
    pub fn push(&mut self, value: Value) -> Result<(), Error> {
        if value.data_type() != self.meta.data_type {
            return Err(Error::mismatch(self.meta.data_type, value.data_type()));
        }
        match (&mut self.cells, value) {
            (Cells::Int32(v), Value::Int32(x)) => v.push(x),
            (Cells::Int64(v), Value::Int64(x)) => v.push(x),
            (Cells::Float32 { values, .. }, Value::Float32(x)) => values.push(x),
            (Cells::Float64 { values, .. }, Value::Float64(x)) => values.push(x),
            (Cells::Str(v), Value::Str(x)) => v.push(x),
            (Cells::Bool(v), Value::Bool(x)) => v.push(x),
            (Cells::Date(v), Value::Date(x)) => v.push(x),
            (Cells::DateTime(v), Value::DateTime(x)) => v.push(x),
            _ => unreachable!("tag checked above"),
        }
        Ok(())
    }

    /// Appends an empty cell of the column's type.
    pub fn push_default(&mut self) {
        per_cells_mut!(self, v => v.push(Default::default()))
    }

    /// Removes the last cell, if any.
    pub fn pop(&mut self) {
        per_cells_mut!(self, v => { v.pop(); })
    }

    /// Grows or shrinks to `len`, filling new cells with the type's default.
    pub fn resize(&mut self, len: usize) {
        per_cells_mut!(self, v => v.resize(len, Default::default()))
    }

    pub fn reserve(&mut self, additional: usize) {
        per_cells_mut!(self, v => v.reserve(additional))
    }

    /// Overwrites the cell at `slot`. The value's tag must match.
    pub fn set(&mut self, slot: usize, value: Value) -> Result<(), Error> {
        if value.data_type() != self.meta.data_type {
            return Err(Error::mismatch(self.meta.data_type, value.data_type()));
        }
        if slot >= self.len() {
            return Err(Error::NotFound(format!(
                "slot {slot} out of range [0, {}) in column `{}`",
                self.len(),
                self.meta.name
            )));
        }
        match (&mut self.cells, value) {
            (Cells::Int32(v), Value::Int32(x)) => v[slot] = x,
            (Cells::Int64(v), Value::Int64(x)) => v[slot] = x,
            (Cells::Float32 { values, .. }, Value::Float32(x)) => values[slot] = x,
            (Cells::Float64 { values, .. }, Value::Float64(x)) => values[slot] = x,
            (Cells::Str(v), Value::Str(x)) => v[slot] = x,
            (Cells::Bool(v), Value::Bool(x)) => v[slot] = x,
            (Cells::Date(v), Value::Date(x)) => v[slot] = x,
            (Cells::DateTime(v), Value::DateTime(x)) => v[slot] = x,
            _ => unreachable!("tag checked above"),
        }
        Ok(())
    }

    /// Clones out the cell at `slot`.
    pub fn get(&self, slot: usize) -> Option<Value> {
        if slot >= self.len() {
            return None;
        }
        Some(match &self.cells {
            Cells::Int32(v) => Value::Int32(v[slot]),
            Cells::Int64(v) => Value::Int64(v[slot]),
            Cells::Float32 { values, .. } => Value::Float32(values[slot]),
            Cells::Float64 { values, .. } => Value::Float64(values[slot]),
            Cells::Str(v) => Value::Str(v[slot].clone()),
            Cells::Bool(v) => Value::Bool(v[slot]),
            Cells::Date(v) => Value::Date(v[slot]),
            Cells::DateTime(v) => Value::DateTime(v[slot]),
        })
    }

    /// Sets the float-equality epsilon. Returns false when the column is not
    /// a float column or the value's width does not match.
    pub fn set_epsilon(&mut self, epsilon: &Value) -> bool {
        match (&mut self.cells, epsilon) {
            (Cells::Float32 { epsilon: e, .. }, Value::Float32(x)) => {
                *e = *x;
                true
            }
            (Cells::Float64 { epsilon: e, .. }, Value::Float64(x)) => {
                *e = *x;
                true
            }
            _ => false,
        }
    }

    /// `cells[a] < cells[b]`. Both slots must be in range.
    pub fn is_less(&self, a: usize, b: usize) -> bool {
        match &self.cells {
            Cells::Int32(v) => v[a] < v[b],
            Cells::Int64(v) => v[a] < v[b],
            Cells::Float32 { values, .. } => values[a] < values[b],
            Cells::Float64 { values, .. } => values[a] < values[b],
            Cells::Str(v) => v[a] < v[b],
            Cells::Bool(v) => v[a] < v[b],
            Cells::Date(v) => v[a] < v[b],
            Cells::DateTime(v) => v[a] < v[b],
        }
    }

    /// `cells[a] > cells[b]`. Both slots must be in range.
    pub fn is_greater(&self, a: usize, b: usize) -> bool {
        self.is_less(b, a)
    }

    /// `cells[a] == cells[b]` under the column's equality. Float columns use
    /// `|x - y| < epsilon`.
    pub fn is_equal(&self, a: usize, b: usize) -> bool {
        match &self.cells {
            Cells::Int32(v) => v[a] == v[b],
            Cells::Int64(v) => v[a] == v[b],
            Cells::Float32 { values, epsilon } => (values[a] - values[b]).abs() < *epsilon,
            Cells::Float64 { values, epsilon } => (values[a] - values[b]).abs() < *epsilon,
            Cells::Str(v) => v[a] == v[b],
            Cells::Bool(v) => v[a] == v[b],
            Cells::Date(v) => v[a] == v[b],
            Cells::DateTime(v) => v[a] == v[b],
        }
    }

    /// `cells[slot] < value`. A mismatched tag compares false.
    pub fn is_less_value(&self, slot: usize, value: &Value) -> bool {
        match (&self.cells, value) {
            (Cells::Int32(v), Value::Int32(x)) => v[slot] < *x,
            (Cells::Int64(v), Value::Int64(x)) => v[slot] < *x,
            (Cells::Float32 { values, .. }, Value::Float32(x)) => values[slot] < *x,
            (Cells::Float64 { values, .. }, Value::Float64(x)) => values[slot] < *x,
            (Cells::Str(v), Value::Str(x)) => v[slot] < *x,
            (Cells::Bool(v), Value::Bool(x)) => !v[slot] & *x,
            (Cells::Date(v), Value::Date(x)) => v[slot] < *x,
            (Cells::DateTime(v), Value::DateTime(x)) => v[slot] < *x,
            _ => false,
        }
    }

    /// `cells[slot] > value`. A mismatched tag compares false.
    pub fn is_greater_value(&self, slot: usize, value: &Value) -> bool {
        match (&self.cells, value) {
            (Cells::Int32(v), Value::Int32(x)) => v[slot] > *x,
            (Cells::Int64(v), Value::Int64(x)) => v[slot] > *x,
            (Cells::Float32 { values, .. }, Value::Float32(x)) => values[slot] > *x,
            (Cells::Float64 { values, .. }, Value::Float64(x)) => values[slot] > *x,
            (Cells::Str(v), Value::Str(x)) => v[slot] > *x,
            (Cells::Bool(v), Value::Bool(x)) => v[slot] & !*x,
            (Cells::Date(v), Value::Date(x)) => v[slot] > *x,
            (Cells::DateTime(v), Value::DateTime(x)) => v[slot] > *x,
            _ => false,
        }
    }

    /// `cells[slot] == value` under the column's equality (float epsilon
    /// included). A mismatched tag compares false.
    pub fn is_equal_value(&self, slot: usize, value: &Value) -> bool {
        match (&self.cells, value) {
            (Cells::Int32(v), Value::Int32(x)) => v[slot] == *x,
            (Cells::Int64(v), Value::Int64(x)) => v[slot] == *x,
            (Cells::Float32 { values, epsilon }, Value::Float32(x)) => {
                (values[slot] - *x).abs() < *epsilon
            }
            (Cells::Float64 { values, epsilon }, Value::Float64(x)) => {
                (values[slot] - *x).abs() < *epsilon
            }
            (Cells::Str(v), Value::Str(x)) => v[slot] == *x,
            (Cells::Bool(v), Value::Bool(x)) => v[slot] == *x,
            (Cells::Date(v), Value::Date(x)) => v[slot] == *x,
            (Cells::DateTime(v), Value::DateTime(x)) => v[slot] == *x,
            _ => false,
        }
    }

    /// Rebuilds storage so that logical order becomes physical order: the new
    /// column holds `cells[slots[0]], cells[slots[1]], ...` densely. Metadata
    /// and epsilon are preserved. Used by table compaction.
    pub(crate) fn compacted(&self, slots: &[usize]) -> Column {
        fn gather<T: Clone>(values: &[T], slots: &[usize]) -> Vec<T> {
            slots.iter().map(|&s| values[s].clone()).collect()
        }
        let cells = match &self.cells {
            Cells::Int32(v) => Cells::Int32(gather(v, slots)),
            Cells::Int64(v) => Cells::Int64(gather(v, slots)),
            Cells::Float32 { values, epsilon } => {
                Cells::Float32 { values: gather(values, slots), epsilon: *epsilon }
            }
            Cells::Float64 { values, epsilon } => {
                Cells::Float64 { values: gather(values, slots), epsilon: *epsilon }
            }
            Cells::Str(v) => Cells::Str(gather(v, slots)),
            Cells::Bool(v) => Cells::Bool(gather(v, slots)),
            Cells::Date(v) => Cells::Date(gather(v, slots)),
            Cells::DateTime(v) => Cells::DateTime(gather(v, slots)),
        };
        Column { meta: self.meta.clone(), cells }
    }
}
