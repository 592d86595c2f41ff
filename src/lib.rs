//! livegrid - in-memory columnar tables with live filtered views.
//!
//! A [`Table`] stores rows across typed columns and keeps them sorted on its
//! first column. Any number of [`FilterView`]s can be stacked on a table (or
//! on other views); each view selects columns, filters rows with a small
//! formula language, keeps its own sort column, and follows every change in
//! its source incrementally through change events.
//!
//! ```
//! use livegrid::{Table, FilterView, ColumnMeta, DataType, SortOrder, Value, DataSource};
//! use std::rc::Rc;
//!
//! let table = Rc::new(Table::new(
//!     "student",
//!     vec![
//!         ColumnMeta::new("name", DataType::Str),
//!         ColumnMeta::new("age", DataType::Int32),
//!         ColumnMeta::new("per", DataType::Float32),
//!     ],
//!     SortOrder::Ascending,
//! ).unwrap());
//!
//! table.insert_row(vec!["Keshav Sahu".into(), Value::Int32(25), Value::Float32(84.43)]);
//! table.insert_row(vec!["Adil Hussain".into(), Value::Int32(18), Value::Float32(81.39)]);
//!
//! // a live view: updates itself when the table changes
//! let adults = FilterView::filtered("adults", table.clone(), "isGreater($age, 20)").unwrap();
//! assert_eq!(adults.row_count(), 1);
//!
//! table.insert_row(vec!["Vastinel Jack".into(), Value::Int32(26), Value::Float32(80.34)]);
//! assert_eq!(adults.row_count(), 2);
//!
//! // derived columns come from the same formula language
//! table.add_column_expr(
//!     ColumnMeta::new("is_valid", DataType::Str),
//!     r#"IF(isGreater($age, 20), "valid", "invalid")"#,
//! );
//! ```

pub mod column;
pub mod error;
pub mod events;
pub mod expr;
pub mod functions;
pub mod io;
pub mod logging;
pub mod table;
pub mod value;
pub mod view;

pub use column::{Column, ColumnMeta};
pub use error::Error;
pub use events::{DataSource, SortOrder, TableEvent, ViewObserver, INVALID_INDEX};
pub use expr::Program;
pub use functions::{find_function, function_count, register_function, FunctionInfo, NativeFn};
pub use io::{read_table_from, to_json, write_as_csv, write_table_to};
pub use logging::{
    add_log_msg, handle_unhandled, is_log_handler_paused, pause_log_handler, recent_log,
    resume_log_handler, set_log_handler,
};
pub use table::{is_valid_column_name, is_valid_table_name, Table};
pub use value::{DataType, Date, DateTime, Value};
pub use view::FilterView;
