//! Table persistence: binary snapshots plus CSV and JSON export.
//!
//! A snapshot is one header file `<table>.kmt` describing the table (name,
//! sort order, schema, row count) and one sibling `<column>.clm` per column
//! holding that column's cells as a length-correct, type-homogeneous stream
//! in logical row order. All integers are little-endian.
//!
//! The readers and writers are plain consumers of [`DataSource`]; a view can
//! be exported exactly like a table.

use crate::column::ColumnMeta;
use crate::error::Error;
use crate::events::{DataSource, SortOrder};
use crate::logging;
use crate::table::Table;
use crate::value::{DataType, Date, DateTime, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

fn resolve_file_name(file_name: &str, dir: &Path, extension: &str) -> PathBuf {
    if file_name.ends_with(&format!(".{extension}")) {
        dir.join(file_name)
    } else {
        dir.join(format!("{file_name}.{extension}"))
    }
}

fn write_len_string(writer: &mut impl Write, text: &str) -> Result<(), Error> {
    writer.write_all(&(text.len() as u64).to_le_bytes())?;
    writer.write_all(text.as_bytes())?;
    Ok(())
}

fn read_u64(reader: &mut impl Read) -> Result<u64, Error> {
    let mut bytes = [0u8; 8];
    reader.read_exact(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}

fn read_u16(reader: &mut impl Read) -> Result<u16, Error> {
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(u16::from_le_bytes(bytes))
}

fn read_len_string(reader: &mut impl Read) -> Result<String, Error> {
    let length = read_u64(reader)? as usize;
    let mut bytes = vec![0u8; length];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| {
        Error::Io(std::io::Error::new(ErrorKind::InvalidData, "non-utf8 text in snapshot"))
    })
}

fn write_cell(writer: &mut impl Write, value: &Value) -> Result<(), Error> {
    match value {
        Value::Int32(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Int64(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Float32(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Float64(v) => writer.write_all(&v.to_le_bytes())?,
        Value::Str(v) => {
            writer.write_all(v.as_bytes())?;
            writer.write_all(&[0])?;
        }
        Value::Bool(v) => writer.write_all(&[*v as u8])?,
        Value::Date(v) => write_date(writer, v)?,
        Value::DateTime(v) => {
            write_date(writer, &v.date)?;
            writer.write_all(&[v.hour, v.minute, v.second])?;
        }
    }
    Ok(())
}

fn write_date(writer: &mut impl Write, date: &Date) -> Result<(), Error> {
    writer.write_all(&date.year.to_le_bytes())?;
    writer.write_all(&[date.month, date.day])?;
    Ok(())
}

fn read_cell(reader: &mut impl BufRead, data_type: DataType) -> Result<Value, Error> {
    Ok(match data_type {
        DataType::Int32 => {
            let mut bytes = [0u8; 4];
            reader.read_exact(&mut bytes)?;
            Value::Int32(i32::from_le_bytes(bytes))
        }
        DataType::Int64 => {
            let mut bytes = [0u8; 8];
            reader.read_exact(&mut bytes)?;
            Value::Int64(i64::from_le_bytes(bytes))
        }
        DataType::Float32 => {
            let mut bytes = [0u8; 4];
            reader.read_exact(&mut bytes)?;
            Value::Float32(f32::from_le_bytes(bytes))
        }
        DataType::Float64 => {
            let mut bytes = [0u8; 8];
            reader.read_exact(&mut bytes)?;
            Value::Float64(f64::from_le_bytes(bytes))
        }
        DataType::Str => {
            // NUL-terminated, any length
            let mut bytes = Vec::new();
            let n = reader.read_until(0, &mut bytes)?;
            if n == 0 {
                return Err(Error::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "string cell missing",
                )));
            }
            if bytes.last() == Some(&0) {
                bytes.pop();
            }
            Value::Str(String::from_utf8(bytes).map_err(|_| {
                Error::Io(std::io::Error::new(ErrorKind::InvalidData, "non-utf8 string cell"))
            })?)
        }
        DataType::Bool => {
            let mut bytes = [0u8; 1];
            reader.read_exact(&mut bytes)?;
            Value::Bool(bytes[0] != 0)
        }
        DataType::Date => Value::Date(read_date(reader)?),
        DataType::DateTime => {
            let date = read_date(reader)?;
            let mut bytes = [0u8; 3];
            reader.read_exact(&mut bytes)?;
            Value::DateTime(DateTime::new(date, bytes[0], bytes[1], bytes[2]))
        }
    })
}

fn read_date(reader: &mut impl Read) -> Result<Date, Error> {
    let year = read_u16(reader)?;
    let mut bytes = [0u8; 2];
    reader.read_exact(&mut bytes)?;
    Ok(Date::new(year, bytes[0], bytes[1]))
}

/// Writes `table` as `<name>.kmt` plus one `<column>.clm` per column inside
/// `dir`. The directory must exist. Returns false after logging on any IO
/// failure.
pub fn write_table_to(table: &Table, dir: &Path) -> bool {
    match try_write_table(table, dir) {
        Ok(()) => true,
        Err(e) => {
            logging::report(
                "WriteTableTo ~ IO",
                format!("While trying to write the table `{}`: {e}.", table.name()),
            );
            false
        }
    }
}

fn try_write_table(table: &Table, dir: &Path) -> Result<(), Error> {
    let header_path = resolve_file_name(&table.name(), dir, "kmt");
    let mut header = BufWriter::new(File::create(header_path)?);

    write_len_string(&mut header, &table.name())?;
    let order: u16 = match table.sorting_order() {
        SortOrder::Ascending => 0,
        SortOrder::Descending => 1,
    };
    header.write_all(&order.to_le_bytes())?;
    header.write_all(&(table.column_count() as u64).to_le_bytes())?;
    header.write_all(&(table.row_count() as u64).to_le_bytes())?;

    for column_index in 0..table.column_count() {
        let meta = table
            .column_meta(column_index)
            .ok_or_else(|| Error::Unknown("column vanished while writing".into()))?;
        header.write_all(&meta.data_type.bits().to_le_bytes())?;
        write_len_string(&mut header, &meta.name)?;
        write_len_string(&mut header, &meta.display)?;
    }
    header.flush()?;

    for column_index in 0..table.column_count() {
        let (column_name, _) = table
            .column_at(column_index)
            .ok_or_else(|| Error::Unknown("column vanished while writing".into()))?;
        let cell_path = resolve_file_name(&column_name, dir, "clm");
        let mut cells = BufWriter::new(File::create(cell_path)?);
        for row_index in 0..table.row_count() {
            let value = table.value_at(row_index, column_index).ok_or_else(|| {
                Error::NotFound(format!("cell ({row_index}, {column_index}) missing"))
            })?;
            write_cell(&mut cells, &value)?;
        }
        cells.flush()?;
    }
    Ok(())
}

/// Reads a snapshot written by [`write_table_to`] back into a table: parse
/// the header, bulk-load the first column under paused sorting, then attach
/// every further column through a reader closure.
pub fn read_table_from(file_name: &str, dir: &Path) -> Result<Table, Error> {
    match try_read_table(file_name, dir) {
        Ok(table) => Ok(table),
        Err(e) => {
            logging::report(
                "ReadTableFrom ~ IO",
                format!("Couldn't read table `{file_name}`: {e}."),
            );
            Err(e)
        }
    }
}

fn try_read_table(file_name: &str, dir: &Path) -> Result<Table, Error> {
    let header_path = resolve_file_name(file_name, dir, "kmt");
    let mut header = BufReader::new(File::open(header_path)?);

    let table_name = read_len_string(&mut header)?;
    let sort_order = match read_u16(&mut header)? {
        0 => SortOrder::Ascending,
        1 => SortOrder::Descending,
        other => {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("unknown sort order tag {other}"),
            )))
        }
    };
    let column_count = read_u64(&mut header)? as usize;
    let row_count = read_u64(&mut header)? as usize;

    let mut metas = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let tag = read_u16(&mut header)?;
        let data_type = DataType::from_bits(tag).ok_or_else(|| {
            Error::Io(std::io::Error::new(
                ErrorKind::InvalidData,
                format!("unknown column type tag {tag:#06x}"),
            ))
        })?;
        let name = read_len_string(&mut header)?;
        let display = read_len_string(&mut header)?;
        metas.push(ColumnMeta::with_display(name, display, data_type));
    }

    if column_count == 0 {
        return Table::new(&table_name, vec![], sort_order);
    }
    if row_count == 0 {
        return Table::new(&table_name, metas, sort_order);
    }

    let first = metas[0].clone();
    let first_type = first.data_type;
    let table = Table::new(&table_name, vec![first], sort_order)?;
    {
        let cell_path = resolve_file_name(&metas[0].name, dir, "clm");
        let mut cells = BufReader::new(File::open(cell_path)?);
        table.pause_sorting();
        for _ in 0..row_count {
            let value = read_cell(&mut cells, first_type)?;
            if table.insert_row(vec![value]).is_none() {
                table.resume_sorting();
                return Err(Error::Unknown(format!(
                    "couldn't rebuild table `{table_name}` from its snapshot"
                )));
            }
        }
        table.resume_sorting();
    }

    for meta in metas.into_iter().skip(1) {
        let cell_path = resolve_file_name(&meta.name, dir, "clm");
        let mut cells = BufReader::new(File::open(cell_path)?);
        let data_type = meta.data_type;
        let added = table.add_column_with(meta, |_| read_cell(&mut cells, data_type));
        if !added {
            return Err(Error::Unknown(format!(
                "couldn't rebuild table `{table_name}` from its snapshot"
            )));
        }
    }
    Ok(table)
}

/// Writes any source as delimited text. String-typed columns are wrapped in
/// double quotes with embedded quotes doubled; the header row carries the
/// column names. `.csv` is appended when the file name lacks it. Returns
/// false after logging on IO failure.
pub fn write_as_csv(source: &dyn DataSource, file_name: &str, delimiter: &str) -> bool {
    let path = if file_name.len() < 5 || !file_name.ends_with(".csv") {
        format!("{file_name}.csv")
    } else {
        file_name.to_string()
    };
    match try_write_csv(source, Path::new(&path), delimiter) {
        Ok(()) => true,
        Err(e) => {
            logging::report("CSVWriter ~ IO", format!("Error when writing `{path}` file: {e}."));
            false
        }
    }
}

fn try_write_csv(source: &dyn DataSource, path: &Path, delimiter: &str) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);

    let columns = source.column_count();
    for column_index in 0..columns {
        if column_index > 0 {
            writer.write_all(delimiter.as_bytes())?;
        }
        let (name, _) = source
            .column_at(column_index)
            .ok_or_else(|| Error::NotFound(format!("column {column_index} missing")))?;
        writer.write_all(name.as_bytes())?;
    }
    writer.write_all(b"\n")?;

    for row_index in 0..source.row_count() {
        for column_index in 0..columns {
            if column_index > 0 {
                writer.write_all(delimiter.as_bytes())?;
            }
            let value = source.value_at(row_index, column_index).ok_or_else(|| {
                Error::NotFound(format!("cell ({row_index}, {column_index}) missing"))
            })?;
            match value {
                Value::Str(text) => {
                    write!(writer, "\"{}\"", text.replace('"', "\"\""))?;
                }
                other => write!(writer, "{other}")?,
            }
        }
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Serializes any source to a JSON array of row objects keyed by column
/// name. Dates render in their display form.
pub fn to_json(source: &dyn DataSource) -> Result<String, Error> {
    let column_names: Vec<String> = (0..source.column_count())
        .map(|c| source.column_at(c).map(|(name, _)| name))
        .collect::<Option<_>>()
        .ok_or_else(|| Error::Unknown("source lost its columns".into()))?;

    let mut rows = Vec::with_capacity(source.row_count());
    for row_index in 0..source.row_count() {
        let mut object = serde_json::Map::new();
        for (column_index, column_name) in column_names.iter().enumerate() {
            let value = source.value_at(row_index, column_index).ok_or_else(|| {
                Error::NotFound(format!("cell ({row_index}, {column_index}) missing"))
            })?;
            object.insert(column_name.clone(), json_value(value));
        }
        rows.push(serde_json::Value::Object(object));
    }
    serde_json::to_string_pretty(&rows).map_err(|e| Error::Unknown(e.to_string()))
}

fn json_value(value: Value) -> serde_json::Value {
    match value {
        Value::Int32(v) => serde_json::Value::Number(v.into()),
        Value::Int64(v) => serde_json::Value::Number(v.into()),
        Value::Float32(v) => serde_json::Number::from_f64(f64::from(v))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Float64(v) => serde_json::Number::from_f64(v)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Bool(v) => serde_json::Value::Bool(v),
        Value::Str(v) => serde_json::Value::String(v),
        Value::Date(v) => serde_json::Value::String(v.to_string()),
        Value::DateTime(v) => serde_json::Value::String(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::FilterView;
    use std::rc::Rc;

    fn mixed_table() -> Table {
        let table = Table::new(
            "mixed",
            vec![
                ColumnMeta::with_display("label", "Label", DataType::Str),
                ColumnMeta::new("small", DataType::Int32),
                ColumnMeta::new("big", DataType::Int64),
                ColumnMeta::new("ratio", DataType::Float32),
                ColumnMeta::new("exact", DataType::Float64),
                ColumnMeta::new("flag", DataType::Bool),
                ColumnMeta::new("day", DataType::Date),
                ColumnMeta::new("stamp", DataType::DateTime),
            ],
            SortOrder::Descending,
        )
        .unwrap();
        for i in 0..10i32 {
            table
                .insert_row(vec![
                    Value::Str(format!("row {i}")),
                    Value::Int32(i),
                    Value::Int64(i as i64 * 1_000_000_007),
                    Value::Float32(i as f32 / 3.0),
                    Value::Float64(i as f64 / 7.0),
                    Value::Bool(i % 2 == 0),
                    Value::Date(Date::new(2022, 1 + (i % 12) as u8, 1 + i as u8)),
                    Value::DateTime(DateTime::new(
                        Date::new(2022, 5, 1 + i as u8),
                        i as u8,
                        30,
                        59,
                    )),
                ])
                .unwrap();
        }
        table
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let table = mixed_table();
        assert!(write_table_to(&table, dir.path()));

        let restored = read_table_from("mixed", dir.path()).unwrap();
        assert_eq!(restored.name(), table.name());
        assert_eq!(restored.sorting_order(), table.sorting_order());
        assert_eq!(restored.row_count(), table.row_count());
        assert_eq!(restored.column_count(), table.column_count());
        for column_index in 0..table.column_count() {
            assert_eq!(
                restored.column_meta(column_index).unwrap(),
                table.column_meta(column_index).unwrap()
            );
            for row_index in 0..table.row_count() {
                assert_eq!(
                    restored.value_at(row_index, column_index),
                    table.value_at(row_index, column_index),
                    "cell ({row_index}, {column_index}) differs after round trip"
                );
            }
        }
    }

    #[test]
    fn test_snapshot_of_empty_tables() {
        let dir = tempfile::tempdir().unwrap();

        let no_columns = Table::new("bare", vec![], SortOrder::Ascending).unwrap();
        assert!(write_table_to(&no_columns, dir.path()));
        let restored = read_table_from("bare", dir.path()).unwrap();
        assert_eq!(restored.column_count(), 0);
        assert_eq!(restored.row_count(), 0);

        let no_rows = Table::new(
            "schema_only",
            vec![ColumnMeta::new("x", DataType::Int32)],
            SortOrder::Descending,
        )
        .unwrap();
        assert!(write_table_to(&no_rows, dir.path()));
        let restored = read_table_from("schema_only", dir.path()).unwrap();
        assert_eq!(restored.column_count(), 1);
        assert_eq!(restored.row_count(), 0);
        assert_eq!(restored.sorting_order(), SortOrder::Descending);
    }

    #[test]
    fn test_snapshot_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_table_from("no_such_table", dir.path()).is_err());

        let unwritable = dir.path().join("not_a_dir");
        let table = mixed_table();
        assert!(!write_table_to(&table, &unwritable));
    }

    #[test]
    fn test_csv_quotes_strings() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::new(
            "quoting",
            vec![
                ColumnMeta::new("text", DataType::Str),
                ColumnMeta::new("n", DataType::Int32),
            ],
            SortOrder::Ascending,
        )
        .unwrap();
        table.insert_row(vec!["plain".into(), Value::Int32(1)]).unwrap();
        table.insert_row(vec!["has, comma".into(), Value::Int32(2)]).unwrap();
        table.insert_row(vec![r#"has "quotes""#.into(), Value::Int32(3)]).unwrap();

        let path = dir.path().join("out");
        assert!(write_as_csv(&table, path.to_str().unwrap(), ","));
        let written = std::fs::read_to_string(dir.path().join("out.csv")).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "text,n");
        assert_eq!(lines[1], "\"has \"\"quotes\"\"\",3");
        assert_eq!(lines[2], "\"has, comma\",2");
        assert_eq!(lines[3], "\"plain\",1");
    }

    #[test]
    fn test_csv_of_view_uses_view_columns() {
        let dir = tempfile::tempdir().unwrap();
        let table = Rc::new(mixed_table());
        let view = FilterView::new(
            "slice",
            table.clone(),
            &["small", "label"],
            "isLess($small, 2)",
            "",
            SortOrder::Ascending,
        )
        .unwrap();

        let path = dir.path().join("slice.csv");
        assert!(write_as_csv(&*view, path.to_str().unwrap(), ", "));
        let written = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "small, label");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "0, \"row 0\"");
        assert_eq!(lines[2], "1, \"row 1\"");
    }

    #[test]
    fn test_json_export() {
        let table = Table::new(
            "j",
            vec![
                ColumnMeta::new("name", DataType::Str),
                ColumnMeta::new("score", DataType::Float64),
                ColumnMeta::new("active", DataType::Bool),
            ],
            SortOrder::Ascending,
        )
        .unwrap();
        table.insert_row(vec!["Alice".into(), Value::Float64(95.5), Value::Bool(true)]).unwrap();

        let json = to_json(&table).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "Alice");
        assert_eq!(parsed[0]["score"], 95.5);
        assert_eq!(parsed[0]["active"], true);
    }
}
