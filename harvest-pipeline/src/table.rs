//! A small in-memory CSV table: a header plus rows of optional text cells.
//!
//! Empty cells load as missing. The operations cover what the combiner and the
//! reporter need and nothing more.

use harvest_core::CoreError;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::Path;

pub type Row = Vec<Option<String>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CoreError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(
                record
                    .iter()
                    .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                    .collect(),
            );
        }

        Ok(Self { headers, rows })
    }

    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let file = fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn cell<'a>(&self, row: &'a Row, column: &str) -> Option<&'a str> {
        self.column_index(column)
            .and_then(|idx| row.get(idx))
            .and_then(|cell| cell.as_deref())
    }

    /// Drops every column whose name satisfies `predicate`; returns the dropped names.
    pub fn drop_columns_where<F>(&mut self, predicate: F) -> Vec<String>
    where
        F: Fn(&str) -> bool,
    {
        let keep: Vec<bool> = self.headers.iter().map(|h| !predicate(h)).collect();
        if keep.iter().all(|k| *k) {
            return Vec::new();
        }

        let dropped = self
            .headers
            .iter()
            .zip(&keep)
            .filter(|(_, k)| !**k)
            .map(|(h, _)| h.clone())
            .collect();

        self.headers = retain_flagged(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            *row = retain_flagged(std::mem::take(row), &keep);
        }
        dropped
    }

    /// Turns every cell equal to `sentinel` into a missing value.
    pub fn replace_with_missing(&mut self, sentinel: &str) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.as_deref() == Some(sentinel) {
                *cell = None;
            }
        }
    }

    /// Drops rows where every listed column is missing. Unknown columns count as missing.
    pub fn drop_rows_missing_all(&mut self, columns: &[&str]) -> usize {
        let indices: Vec<Option<usize>> = columns.iter().map(|c| self.column_index(c)).collect();
        let before = self.rows.len();
        self.rows.retain(|row| {
            indices
                .iter()
                .any(|idx| idx.and_then(|i| row.get(i)).is_some_and(|cell| cell.is_some()))
        });
        before - self.rows.len()
    }

    pub fn fill_missing(&mut self, value: &str) {
        for cell in self.rows.iter_mut().flatten() {
            if cell.is_none() {
                *cell = Some(value.to_string());
            }
        }
    }

    fn numeric(&self, row: &Row, idx: usize) -> Option<f64> {
        row.get(idx)
            .and_then(|cell| cell.as_deref())
            .and_then(|cell| cell.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    /// Mean, minimum and maximum over the cells of `column` that parse as numbers.
    pub fn numeric_summary(&self, column: &str) -> Option<NumericSummary> {
        let idx = self.column_index(column)?;
        let values: Vec<f64> = self.rows.iter().filter_map(|r| self.numeric(r, idx)).collect();
        if values.is_empty() {
            return None;
        }

        let sum: f64 = values.iter().sum();
        Some(NumericSummary {
            count: values.len(),
            mean: sum / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    /// The `n` rows with the largest numeric `column`, ties kept in table order.
    pub fn top_n_by(&self, column: &str, n: usize) -> Vec<&Row> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };

        let mut ranked: Vec<(f64, &Row)> = self
            .rows
            .iter()
            .filter_map(|row| self.numeric(row, idx).map(|value| (value, row)))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0));
        ranked.into_iter().take(n).map(|(_, row)| row).collect()
    }

    /// Occurrences of each present value in `column`, most frequent first,
    /// ties in order of first appearance.
    pub fn value_counts(&self, column: &str) -> Vec<(String, usize)> {
        let Some(idx) = self.column_index(column) else {
            return Vec::new();
        };

        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in self.rows.iter().filter_map(|row| row.get(idx)?.as_deref()) {
            let count = counts.entry(value).or_insert(0);
            if *count == 0 {
                order.push(value.to_string());
            }
            *count += 1;
        }

        let mut result: Vec<(String, usize)> = order
            .into_iter()
            .map(|value| {
                let count = counts[value.as_str()];
                (value, count)
            })
            .collect();
        result.sort_by(|a, b| b.1.cmp(&a.1));
        result
    }

    /// Rows whose `column` holds text of non-zero length.
    pub fn count_non_empty(&self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        self.rows
            .iter()
            .filter(|row| row.get(idx).is_some_and(|cell| cell.as_ref().is_some_and(|c| !c.is_empty())))
            .count()
    }

    /// Appends `other`'s rows; both tables must share the same header.
    pub fn append(&mut self, other: Table) -> Result<(), CoreError> {
        if self.headers.is_empty() && self.rows.is_empty() {
            *self = other;
            return Ok(());
        }
        if self.headers != other.headers {
            return Err(CoreError::invalid_input(format!(
                "column mismatch: expected [{}], found [{}]",
                self.headers.join(", "),
                other.headers.join(", ")
            )));
        }
        self.rows.extend(other.rows);
        Ok(())
    }
}

fn retain_flagged<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(item, _)| item)
        .collect()
}
