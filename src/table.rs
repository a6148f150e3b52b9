use std::io::{self, Write};

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use serde::ser::{SerializeMap, SerializeSeq, Serializer};

use crate::constants::{MISSING_VALUE, MULTISELECT_UNSELECTED, SAMPLE_NAME, is_private_column};
use crate::flatten::FlattenedRecord;
use crate::schema::MultiselectMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    columns: IndexSet<String>,
    rows: IndexMap<String, Vec<Option<String>>>,
}

impl ResultTable {
    /// Passes run in this order: multiselect backfill with `"false"`,
    /// then `"Missing: not provided"` for any other empty cell, then
    /// redaction of private columns. An absent multiselect cell means the
    /// choice was not selected, so it must be settled before the generic
    /// fill sees it.
    pub fn assemble(records: &[FlattenedRecord], multiselect: &MultiselectMap) -> Self {
        let mut table = Self::from_records(records);
        table.backfill_multiselect(multiselect);
        table.fill_missing();
        table.drop_private_columns();
        table
    }

    fn from_records(records: &[FlattenedRecord]) -> Self {
        let mut columns = IndexSet::new();
        for record in records {
            for column in record.values.keys() {
                if !columns.contains(column) {
                    columns.insert(column.clone());
                }
            }
        }

        let mut rows = IndexMap::new();
        for record in records {
            let cells = columns
                .iter()
                .map(|column| record.values.get(column).cloned())
                .collect();
            rows.entry(record.barcode.as_str().to_string())
                .or_insert(cells);
        }

        Self { columns, rows }
    }

    fn backfill_multiselect(&mut self, multiselect: &MultiselectMap) {
        let all = multiselect.all_columns();

        for (idx, column) in self.columns.iter().enumerate() {
            if !all.contains(column.as_str()) {
                continue;
            }
            for cells in self.rows.values_mut() {
                if cells[idx].is_none() {
                    cells[idx] = Some(MULTISELECT_UNSELECTED.to_string());
                }
            }
        }

        for column in all {
            if self.columns.contains(column) {
                continue;
            }
            self.columns.insert(column.to_string());
            for cells in self.rows.values_mut() {
                cells.push(Some(MULTISELECT_UNSELECTED.to_string()));
            }
        }
    }

    fn fill_missing(&mut self) {
        for cells in self.rows.values_mut() {
            for cell in cells.iter_mut() {
                if cell.as_deref().is_none_or(str::is_empty) {
                    *cell = Some(MISSING_VALUE.to_string());
                }
            }
        }
    }

    fn drop_private_columns(&mut self) {
        let keep = self
            .columns
            .iter()
            .map(|column| !is_private_column(column))
            .collect::<Vec<_>>();
        if keep.iter().all(|kept| *kept) {
            return;
        }

        self.columns = self
            .columns
            .iter()
            .zip(&keep)
            .filter(|(_, kept)| **kept)
            .map(|(column, _)| column.clone())
            .collect();
        for cells in self.rows.values_mut() {
            let mut kept = keep.iter();
            cells.retain(|_| kept.next().copied().unwrap_or(false));
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    pub fn sample_names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn cell(&self, sample_name: &str, column: &str) -> Option<&str> {
        let idx = self.columns.get_index_of(column)?;
        self.rows.get(sample_name)?.get(idx)?.as_deref()
    }

    pub fn write_tsv<W: Write>(&self, mut writer: W) -> io::Result<()> {
        let mut header = vec![SAMPLE_NAME.to_string()];
        header.extend(self.columns.iter().map(|column| sanitize_cell(column)));
        writeln!(writer, "{}", header.join("\t"))?;

        for (sample_name, cells) in &self.rows {
            let mut line = vec![sanitize_cell(sample_name)];
            line.extend(
                cells
                    .iter()
                    .map(|cell| sanitize_cell(cell.as_deref().unwrap_or(MISSING_VALUE))),
            );
            writeln!(writer, "{}", line.join("\t"))?;
        }
        writer.flush()
    }
}

fn sanitize_cell(value: &str) -> String {
    value.replace(['\t', '\n', '\r'], " ")
}

struct RowView<'a> {
    sample_name: &'a str,
    columns: &'a IndexSet<String>,
    cells: &'a [Option<String>],
}

impl Serialize for RowView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len() + 1))?;
        map.serialize_entry(SAMPLE_NAME, self.sample_name)?;
        for (column, cell) in self.columns.iter().zip(self.cells) {
            map.serialize_entry(column, cell.as_deref().unwrap_or(MISSING_VALUE))?;
        }
        map.end()
    }
}

impl Serialize for ResultTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for (sample_name, cells) in &self.rows {
            seq.serialize_element(&RowView {
                sample_name,
                columns: &self.columns,
                cells,
            })?;
        }
        seq.end()
    }
}
