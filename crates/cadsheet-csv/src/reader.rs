//! CSV import

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::CsvResult;
use crate::options::CsvImportOptions;
use cadsheet_core::{CellAddress, Sheet};

/// CSV importer
///
/// Each populated field becomes a raw-content write into the sheet, so
/// fields beginning with the formula marker come back as formula cells and
/// everything else is type-sniffed exactly like an interactive edit. The
/// caller is expected to rebuild the dependency graph afterwards (the
/// document layer's load path does this).
pub struct CsvReader;

impl CsvReader {
    /// Read a CSV file into a new sheet
    pub fn read_file<P: AsRef<Path>>(path: P, options: &CsvImportOptions) -> CsvResult<Sheet> {
        let file = File::open(path)?;
        Self::read(file, options)
    }

    /// Read CSV from a reader into a new sheet
    pub fn read<R: Read>(reader: R, options: &CsvImportOptions) -> CsvResult<Sheet> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut sheet = Sheet::new("Imported");

        for (row, result) in csv_reader.records().enumerate() {
            let record = result?;

            for (col, field) in record.iter().enumerate() {
                if field.is_empty() {
                    continue;
                }
                let addr = CellAddress::new(row as u32, col as u16);
                sheet.set_content(addr, field)?;
            }
        }

        Ok(sheet)
    }
}
