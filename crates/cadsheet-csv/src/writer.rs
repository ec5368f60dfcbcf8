//! CSV export

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::CsvResult;
use crate::options::{CsvExportOptions, LineTerminator};
use cadsheet_core::{CellAddress, Sheet};

/// CSV exporter
///
/// Writes *raw* content row-major: literals as their display text, formulas
/// as their source text. Evaluated results are deliberately not exported —
/// re-importing a sheet re-parses its formulas and recomputes, so derived
/// values survive the roundtrip without being frozen into the file.
pub struct CsvWriter;

impl CsvWriter {
    /// Write a sheet to a CSV file
    pub fn write_file<P: AsRef<Path>>(
        sheet: &Sheet,
        path: P,
        options: &CsvExportOptions,
    ) -> CsvResult<()> {
        let file = File::create(path)?;
        Self::write(sheet, file, options)
    }

    /// Write a sheet to a writer
    pub fn write<W: Write>(sheet: &Sheet, writer: W, options: &CsvExportOptions) -> CsvResult<()> {
        let terminator = match options.line_terminator {
            LineTerminator::LF => csv::Terminator::Any(b'\n'),
            LineTerminator::CRLF => csv::Terminator::CRLF,
        };

        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(options.delimiter)
            .quote(options.quote)
            .terminator(terminator)
            .from_writer(writer);

        if let Some(range) = sheet.used_range() {
            for row in range.start.row..=range.end.row {
                let mut record = Vec::new();

                for col in range.start.col..=range.end.col {
                    let addr = CellAddress::new(row, col);
                    record.push(sheet.content_text(addr).unwrap_or_default());
                }

                csv_writer.write_record(&record)?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn test_export_writes_formula_source() {
        let mut sheet = Sheet::new("Test");
        sheet.set_content(addr("A1"), "5").unwrap();
        sheet.set_content(addr("B1"), "=A1*2").unwrap();
        sheet.set_content(addr("A2"), "note").unwrap();

        let mut buffer = Vec::new();
        CsvWriter::write(&sheet, &mut buffer, &CsvExportOptions::default()).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text, "5,=A1*2\nnote,\n");
    }

    #[test]
    fn test_export_empty_sheet() {
        let sheet = Sheet::new("Test");
        let mut buffer = Vec::new();
        CsvWriter::write(&sheet, &mut buffer, &CsvExportOptions::default()).unwrap();
        assert!(buffer.is_empty());
    }
}
