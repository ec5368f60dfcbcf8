//! Structural edits: row/column insertion and removal, merge and split

use cadsheet::prelude::*;
use pretty_assertions::assert_eq;

fn addr(s: &str) -> CellAddress {
    CellAddress::parse(s).unwrap()
}

fn range(s: &str) -> CellRange {
    CellRange::parse(s).unwrap()
}

#[test]
fn inserting_rows_shifts_cells_aliases_and_references() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("A2"), "5").unwrap();
    doc.set_alias(addr("A2"), "depth").unwrap();
    doc.set_content(addr("B2"), "=A2*2").unwrap();
    doc.set_content(addr("B3"), "=depth+1").unwrap();
    doc.recalculate();

    // Insert 3 rows above row 2 (0-based row 1)
    doc.insert_rows(1, 3).unwrap();
    doc.recalculate();

    // Cells shifted
    assert_eq!(doc.value(addr("A5")), CellValue::Number(5.0));
    assert_eq!(doc.value(addr("A2")), CellValue::Empty);

    // Alias follows the same logical cell
    assert_eq!(doc.sheet().resolve_alias("depth"), Some(addr("A5")));

    // References still point at the same logical cells
    assert_eq!(doc.value(addr("B5")), CellValue::Number(10.0));
    assert_eq!(doc.value(addr("B6")), CellValue::Number(6.0));
    assert_eq!(doc.content_text(addr("B5")), Some("=A5*2".into()));

    // Values did not change, only addresses did
    doc.set_content(addr("A5"), "6").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("B5")), CellValue::Number(12.0));
    assert_eq!(doc.value(addr("B6")), CellValue::Number(7.0));
}

#[test]
fn inserting_columns_shifts_references() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("B1"), "3").unwrap();
    doc.set_content(addr("C1"), "=B1^2").unwrap();
    doc.recalculate();

    doc.insert_cols(1, 2).unwrap();
    doc.recalculate();

    assert_eq!(doc.value(addr("D1")), CellValue::Number(3.0));
    assert_eq!(doc.value(addr("E1")), CellValue::Number(9.0));
    assert_eq!(doc.content_text(addr("E1")), Some("=D1^2".into()));
}

#[test]
fn ranges_grow_when_rows_are_inserted_inside() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("A1"), "1").unwrap();
    doc.set_content(addr("A2"), "2").unwrap();
    doc.set_content(addr("A3"), "3").unwrap();
    doc.set_content(addr("B1"), "=SUM(A1:A3)").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("B1")), CellValue::Number(6.0));

    // Insert inside the summed range, then fill the gap
    doc.insert_rows(1, 1).unwrap();
    assert_eq!(doc.content_text(addr("B1")), Some("=SUM(A1:A4)".into()));

    doc.set_content(addr("A2"), "10").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("B1")), CellValue::Number(16.0));
}

#[test]
fn removing_rows_severs_references_into_the_span() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("A1"), "1").unwrap();
    doc.set_content(addr("A2"), "2").unwrap();
    doc.set_content(addr("B3"), "=A1+A2").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("B3")), CellValue::Number(3.0));

    // Remove row 1: A1 is destroyed, A2 slides up
    doc.remove_rows(0, 1).unwrap();
    doc.recalculate();

    // The formula (now at B2) lost one operand and reports it
    assert_eq!(doc.content_text(addr("B2")), Some("=#REF!+A1".into()));
    assert_eq!(
        doc.value(addr("B2")),
        CellValue::Error(CellError::Unresolved)
    );
}

#[test]
fn removing_rows_clamps_ranges() {
    let mut doc = Document::new("Test");
    for (cell, value) in [("A1", "1"), ("A2", "2"), ("A3", "3"), ("A4", "4")] {
        doc.set_content(addr(cell), value).unwrap();
    }
    doc.set_content(addr("B1"), "=SUM(A2:A4)").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("B1")), CellValue::Number(9.0));

    // Remove rows 3-4 (0-based 2..4); the range tail is swallowed
    doc.remove_rows(2, 2).unwrap();
    doc.recalculate();

    assert_eq!(doc.content_text(addr("B1")), Some("=SUM(A2:A2)".into()));
    assert_eq!(doc.value(addr("B1")), CellValue::Number(2.0));
}

#[test]
fn removing_columns_mirrors_row_semantics() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("A1"), "1").unwrap();
    doc.set_content(addr("B1"), "2").unwrap();
    doc.set_content(addr("C1"), "=A1+B1").unwrap();
    doc.set_alias(addr("B1"), "width").unwrap();
    doc.recalculate();

    doc.remove_cols(1, 1).unwrap();
    doc.recalculate();

    // C1 slid to B1; its reference to the removed column is severed
    assert_eq!(doc.content_text(addr("B1")), Some("=A1+#REF!".into()));
    assert_eq!(
        doc.value(addr("B1")),
        CellValue::Error(CellError::Unresolved)
    );
    assert_eq!(doc.sheet().resolve_alias("width"), None);
}

#[test]
fn merge_then_split_restores_retained_content() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("A1"), "1").unwrap();
    doc.set_content(addr("B1"), "2").unwrap();
    doc.set_content(addr("A2"), "3").unwrap();
    doc.set_content(addr("B2"), "4").unwrap();
    doc.recalculate();

    doc.merge_cells(range("A1:B2")).unwrap();
    doc.recalculate();

    // While merged, every covered address reads the anchor
    for cell in ["A1", "B1", "A2", "B2"] {
        assert_eq!(doc.value(addr(cell)), CellValue::Number(1.0));
    }

    doc.split_cell(addr("A1")).unwrap();
    doc.recalculate();

    // Split restores independent access with pre-merge content intact
    assert_eq!(doc.value(addr("A1")), CellValue::Number(1.0));
    assert_eq!(doc.value(addr("B1")), CellValue::Number(2.0));
    assert_eq!(doc.value(addr("A2")), CellValue::Number(3.0));
    assert_eq!(doc.value(addr("B2")), CellValue::Number(4.0));
}

#[test]
fn formulas_reading_covered_cells_follow_the_anchor() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("A1"), "10").unwrap();
    doc.set_content(addr("B1"), "99").unwrap();
    doc.set_content(addr("D1"), "=B1*2").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("D1")), CellValue::Number(198.0));

    doc.merge_cells(range("A1:B1")).unwrap();
    doc.recalculate();
    // B1 is covered: its readers now see the anchor's value
    assert_eq!(doc.value(addr("D1")), CellValue::Number(20.0));

    // A change to the anchor reaches readers of covered addresses
    doc.set_content(addr("A1"), "15").unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("D1")), CellValue::Number(30.0));

    doc.split_cell(addr("A1")).unwrap();
    doc.recalculate();
    assert_eq!(doc.value(addr("D1")), CellValue::Number(198.0));
}

#[test]
fn merge_conflicts_reject_without_state_change() {
    let mut doc = Document::new("Test");
    doc.merge_cells(range("A1:B2")).unwrap();

    // Overlap
    assert!(doc.merge_cells(range("B2:C3")).is_err());
    // Split of a non-anchor
    assert!(doc.split_cell(addr("B2")).is_err());
    // Writes into covered cells are rejected
    assert!(doc.set_content(addr("B2"), "1").is_err());

    assert_eq!(doc.sheet().merged_regions().to_vec(), vec![range("A1:B2")]);
}

#[test]
fn merged_regions_move_with_structural_edits() {
    let mut doc = Document::new("Test");
    doc.set_content(addr("B2"), "7").unwrap();
    doc.merge_cells(range("B2:C3")).unwrap();

    doc.insert_rows(0, 2).unwrap();
    doc.insert_cols(0, 1).unwrap();

    assert_eq!(doc.sheet().merged_regions().to_vec(), vec![range("C4:D5")]);
    assert_eq!(doc.value(addr("D5")), CellValue::Number(7.0));
    assert!(doc.sheet().is_covered(addr("D5")));
}

#[test]
fn structural_conflict_errors_are_structural() {
    let mut doc = Document::new("Test");
    doc.merge_cells(range("A1:B1")).unwrap();

    let err = doc.merge_cells(range("A1:B1")).unwrap_err();
    assert!(matches!(
        err,
        DocumentError::Sheet(cadsheet::core::Error::StructuralConflict(_))
    ));
}
