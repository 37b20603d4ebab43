mod support;

use gpui_plate_table::table::{
    TableRect, get_selected_table_cells, get_selection_affected_table_cells,
    is_selection_rectangular, selection_extents,
};
use gpui_plate_table::{Path, Point, Selection};
use support::{cell_path, doc_with, table, table_with_headings};

fn cells(positions: &[(usize, usize)]) -> Vec<Path> {
    positions.iter().map(|&(row, cell)| cell_path(row, cell)).collect()
}

fn three_by_three() -> gpui_plate_table::Document {
    doc_with(table(&[
        &["a", "b", "c"],
        &["d", "e", "f"],
        &["g", "h", "i"],
    ]))
}

#[test]
fn selected_cells_come_back_in_document_order() {
    let doc = three_by_three();
    let picked = cells(&[(1, 1), (0, 0), (1, 1)]);
    let selection = Selection::on_elements(&picked);

    assert_eq!(
        get_selected_table_cells(&doc, &selection),
        cells(&[(0, 0), (1, 1)])
    );
}

#[test]
fn caret_affects_its_own_cell() {
    let doc = three_by_three();
    let selection = Selection::collapsed(Point::new(vec![0, 2, 1, 0], 0));

    assert!(get_selected_table_cells(&doc, &selection).is_empty());
    assert_eq!(
        get_selection_affected_table_cells(&doc, &selection),
        cells(&[(2, 1)])
    );
}

#[test]
fn square_block_is_rectangular() {
    let doc = three_by_three();
    assert!(is_selection_rectangular(
        &doc,
        &cells(&[(1, 1), (1, 2), (2, 1), (2, 2)])
    ));
}

#[test]
fn l_shape_is_not_rectangular() {
    let doc = three_by_three();
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0), (0, 1), (1, 0)])));
}

#[test]
fn single_cell_is_not_rectangular() {
    let doc = three_by_three();
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0)])));
    assert!(!is_selection_rectangular(&doc, &[]));
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0), (0, 0)])));
}

#[test]
fn selection_across_the_heading_boundary_is_not_rectangular() {
    let doc = doc_with(table_with_headings(&[&["a", "b"], &["c", "d"]], 1, 0));
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0), (1, 0)])));
    assert!(is_selection_rectangular(&doc, &cells(&[(1, 0), (1, 1)])));

    let doc = doc_with(table_with_headings(&[&["a", "b"], &["c", "d"]], 0, 1));
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0), (0, 1)])));
}

#[test]
fn spanned_cells_count_with_their_full_area() {
    let doc = doc_with(table(&[&["a|c2", "b"], &["c", "d", "e"]]));
    assert!(is_selection_rectangular(&doc, &cells(&[(0, 0), (1, 0), (1, 1)])));
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0), (1, 0)])));

    let doc = doc_with(table(&[&["a|r2", "b"], &["c"]]));
    assert!(!is_selection_rectangular(&doc, &cells(&[(0, 0), (0, 1)])));
    assert!(is_selection_rectangular(&doc, &cells(&[(0, 0), (0, 1), (1, 0)])));
}

#[test]
fn extents_include_the_far_edges_of_spans() {
    let doc = doc_with(table(&[&["a|c2", "b"], &["c", "d", "e"]]));
    assert_eq!(
        selection_extents(&doc, &cells(&[(0, 0), (1, 0)])),
        Some(TableRect {
            start_row: 0,
            start_column: 0,
            end_row: 1,
            end_column: 1,
        })
    );
    assert_eq!(
        selection_extents(&doc, &cells(&[(1, 2)])),
        Some(TableRect {
            start_row: 1,
            start_column: 2,
            end_row: 1,
            end_column: 2,
        })
    );
    assert_eq!(selection_extents(&doc, &[]), None);
}
