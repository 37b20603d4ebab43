mod support;

use gpui_plate_table::table::{
    merge_cells, set_heading_columns, set_heading_rows, split_cell_horizontally,
    split_cell_vertically,
};
use support::{
    cell_path, doc_with, heading_counts, mutate, render, table, table_of, table_with_headings,
};

#[test]
fn vertical_split_of_single_cell_widens_its_column() {
    let mut doc = doc_with(table(&[&["a", "b"], &["c", "d"]]));
    mutate(&mut doc, |w| split_cell_vertically(w, &cell_path(0, 0), 2)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a", "", "b"], vec!["c|c2", "d"]]
    );
}

#[test]
fn vertical_split_shares_out_an_existing_colspan() {
    let mut doc = doc_with(table(&[&["a|c3"], &["b", "c", "d"]]));
    mutate(&mut doc, |w| split_cell_vertically(w, &cell_path(0, 0), 2)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a|c2", ""], vec!["b", "c", "d"]]
    );
}

#[test]
fn vertical_split_inside_heading_columns_grows_them() {
    let mut doc = doc_with(table_with_headings(&[&["a", "b"]], 0, 1));
    mutate(&mut doc, |w| split_cell_vertically(w, &cell_path(0, 0), 3)).unwrap();

    assert_eq!(render(table_of(&doc)), vec![vec!["a", "", "", "b"]]);
    assert_eq!(heading_counts(table_of(&doc)), (0, 3));
}

#[test]
fn horizontal_split_of_single_cell_adds_rows() {
    let mut doc = doc_with(table(&[&["a", "b"], &["c", "d"]]));
    mutate(&mut doc, |w| split_cell_horizontally(w, &cell_path(0, 0), 2)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a", "b|r2"], vec![""], vec!["c", "d"]]
    );
}

#[test]
fn horizontal_split_places_new_cells_at_even_rows() {
    let mut doc = doc_with(table(&[&["a|r4", "b"], &["c"], &["d"], &["e"]]));
    mutate(&mut doc, |w| split_cell_horizontally(w, &cell_path(0, 0), 2)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a|r2", "b"], vec!["c"], vec!["|r2", "d"], vec!["e"]]
    );
}

#[test]
fn horizontal_split_gives_remainder_to_original_cell() {
    let mut doc = doc_with(table(&[&["a|r4", "b"], &["c"], &["d"], &["e"]]));
    mutate(&mut doc, |w| split_cell_horizontally(w, &cell_path(0, 0), 3)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a|r2", "b"], vec!["c"], vec!["", "d"], vec!["", "e"]]
    );
}

#[test]
fn split_into_fewer_than_two_cells_is_rejected() {
    let mut doc = doc_with(table(&[&["a"]]));
    let err = mutate(&mut doc, |w| split_cell_vertically(w, &cell_path(0, 0), 1)).unwrap_err();
    assert_eq!(err.code(), "tableutils-splitcell-invalid-count");
}

#[test]
fn merge_appends_content_of_non_empty_cells() {
    let mut doc = doc_with(table(&[&["a", "b"], &["c", "d"]]));
    let merged = mutate(&mut doc, |w| merge_cells(w, &[cell_path(0, 0), cell_path(0, 1)])).unwrap();

    assert_eq!(merged, cell_path(0, 0));
    assert_eq!(render(table_of(&doc)), vec![vec!["a\nb|c2"], vec!["c", "d"]]);
}

#[test]
fn merging_whole_table_collapses_to_one_cell() {
    let mut doc = doc_with(table(&[&["a", "b"], &["c", "d"]]));
    mutate(&mut doc, |w| {
        merge_cells(
            w,
            &[cell_path(1, 1), cell_path(0, 0), cell_path(1, 0), cell_path(0, 1)],
        )
    })
    .unwrap();

    assert_eq!(render(table_of(&doc)), vec![vec!["a\nb\nc\nd"]]);
}

#[test]
fn merge_into_empty_cell_replaces_its_content() {
    let mut doc = doc_with(table(&[&["", "b"], &["c", "d"]]));
    mutate(&mut doc, |w| merge_cells(w, &[cell_path(0, 0), cell_path(0, 1)])).unwrap();

    let table = table_of(&doc);
    assert_eq!(render(table), vec![vec!["b|c2"], vec!["c", "d"]]);
    let first = table.children[0].as_element().unwrap().children[0].as_element().unwrap();
    assert_eq!(first.children.len(), 1);
}

#[test]
fn merge_undoes_a_vertical_split() {
    let original = table(&[&["a", "b"], &["c", "d"]]);
    let mut doc = doc_with(original.clone());
    mutate(&mut doc, |w| split_cell_vertically(w, &cell_path(0, 0), 2)).unwrap();
    mutate(&mut doc, |w| merge_cells(w, &[cell_path(0, 0), cell_path(0, 1)])).unwrap();

    assert_eq!(doc, doc_with(original));
}

#[test]
fn heading_rows_split_cells_crossing_the_new_boundary() {
    let mut doc = doc_with(table(&[&["a|r3", "b"], &["c"], &["d"]]));
    mutate(&mut doc, |w| set_heading_rows(w, &[0], 2)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a|r2", "b"], vec!["c"], vec!["", "d"]]
    );
    assert_eq!(heading_counts(table_of(&doc)), (2, 0));
}

#[test]
fn heading_rows_split_a_body_cell_reaching_into_the_new_section() {
    let mut doc = doc_with(table(&[&["a", "b"], &["c|r2", "d"], &["e"], &["f", "g"]]));
    mutate(&mut doc, |w| set_heading_rows(w, &[0], 2)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a", "b"], vec!["c", "d"], vec!["", "e"], vec!["f", "g"]]
    );
}

#[test]
fn heading_rows_are_clamped_and_cleared_at_zero() {
    let mut doc = doc_with(table_with_headings(&[&["a"], &["b"]], 1, 0));
    mutate(&mut doc, |w| set_heading_rows(w, &[0], 5)).unwrap();
    assert_eq!(heading_counts(table_of(&doc)), (2, 0));

    mutate(&mut doc, |w| set_heading_rows(w, &[0], 0)).unwrap();
    assert_eq!(heading_counts(table_of(&doc)), (0, 0));
    assert!(table_of(&doc).attrs.is_empty());
}

#[test]
fn heading_columns_split_cells_crossing_the_new_boundary() {
    let mut doc = doc_with(table(&[&["a|c3"], &["b", "c", "d"]]));
    mutate(&mut doc, |w| set_heading_columns(w, &[0], 1)).unwrap();

    assert_eq!(
        render(table_of(&doc)),
        vec![vec!["a", "|c2"], vec!["b", "c", "d"]]
    );
    assert_eq!(heading_counts(table_of(&doc)), (0, 1));
}
