//! Tests for the text formats shared by files and streams.

use proptest::prelude::*;
use tessera_containers::codec::{Codec, format_numbers, parse_numbers};
use tessera_containers::{Container, ContainerError, Dataset, Family, TextTable};

// ─────────────────────────────────────────────────────────────────────────
// Tables
// ─────────────────────────────────────────────────────────────────────────

const SURVEY: &str = "\
# station survey
> north line
1 2 3
4,5,6

> south line
7 8 NaN
";

#[test]
fn dataset_keeps_headers_and_segments() {
    let dataset = Dataset::decode(&mut SURVEY.as_bytes()).unwrap();
    assert_eq!(dataset.n_columns, 3);
    assert_eq!(dataset.tables[0].headers, vec!["station survey".to_string()]);
    assert_eq!(dataset.n_segments(), 2);
    assert_eq!(dataset.n_records(), 3);

    let segments: Vec<_> = dataset.segments().collect();
    assert_eq!(segments[0].header.as_deref(), Some("north line"));
    assert_eq!(segments[0].row(1), Some(vec![4.0, 5.0, 6.0]));
    assert!(segments[1].row(0).unwrap()[2].is_nan());
}

#[test]
fn ragged_rows_name_the_line() {
    let err = Dataset::decode(&mut "1 2\n3\n".as_bytes()).unwrap_err();
    assert!(matches!(err, ContainerError::Parse { .. }));
    assert!(err.to_string().contains('2'));
}

#[test]
fn text_lines_are_kept_verbatim() {
    let text = TextTable::decode(&mut "> a\n  indented, with comma\n".as_bytes()).unwrap();
    assert_eq!(text.tables[0].segments[0].lines, vec!["  indented, with comma".to_string()]);
}

#[test]
fn later_unnamed_segments_keep_their_marker() {
    let mut dataset = Dataset::decode(&mut "1\n>\n2\n".as_bytes()).unwrap();
    assert_eq!(dataset.n_segments(), 2);
    dataset.shrink_to_fit();

    let mut out = Vec::new();
    Container::Dataset(dataset).encode(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "1\n>\n2\n");
}

#[test]
fn family_dispatch_rejects_garbage_grids() {
    let err = Container::decode(Family::Grid, &mut "not json\n".as_bytes()).unwrap_err();
    assert!(matches!(err, ContainerError::Header(_)));
}

// ─────────────────────────────────────────────────────────────────────────
// Numbers
// ─────────────────────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn formatted_rows_parse_back_exactly(
        values in prop::collection::vec(-1.0e12f64..1.0e12, 0..16),
    ) {
        let line = format_numbers(&values);
        prop_assert_eq!(parse_numbers(&line, 1).unwrap(), values);
    }
}
