//! End-to-end cleaner checks: spreadsheet grid -> tidy CSV -> loaded table.

use impactview::config::RawLayout;
use impactview::data::{Cleaner, RawCell, TidyTable};

fn text(s: &str) -> RawCell {
    RawCell::Text(s.to_string())
}

fn month(i: usize) -> String {
    format!("{}-{:02}-01", 2011 + i / 12, i % 12 + 1)
}

/// Grid shaped like the vendor export: preamble, composite headers,
/// boilerplate rows, then monthly records.
fn sample_grid(layout: &RawLayout, records: usize, units: usize) -> Vec<Vec<RawCell>> {
    let mut rows: Vec<Vec<RawCell>> = Vec::new();
    for _ in 0..layout.header_row {
        rows.push(vec![text("preamble")]);
    }

    let mut header = vec![text("SIE, Título")];
    for u in 0..units {
        let name = if u == 0 {
            "Transacciones, Acapulco de Juárez".to_string()
        } else {
            format!("Transacciones, Unidad {u}")
        };
        header.push(text(&name));
    }
    rows.push(header);

    for _ in 0..layout.skip_rows {
        rows.push(vec![text("N/E"); units + 1]);
    }
    for i in 0..records {
        let mut row = vec![text(&month(i))];
        row.extend((0..units).map(|u| RawCell::Number(500.0 + (i * units + u) as f64)));
        rows.push(row);
    }
    rows
}

#[test]
fn cleaning_is_idempotent() {
    let layout = RawLayout::default();
    let rows = sample_grid(&layout, 36, 6);
    let cleaner = Cleaner::new(layout);

    let dir = tempfile::tempdir().expect("tempdir");
    let first_path = dir.path().join("first.csv");
    let second_path = dir.path().join("second.csv");

    let mut df = cleaner.tidy_frame(&rows).expect("clean");
    Cleaner::write_csv(&mut df, &first_path).expect("write");
    let mut df = cleaner.tidy_frame(&rows).expect("clean again");
    Cleaner::write_csv(&mut df, &second_path).expect("write again");

    let first = std::fs::read(&first_path).expect("read first");
    let second = std::fs::read(&second_path).expect("read second");
    assert!(!first.is_empty());
    assert_eq!(first, second, "re-running the cleaner must be byte-identical");
}

#[test]
fn cleaned_file_loads_as_tidy_table() {
    let layout = RawLayout::default();
    let rows = sample_grid(&layout, 30, 5);
    let cleaner = Cleaner::new(layout);

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tidy.csv");
    let mut df = cleaner.tidy_frame(&rows).expect("clean");
    Cleaner::write_csv(&mut df, &path).expect("write");

    let table = TidyTable::load_csv(&path).expect("load");
    assert_eq!(table.len(), 30 - 8);
    assert_eq!(table.treated_unit(), "Acapulco de Juárez");
    assert_eq!(table.units().len(), 5);

    // dates survive the round trip in order
    let dates = table.dates();
    assert!(dates.windows(2).all(|w| w[0] < w[1]));

    // numeric values survive the round trip
    let values = table.values("Unidad 1").expect("values");
    assert!(values.iter().all(|v| v.is_some()));
}
