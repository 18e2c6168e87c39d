use std::fmt::Write as _;

use crate::listing::Listing;
use crate::record::Value;

/// Renders a listing as an aligned text table: display position first, the
/// stored columns, then the derived label. Numeric cells are right-aligned.
pub fn render_listing(listing: &Listing) -> String {
    let mut headers = Vec::with_capacity(listing.headers.len() + 2);
    headers.push("#".to_string());
    headers.extend(listing.headers.iter().cloned());
    if let Some(derived) = &listing.derived {
        headers.push(derived.clone());
    }

    let mut numeric = vec![true];
    numeric.extend(listing.headers.iter().enumerate().map(|(idx, _)| {
        listing
            .rows
            .first()
            .and_then(|row| row.cells.get(idx))
            .is_some_and(|cell| !matches!(cell, Value::Text(_)))
    }));
    numeric.push(false);

    let rows = listing
        .rows
        .iter()
        .map(|row| {
            let mut cells = Vec::with_capacity(headers.len());
            cells.push(row.position.to_string());
            cells.extend(row.cells.iter().map(|cell| sanitize_cell(&cell.as_display())));
            if listing.derived.is_some() {
                cells.push(row.label.clone().unwrap_or_default());
            }
            cells
        })
        .collect::<Vec<_>>();

    let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_line(&headers, &widths, &[]));
    let rule = widths.iter().map(|w| "-".repeat((*w).max(1))).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_line(&rule, &widths, &[]));
    for row in &rows {
        let _ = writeln!(output, "{}", format_line(row, &widths, &numeric));
    }
    if rows.is_empty() {
        let _ = writeln!(output, "(no rows)");
    }
    output
}

fn format_line(cells: &[String], widths: &[usize], right_align: &[bool]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(idx, (cell, &width))| {
            if right_align.get(idx).copied().unwrap_or(false) {
                format!("{cell:>width$}")
            } else {
                format!("{cell:<width$}")
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

fn sanitize_cell(value: &str) -> String {
    value.replace(['\n', '\r', '\t'], " ")
}
