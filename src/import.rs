use std::path::Path;

use anyhow::{Context, Result, anyhow};
use calamine::{Data, DataType, Reader, open_workbook_auto};
use chrono::{NaiveDateTime, NaiveTime};
use log::info;
use rust_decimal::Decimal;

use crate::{
    coerce::{CoercionRules, normalize_header},
    kinds::Registry,
    storage::{Region, TabularStorage},
};

/// Renders one Excel cell as region text. Numbers are written so that `rules`
/// reads them back as the same value; dates become ISO dates.
fn cell_text(cell: &Data, rules: &CoercionRules) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(number_text(*f, rules)),
        Data::DateTime(dt) if dt.is_datetime() => Some(
            dt.as_datetime()
                .map(format_datetime)
                .unwrap_or_else(|| dt.to_string()),
        ),
        Data::DateTimeIso(raw) => Some(
            cell.as_datetime()
                .map(format_datetime)
                .or_else(|| cell.as_date().map(|d| d.format("%Y-%m-%d").to_string()))
                .unwrap_or_else(|| raw.clone()),
        ),
        other => Some(other.as_string().unwrap_or_else(|| other.to_string())),
    }
}

fn number_text(value: f64, rules: &CoercionRules) -> String {
    match Decimal::try_from(value) {
        Ok(decimal) => rules.format_decimal(decimal),
        Err(_) => value.to_string(),
    }
}

fn format_datetime(value: NaiveDateTime) -> String {
    if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Copies every sheet of an Excel workbook into `storage`, one region per sheet.
///
/// Sheets that belong to a registered kind are written with that kind's
/// coercion rules; other sheets use the defaults. Returns the imported sheet
/// names with their data row counts.
pub fn import_excel<S>(
    path: &Path,
    storage: &mut S,
    registry: &Registry,
) -> Result<Vec<(String, usize)>>
where
    S: TabularStorage + ?Sized,
{
    let mut workbook =
        open_workbook_auto(path).map_err(|e| anyhow!("Opening Excel workbook {path:?}: {e}"))?;
    let sheet_names = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(anyhow!("Excel workbook {path:?} has no worksheets"));
    }

    let default_rules = CoercionRules::default();
    let mut imported = Vec::with_capacity(sheet_names.len());
    for sheet in sheet_names {
        let region_name = sheet.trim();
        let rules = registry
            .get(region_name)
            .map(|kind| &kind.coercion)
            .unwrap_or(&default_rules);
        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| anyhow!("Reading sheet '{sheet}': {e}"))?;
        let mut rows = range.rows();
        let headers = rows
            .next()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        normalize_header(cell_text(cell, &default_rules).as_deref())
                            .unwrap_or_default()
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        let width = headers.len();
        let data = rows
            .map(|row| {
                let mut cells = row
                    .iter()
                    .map(|cell| cell_text(cell, rules).unwrap_or_default())
                    .collect::<Vec<_>>();
                cells.resize(width, String::new());
                cells
            })
            .collect::<Vec<_>>();
        let region = Region {
            headers,
            rows: data,
        };
        storage
            .write_region(region_name, &region)
            .with_context(|| format!("Writing sheet '{sheet}'"))?;
        info!("Imported sheet '{region_name}' ({} row(s))", region.rows.len());
        imported.push((region_name.to_string(), region.rows.len()));
    }
    Ok(imported)
}
