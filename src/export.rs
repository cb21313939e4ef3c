use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::catalog::StatTable;
use crate::report::{Cell, ReportTable};

const SHEET_NAME_MAX: usize = 31;

/// Writes every (player, record) row joined across the snapshot tables, with the
/// header in catalog order. Returns the number of data rows.
pub fn export_csv(conn: &Connection, path: &Path) -> Result<usize> {
    let columns = StatTable::ALL
        .iter()
        .flat_map(|table| {
            table
                .columns()
                .into_iter()
                .map(move |column| (table.name(), column))
        })
        .collect::<Vec<_>>();
    let select = columns
        .iter()
        .map(|(table, column)| format!("{table}.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT players.name, records.taken_at, {select}
         FROM stats
         JOIN players ON players.id = stats.player_id
         JOIN records ON records.id = stats.record_id
         JOIN weapon_stats ON weapon_stats.player_id = stats.player_id
             AND weapon_stats.record_id = stats.record_id
         JOIN operator_stats ON operator_stats.player_id = stats.player_id
             AND operator_stats.record_id = stats.record_id
         ORDER BY records.id, players.id"
    );

    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    let mut header = vec!["name".to_string(), "taken_at".to_string()];
    header.extend(columns.iter().map(|(_, column)| column.to_string()));
    writer.write_record(&header).context("write csv header")?;

    let mut stmt = conn.prepare(&sql).context("prepare csv export query")?;
    let mut rows = stmt.query([]).context("run csv export query")?;
    let mut written = 0usize;
    while let Some(row) = rows.next().context("read csv export row")? {
        let mut record = Vec::with_capacity(columns.len() + 2);
        record.push(row.get::<_, String>(0).context("read player name")?);
        record.push(row.get::<_, String>(1).context("read record time")?);
        for (idx, (_, column)) in columns.iter().enumerate() {
            let value = row
                .get::<_, f64>(idx + 2)
                .with_context(|| format!("read column {column}"))?;
            record.push(format_number(value));
        }
        writer.write_record(&record).context("write csv row")?;
        written += 1;
    }
    writer.flush().context("flush csv export")?;
    Ok(written)
}

/// Integral values print without a fraction.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

pub fn export_report_csv(path: &Path, table: &ReportTable) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in table.to_string_rows() {
        writer.write_record(&row).context("write csv row")?;
    }
    writer.flush().context("flush report csv")?;
    Ok(())
}

/// One worksheet per table, named after the table title.
pub fn export_reports_xlsx(path: &Path, tables: &[ReportTable]) -> Result<()> {
    let mut workbook = Workbook::new();
    for (idx, table) in tables.iter().enumerate() {
        let sheet = workbook.add_worksheet();
        sheet.set_name(sheet_name(&table.title, idx))?;
        write_rows(sheet, table)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(())
}

fn sheet_name(title: &str, idx: usize) -> String {
    let cleaned = title
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => ' ',
            other => other,
        })
        .collect::<String>();
    let cleaned = cleaned.trim().trim_matches('\'');
    if cleaned.is_empty() {
        return format!("Report{}", idx + 1);
    }
    let suffix = format!(" {}", idx + 1);
    let keep = SHEET_NAME_MAX - suffix.len();
    let mut name = cleaned.chars().take(keep).collect::<String>();
    name.push_str(&suffix);
    name
}

fn write_rows(worksheet: &mut Worksheet, table: &ReportTable) -> Result<()> {
    for (col_idx, header) in table.headers.iter().enumerate() {
        worksheet
            .write_string(0, col_idx as u16, header)
            .with_context(|| format!("write header ({col_idx})"))?;
    }
    for (row_idx, row) in table.rows.iter().chain(table.footer.iter()).enumerate() {
        let row_num = row_idx as u32 + 1;
        for (col_idx, cell) in row.iter().enumerate() {
            let col = col_idx as u16;
            let written = match cell {
                Cell::Int(v) => worksheet.write_number(row_num, col, *v as f64).map(|_| ()),
                Cell::Float(v) => worksheet.write_number(row_num, col, *v).map(|_| ()),
                Cell::Text(s) => worksheet.write_string(row_num, col, s).map(|_| ()),
                Cell::Blank => Ok(()),
            };
            written.with_context(|| format!("write cell ({row_num},{col_idx})"))?;
        }
    }
    Ok(())
}
