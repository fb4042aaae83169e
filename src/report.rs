//! Plain-text totals report

use smeta_core::{DocumentStore, Result, TotalsSummary};
use smeta_engine::engine::{Row, SectionTotals, Subtotal, format_money};
use std::io::Write;

/// Write per-sheet, per-section totals followed by the document summary.
pub fn write_report(out: &mut impl Write, store: &DocumentStore) -> Result<()> {
    let document = store.document();
    for (idx, sheet) in document.sheets.iter().enumerate() {
        let totals = store.sheet_totals(idx)?;
        let name = sheet.name.as_deref().unwrap_or("Без названия");
        let marker = if idx == document.current_sheet { " *" } else { "" };
        writeln!(out, "Лист {}: {}{}", idx + 1, name, marker)?;

        for section in &totals.sections {
            writeln!(out, "  {}", section_title(section, &sheet.data))?;
            write_line(out, "    Работы", section.work)?;
            write_line(out, "    Материалы", section.material)?;
        }
        writeln!(out, "  Итого по листу: {}", format_money(totals.grand_total))?;
        writeln!(out)?;
    }
    write_summary(out, &store.totals())?;
    Ok(())
}

fn section_title(section: &SectionTotals, rows: &[Row]) -> String {
    match section.header {
        Some(header) if !rows[header].name.trim().is_empty() => rows[header].name.clone(),
        Some(header) => format!("Раздел (строка {})", header + 1),
        None => "Без раздела".to_string(),
    }
}

fn write_line(out: &mut impl Write, label: &str, amount: Subtotal) -> std::io::Result<()> {
    writeln!(
        out,
        "{:<14}{:>16}  (себестоимость {})",
        format!("{label}:"),
        format_money(amount.client),
        format_money(amount.cost)
    )
}

fn write_summary(out: &mut impl Write, totals: &TotalsSummary) -> std::io::Result<()> {
    writeln!(out, "Работы:     {:>16}", format_money(totals.client_work_total))?;
    writeln!(out, "Материалы:  {:>16}", format_money(totals.client_materials_total))?;
    writeln!(out, "ИТОГО:      {:>16}", format_money(totals.grand_total))?;
    Ok(())
}
