//! プレースホルダ走査
//!
//! マーカー文字で始まるテキストセルをプレースホルダとして列挙する。
//! 走査順はシート順 → 行 → 列で、同じテンプレートなら常に同じ順序になる。

use super::TemplateWorkbook;
use template_filler_common::{CellRef, Placeholder};

/// テキストがプレースホルダならラベルを返す
///
/// 先頭の空白とマーカー（連続していても可）を除き、前後の空白を除去する。
/// ラベルが空ならNone。
pub fn placeholder_label(text: &str, marker: char) -> Option<&str> {
    let rest = text.trim_start().strip_prefix(marker)?;
    let label = rest.trim_start_matches(marker).trim();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

/// ブック全体を走査してプレースホルダを列挙
pub fn scan_placeholders(workbook: &TemplateWorkbook, marker: char) -> Vec<Placeholder> {
    let mut placeholders = Vec::new();

    for sheet in workbook.sheets() {
        for (row, col, value) in sheet.cells() {
            let Some(text) = value.as_text() else {
                continue;
            };
            let cell = CellRef::new(sheet.name.as_str(), row, col);
            match placeholder_label(text, marker) {
                Some(label) => placeholders.push(Placeholder::new(cell, label)),
                None if text.trim_start().starts_with(marker) => {
                    log::debug!("{}: ラベルが空のプレースホルダを無視", cell);
                }
                None => {}
            }
        }
    }

    placeholders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::CellValue;

    #[test]
    fn test_placeholder_label() {
        assert_eq!(placeholder_label("◦ Nursing Hours", '◦'), Some("Nursing Hours"));
        assert_eq!(placeholder_label("  ◦◦Bed Days  ", '◦'), Some("Bed Days"));
        assert_eq!(placeholder_label("◦   ", '◦'), None);
        assert_eq!(placeholder_label("Nursing ◦ Hours", '◦'), None);
        assert_eq!(placeholder_label("# Rate", '#'), Some("Rate"));
    }

    #[test]
    fn test_scan_order_and_filtering() {
        let mut workbook = TemplateWorkbook::new();
        {
            let sheet = workbook.add_sheet("Summary");
            sheet.set(3, 0, CellValue::Text("◦ Bed Days".into()));
            sheet.set(1, 2, CellValue::Text("◦ Rate".into()));
            sheet.set(1, 0, CellValue::Text("◦ Nursing Hours".into()));
            sheet.set(0, 0, CellValue::Text("Heading".into()));
            sheet.set(2, 0, CellValue::Number(5.0));
            sheet.set(5, 0, CellValue::Text("◦".into()));
        }
        workbook
            .add_sheet("Detail")
            .set(0, 0, CellValue::Text("◦ Outbreak Costs".into()));

        let found = scan_placeholders(&workbook, '◦');
        let labels: Vec<&str> = found.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Nursing Hours", "Rate", "Bed Days", "Outbreak Costs"]);

        assert_eq!(found[0].cell, CellRef::new("Summary", 1, 0));
        assert_eq!(found[3].cell.to_string(), "Detail!A1");
        assert!(found.iter().all(|p| !p.is_resolved()));
    }

    #[test]
    fn test_scan_is_repeatable() {
        let mut workbook = TemplateWorkbook::new();
        let sheet = workbook.add_sheet("S");
        for i in 0..20 {
            sheet.set(i, (i % 3) as u16, CellValue::Text(format!("◦ Label {}", i)));
        }
        assert_eq!(scan_placeholders(&workbook, '◦'), scan_placeholders(&workbook, '◦'));
    }
}
