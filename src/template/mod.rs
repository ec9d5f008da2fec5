//! Excelテンプレートの読み込み・保存
//!
//! calamineで全シートのセル（値と数式）を読み込み、メモリ上のモデルに保持する。
//! 保存時はrust_xlsxwriterで新しいブックとして書き出す。テンプレート自体は変更しない。

pub mod scanner;

pub use scanner::scan_placeholders;

use crate::error::{FillerError, Result};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::BTreeMap;
use std::path::Path;
use template_filler_common::CellRef;

/// セルの内容
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excelシリアル値
    DateTime(f64),
    /// 先頭の '=' なし
    Formula(String),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// シート1枚分のセル
///
/// キーは (行, 列)。BTreeMapなので走査順は上→下、左→右になる。
#[derive(Debug, Clone, Default)]
pub struct TemplateSheet {
    pub name: String,
    cells: BTreeMap<(u32, u16), CellValue>,
}

impl TemplateSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    pub fn set(&mut self, row: u32, col: u16, value: CellValue) {
        self.cells.insert((row, col), value);
    }

    /// 行優先順でセルを列挙
    pub fn cells(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.cells.iter().map(|(&(row, col), value)| (row, col, value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// テンプレートブック（シート順を保持）
#[derive(Debug, Clone, Default)]
pub struct TemplateWorkbook {
    sheets: Vec<TemplateSheet>,
}

impl TemplateWorkbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut TemplateSheet {
        self.sheets.push(TemplateSheet::new(name));
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn sheets(&self) -> &[TemplateSheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&TemplateSheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut TemplateSheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn get(&self, cell: &CellRef) -> Option<&CellValue> {
        self.sheet(&cell.sheet)?.get(cell.row, cell.col)
    }

    /// セルに書き込む。シートが存在しなければfalse
    pub fn set(&mut self, cell: &CellRef, value: CellValue) -> bool {
        match self.sheet_mut(&cell.sheet) {
            Some(sheet) => {
                sheet.set(cell.row, cell.col, value);
                true
            }
            None => false,
        }
    }

    /// テンプレートを読み込む（xlsx/xlsm/xls/ods）
    pub fn load(path: &Path) -> Result<Self> {
        let template_err = |reason: String| FillerError::TemplateLoad {
            path: path.display().to_string(),
            reason,
        };

        if !path.is_file() {
            return Err(template_err("ファイルが見つかりません".into()));
        }

        let mut source: Sheets<_> =
            open_workbook_auto(path).map_err(|e| template_err(e.to_string()))?;

        let sheet_names: Vec<String> = source.sheet_names().to_vec();
        if sheet_names.is_empty() {
            return Err(template_err("シートがありません".into()));
        }

        let mut workbook = TemplateWorkbook::new();

        for name in &sheet_names {
            let range = source
                .worksheet_range(name)
                .map_err(|e| template_err(format!("シート '{}': {}", name, e)))?;

            let sheet = workbook.add_sheet(name.clone());
            let (start_row, start_col) = range.start().unwrap_or((0, 0));

            for (r, c, data) in range.used_cells() {
                let Some((row, col)) = position(start_row, start_col, r, c) else {
                    continue;
                };
                if let Some(value) = convert_data(data) {
                    sheet.set(row, col, value);
                }
            }

            // 数式はキャッシュ値より優先
            match source.worksheet_formula(name) {
                Ok(formulas) => {
                    let (start_row, start_col) = formulas.start().unwrap_or((0, 0));
                    for (r, c, formula) in formulas.used_cells() {
                        if let Some((row, col)) = position(start_row, start_col, r, c) {
                            sheet.set(row, col, CellValue::Formula(formula.clone()));
                        }
                    }
                }
                Err(e) => log::warn!("シート '{}' の数式を読み込めません: {}", name, e),
            }
        }

        Ok(workbook)
    }

    /// 新しいファイルとして保存する
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |reason: String| FillerError::Write {
            path: path.display().to_string(),
            reason,
        };

        let mut output = Workbook::new();

        for sheet in &self.sheets {
            let worksheet = output.add_worksheet();
            worksheet
                .set_name(&sheet.name)
                .map_err(|e| write_err(format!("シート名 '{}': {}", sheet.name, e)))?;

            for (row, col, value) in sheet.cells() {
                let written = match value {
                    CellValue::Text(s) => worksheet.write_string(row, col, s),
                    CellValue::Number(n) => worksheet.write_number(row, col, *n),
                    CellValue::Bool(b) => worksheet.write_boolean(row, col, *b),
                    CellValue::DateTime(n) => {
                        let format = Format::new().set_num_format(date_num_format(*n));
                        worksheet.write_number_with_format(row, col, *n, &format)
                    }
                    CellValue::Formula(f) => worksheet.write_formula(row, col, f.as_str()),
                };
                written.map_err(|e| {
                    let cell = CellRef::new(sheet.name.as_str(), row, col);
                    write_err(format!("{}: {}", cell, e))
                })?;
            }
        }

        output.save(path).map_err(|e| write_err(e.to_string()))?;
        Ok(())
    }
}

fn position(start_row: u32, start_col: u32, r: usize, c: usize) -> Option<(u32, u16)> {
    let row = start_row.checked_add(u32::try_from(r).ok()?)?;
    let col = start_col.checked_add(u32::try_from(c).ok()?)?;
    Some((row, u16::try_from(col).ok()?))
}

fn convert_data(data: &Data) -> Option<CellValue> {
    match data {
        Data::Empty => None,
        Data::String(s) if s.is_empty() => None,
        Data::String(s) => Some(CellValue::Text(s.clone())),
        Data::Float(n) => Some(CellValue::Number(*n)),
        Data::Int(n) => Some(CellValue::Number(*n as f64)),
        Data::Bool(b) => Some(CellValue::Bool(*b)),
        Data::DateTime(dt) => Some(CellValue::DateTime(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(CellValue::Text(s.clone())),
        Data::Error(e) => Some(CellValue::Text(e.to_string())),
    }
}

/// シリアル値から表示形式を選ぶ（1未満は時刻/経過時間、端数ありは日時）
fn date_num_format(serial: f64) -> &'static str {
    if serial.abs() < 1.0 {
        "[h]:mm:ss"
    } else if serial.fract() != 0.0 {
        "yyyy-mm-dd hh:mm:ss"
    } else {
        "yyyy-mm-dd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_bounds() {
        assert_eq!(position(2, 1, 0, 0), Some((2, 1)));
        assert_eq!(position(0, 0, 3, 4), Some((3, 4)));
        assert_eq!(position(0, 70_000, 0, 0), None);
    }

    #[test]
    fn test_date_num_format_keeps_time_of_day() {
        assert_eq!(date_num_format(45292.0), "yyyy-mm-dd");
        assert_eq!(date_num_format(45292.75), "yyyy-mm-dd hh:mm:ss");
        assert_eq!(date_num_format(0.5), "[h]:mm:ss");
    }

    #[test]
    fn test_workbook_set_and_get() {
        let mut workbook = TemplateWorkbook::new();
        workbook.add_sheet("Costs");

        let cell = CellRef::new("Costs", 4, 2);
        assert!(workbook.set(&cell, CellValue::Number(12.5)));
        assert_eq!(workbook.get(&cell), Some(&CellValue::Number(12.5)));

        assert!(!workbook.set(&CellRef::new("Missing", 0, 0), CellValue::Bool(true)));
    }

    #[test]
    fn test_cells_in_row_major_order() {
        let mut sheet = TemplateSheet::new("S");
        sheet.set(1, 0, CellValue::Text("c".into()));
        sheet.set(0, 3, CellValue::Text("b".into()));
        sheet.set(0, 1, CellValue::Text("a".into()));

        let order: Vec<&str> = sheet.cells().filter_map(|(_, _, v)| v.as_text()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_load_missing_template() {
        let result = TemplateWorkbook::load(Path::new("/nonexistent/template.xlsx"));
        assert!(matches!(result, Err(FillerError::TemplateLoad { .. })));
    }
}
