//! 共有型定義
//!
//! - FieldValue / FieldTable: 集計済みフィールド（名前 → 合計値）
//! - CellRef / Placeholder: テンプレート上のプレースホルダ
//! - MatchCandidate: プレースホルダ1件ごとの照合候補
//! - PlaceholderState: プレースホルダ1件の処理状態

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// 集計済みフィールド1件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: f64,
}

/// 集計結果のテーブル
///
/// 挿入順を保持する。この順序が照合候補の正規の列挙順になり、
/// 類似度が同点のときは先に挿入されたフィールドが選ばれる。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldValue>", into = "Vec<FieldValue>")]
pub struct FieldTable {
    entries: Vec<FieldValue>,
    index: HashMap<String, usize>,
}

impl FieldTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 値を加算する（未登録なら追加）
    pub fn add(&mut self, name: &str, value: f64) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].value += value,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push(FieldValue {
                    name: name.to_string(),
                    value,
                });
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.index.get(name).map(|&i| self.entries[i].value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// フィールド名（挿入順）
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Vec<FieldValue>> for FieldTable {
    fn from(values: Vec<FieldValue>) -> Self {
        let mut table = Self::new();
        for v in values {
            table.add(&v.name, v.value);
        }
        table
    }
}

impl From<FieldTable> for Vec<FieldValue> {
    fn from(table: FieldTable) -> Self {
        table.entries
    }
}

impl<'a> FromIterator<(&'a str, f64)> for FieldTable {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (name, value) in iter {
            table.add(name, value);
        }
        table
    }
}

/// セル位置（0始まりの行・列）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet: String,
    pub row: u32,
    pub col: u16,
}

impl CellRef {
    pub fn new(sheet: impl Into<String>, row: u32, col: u16) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    /// 同じ行で `cols` 列右のセル
    pub fn offset_cols(&self, cols: u16) -> Option<CellRef> {
        self.col.checked_add(cols).map(|col| CellRef {
            sheet: self.sheet.clone(),
            row: self.row,
            col,
        })
    }

    /// A1形式のアドレス（シート名なし）
    pub fn a1(&self) -> String {
        format!("{}{}", col_to_letters(self.col), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.a1())
    }
}

/// 列番号を列文字に変換（0 = A, 25 = Z, 26 = AA）
pub fn col_to_letters(col: u16) -> String {
    let mut n = col as u32 + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// テンプレート上のプレースホルダ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub cell: CellRef,
    /// マーカーと前後の空白を除いたラベル
    pub label: String,
    /// 書き込まれた値（未解決ならNone）
    #[serde(default)]
    pub resolved: Option<f64>,
}

impl Placeholder {
    pub fn new(cell: CellRef, label: impl Into<String>) -> Self {
        Self {
            cell,
            label: label.into(),
            resolved: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// 値を確定する。既に確定済みなら何もせずfalseを返す
    pub fn resolve(&mut self, value: f64) -> bool {
        if self.resolved.is_some() {
            return false;
        }
        self.resolved = Some(value);
        true
    }
}

/// 照合結果の出どころ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSource {
    Ai,
    Fallback,
}

impl fmt::Display for MatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchSource::Ai => write!(f, "ai"),
            MatchSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// 照合候補（プレースホルダ1件分、一時的）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub label: String,
    pub field: String,
    pub accepted: bool,
    pub source: MatchSource,
}

/// プレースホルダの処理状態
///
/// `Scanned → AiMatchAttempted → {AiAccepted | AiRejectedOrMissing → FallbackAttempted
/// → {FallbackAccepted | Unresolved}} → (採用時) Filled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaceholderState {
    Scanned,
    AiMatchAttempted,
    AiAccepted,
    AiRejectedOrMissing,
    FallbackAttempted,
    FallbackAccepted,
    Unresolved,
    Filled,
}

impl PlaceholderState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaceholderState::Filled | PlaceholderState::Unresolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_table_sums_duplicates() {
        let mut table = FieldTable::new();
        table.add("Nursing Hours", 100.0);
        table.add("Bed Days", 10.0);
        table.add("Nursing Hours", 50.5);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("Nursing Hours"), Some(150.5));
        assert_eq!(table.names(), vec!["Nursing Hours", "Bed Days"]);
    }

    #[test]
    fn test_field_table_missing() {
        let table: FieldTable = [("Bed Days", 4500.0)].into_iter().collect();
        assert!(table.contains("Bed Days"));
        assert_eq!(table.get("bed days"), None);
    }

    #[test]
    fn test_field_table_json_keeps_order() {
        let table: FieldTable = [("B", 2.0), ("A", 1.0)].into_iter().collect();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"[{"name":"B","value":2.0},{"name":"A","value":1.0}]"#);

        let back: FieldTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.names(), vec!["B", "A"]);
    }

    #[test]
    fn test_col_to_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(701), "ZZ");
        assert_eq!(col_to_letters(702), "AAA");
    }

    #[test]
    fn test_cell_ref_display_and_offset() {
        let cell = CellRef::new("Costs", 2, 1);
        assert_eq!(cell.to_string(), "Costs!B3");
        assert_eq!(cell.offset_cols(1).unwrap().a1(), "C3");
        assert!(CellRef::new("S", 0, u16::MAX).offset_cols(1).is_none());
    }

    #[test]
    fn test_terminal_states() {
        assert!(PlaceholderState::Filled.is_terminal());
        assert!(PlaceholderState::Unresolved.is_terminal());
        assert!(!PlaceholderState::FallbackAccepted.is_terminal());
        assert_eq!(
            serde_json::to_string(&PlaceholderState::AiRejectedOrMissing).unwrap(),
            "\"aiRejectedOrMissing\""
        );
    }

    #[test]
    fn test_placeholder_resolves_once() {
        let mut p = Placeholder::new(CellRef::new("Sheet1", 0, 0), "Nursing Hours");
        assert!(!p.is_resolved());
        assert!(p.resolve(1200.0));
        assert!(!p.resolve(99.0));
        assert_eq!(p.resolved, Some(1200.0));
    }
}
