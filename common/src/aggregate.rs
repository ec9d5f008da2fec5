//! 表データの集計
//!
//! 読み込み済みの表（ヘッダ行 + データ行）をキー列でグループ化し、
//! 値列を合計してフィールドテーブルを作る。
//!
//! 集計方法の決定順:
//! 1. 設定済みスキーマ（キー列/値列）のうち、両方の列がヘッダにある最初のもの
//! 2. 該当なし → 数値列ごとの列合計（列名をフィールド名とする）

use crate::types::FieldTable;
use serde::{Deserialize, Serialize};

/// キー列と値列の組
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSchema {
    pub key: String,
    pub value: String,
}

impl SourceSchema {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// 既定スキーマ: Role/Cost_AUD → Field/Value
    pub fn defaults() -> Vec<Self> {
        vec![Self::new("Role", "Cost_AUD"), Self::new("Field", "Value")]
    }
}

/// 読み込み済みの表
#[derive(Debug, Clone, Default)]
pub struct SourceTable {
    /// 表示用の名前（ファイル名など）
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SourceTable {
    fn column(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == header)
    }
}

/// 数値セルをパースする
///
/// 前後の空白、桁区切りのカンマ、先頭の `$` を許容する。
pub fn parse_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let unsigned = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let cleaned: String = unsigned.chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// グループキーをフィールド名に正規化（前後空白除去・連続空白を1つに）
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 1つの表を集計する
pub fn aggregate_table(table: &SourceTable, schemas: &[SourceSchema]) -> FieldTable {
    let schema = schemas
        .iter()
        .find_map(|s| Some((s, table.column(&s.key)?, table.column(&s.value)?)));

    match schema {
        Some((schema, key_idx, value_idx)) => {
            log::debug!(
                "{}: スキーマ {}/{} で集計",
                table.name, schema.key, schema.value
            );
            group_sum(table, key_idx, value_idx)
        }
        None => {
            log::debug!("{}: 該当スキーマなし、数値列を列合計", table.name);
            column_totals(table)
        }
    }
}

fn group_sum(table: &SourceTable, key_idx: usize, value_idx: usize) -> FieldTable {
    let mut fields = FieldTable::new();
    let mut skipped = 0usize;

    for row in &table.rows {
        let key = row.get(key_idx).map(|k| normalize_key(k)).unwrap_or_default();
        let value = row.get(value_idx).and_then(|v| parse_number(v));

        match (key.is_empty(), value) {
            (false, Some(value)) => fields.add(&key, value),
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        log::warn!("{}: キーまたは数値のない{}行を除外", table.name, skipped);
    }

    fields
}

fn column_totals(table: &SourceTable) -> FieldTable {
    let mut fields = FieldTable::new();

    for (col_idx, header) in table.headers.iter().enumerate() {
        let name = normalize_key(header);
        if name.is_empty() {
            continue;
        }

        let cells: Vec<&str> = table
            .rows
            .iter()
            .filter_map(|row| row.get(col_idx))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();

        let numbers: Vec<f64> = cells.iter().filter_map(|c| parse_number(c)).collect();

        // 文字列が混ざる列は数値列とみなさない
        if numbers.is_empty() || numbers.len() != cells.len() {
            continue;
        }

        fields.add(&name, numbers.iter().sum());
    }

    fields
}

/// 複数の集計結果を合算する（同名フィールドは加算、初出順を保持）
pub fn merge_tables<'a>(tables: impl IntoIterator<Item = &'a FieldTable>) -> FieldTable {
    let mut merged = FieldTable::new();
    for table in tables {
        for field in table.iter() {
            merged.add(&field.name, field.value);
        }
    }
    merged
}
