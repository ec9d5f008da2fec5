//! テンプレートへの値の書き込み
//!
//! 採用されたフィールドの集計値を、プレースホルダの右隣（既定）のセルに書き込む。

use crate::template::{CellValue, TemplateWorkbook};
use std::collections::HashSet;
use template_filler_common::{CellRef, FieldTable, Placeholder};
use thiserror::Error;

/// 書き込みできなかった理由（実行は継続する）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FillError {
    #[error("集計結果にないフィールド: {0}")]
    UnknownField(String),

    #[error("既に値が書き込まれています: {0}")]
    AlreadyResolved(CellRef),

    #[error("書き込み先の列が範囲外です: {0}")]
    OutOfRange(CellRef),

    #[error("シートが見つかりません: {0}")]
    MissingSheet(String),

    #[error("書き込み先が別のプレースホルダです: {0}")]
    TargetIsPlaceholder(CellRef),
}

pub struct TemplateFiller<'a> {
    workbook: &'a mut TemplateWorkbook,
    fields: &'a FieldTable,
    column_offset: u16,
    decimals: u32,
    placeholder_cells: HashSet<CellRef>,
    filled: Vec<CellRef>,
    left_blank: Vec<CellRef>,
}

impl<'a> TemplateFiller<'a> {
    pub fn new(
        workbook: &'a mut TemplateWorkbook,
        fields: &'a FieldTable,
        column_offset: u16,
        decimals: u32,
    ) -> Self {
        Self {
            workbook,
            fields,
            column_offset,
            decimals,
            placeholder_cells: HashSet::new(),
            filled: Vec::new(),
            left_blank: Vec::new(),
        }
    }

    /// 走査済みプレースホルダのセル（書き込み先にしない）
    pub fn with_placeholder_cells<'p>(mut self, placeholders: impl IntoIterator<Item = &'p Placeholder>) -> Self {
        self.placeholder_cells = placeholders.into_iter().map(|p| p.cell.clone()).collect();
        self
    }

    /// フィールドの値を書き込み、プレースホルダを解決済みにする
    ///
    /// プレースホルダに記録する値は集計値そのもの。セルには小数桁を丸めた値を書く。
    pub fn fill(&mut self, placeholder: &mut Placeholder, field: &str) -> Result<f64, FillError> {
        if placeholder.is_resolved() {
            return Err(FillError::AlreadyResolved(placeholder.cell.clone()));
        }

        let value = self
            .fields
            .get(field)
            .ok_or_else(|| FillError::UnknownField(field.to_string()))?;

        let target = placeholder
            .cell
            .offset_cols(self.column_offset)
            .ok_or_else(|| FillError::OutOfRange(placeholder.cell.clone()))?;

        if self.placeholder_cells.contains(&target) {
            return Err(FillError::TargetIsPlaceholder(target));
        }

        if !self.workbook.set(&target, CellValue::Number(round_to(value, self.decimals))) {
            return Err(FillError::MissingSheet(target.sheet));
        }

        placeholder.resolve(value);
        self.filled.push(placeholder.cell.clone());
        log::debug!("{} ← {} ({})", target, value, field);
        Ok(value)
    }

    /// 未解決として記録する
    pub fn leave_blank(&mut self, placeholder: &Placeholder) {
        self.left_blank.push(placeholder.cell.clone());
    }

    pub fn filled(&self) -> &[CellRef] {
        &self.filled
    }

    pub fn left_blank(&self) -> &[CellRef] {
        &self.left_blank
    }
}

/// 小数 `decimals` 桁に丸める
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(15) as i32);
    (value * factor).round() / factor
}
