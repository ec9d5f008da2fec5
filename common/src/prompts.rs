//! プロンプト生成モジュール
//!
//! - SYSTEM_PROMPT: 照合AIのシステムプロンプト
//! - NO_MATCH_SENTINEL: 該当なしを表す応答
//! - build_match_prompt: プレースホルダ1件分の照合プロンプト

use crate::types::FieldTable;

/// システムプロンプト
pub const SYSTEM_PROMPT: &str =
    "You are a smart assistant that maps data labels to their closest matches.";

/// 該当フィールドなしの応答
pub const NO_MATCH_SENTINEL: &str = "NONE";

/// 照合プロンプト生成
///
/// # Arguments
/// * `label` - プレースホルダのラベル（マーカー除去済み）
/// * `fields` - 候補フィールドと集計値
///
/// # Returns
/// ユーザーメッセージとして送るプロンプト文字列
pub fn build_match_prompt(label: &str, fields: &FieldTable) -> String {
    let summary = fields
        .iter()
        .map(|f| format!("{}: {}", f.name, f.value))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Given this placeholder from an Excel template: "{label}"

And this summary of available source data fields:

{summary}

Which field from the source data most likely corresponds to the placeholder?

Respond with just the exact field name, nothing else.
If no field is a reasonable match, respond with {NO_MATCH_SENTINEL}."#
    )
}
