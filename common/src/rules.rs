//! 妥当性ルール
//!
//! ラベルとフィールド名のカテゴリが明らかに食い違う照合を却下する。
//! ルールはキーワード集合の組で表し、設定ファイルから差し替えられる。
//!
//! 比較は小文字化して英数字以外を取り除いた文字列同士で行う
//! （"Bed Days" と "OccupiedBedDays" はどちらも "bedday" を含む）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// ルールの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// ラベルが該当する場合、フィールドはキーワードを含んではならない
    Forbid,
    /// ラベルが該当する場合、フィールドはキーワードのいずれかを含む必要がある
    Require,
}

/// 妥当性ルール1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlausibilityRule {
    pub name: String,
    pub label_keywords: Vec<String>,
    pub kind: RuleKind,
    pub field_keywords: Vec<String>,
}

impl PlausibilityRule {
    pub fn new(name: &str, label_keywords: &[&str], kind: RuleKind, field_keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            label_keywords: label_keywords.iter().map(|s| s.to_string()).collect(),
            kind,
            field_keywords: field_keywords.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// ラベルがこのルールの対象か
    pub fn applies_to(&self, label: &str) -> bool {
        mentions_any(&compact(label), &self.label_keywords)
    }

    /// ラベルとフィールドの組がこのルールを満たすか
    pub fn allows(&self, label: &str, field: &str) -> bool {
        if !self.applies_to(label) {
            return true;
        }
        let field_mentions = mentions_any(&compact(field), &self.field_keywords);
        match self.kind {
            RuleKind::Forbid => !field_mentions,
            RuleKind::Require => field_mentions,
        }
    }
}

impl fmt::Display for PlausibilityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.kind {
            RuleKind::Forbid => "must not mention",
            RuleKind::Require => "must mention",
        };
        write!(
            f,
            "{}: label [{}] → field {} [{}]",
            self.name,
            self.label_keywords.join(", "),
            verb,
            self.field_keywords.join(", ")
        )
    }
}

/// 妥当性ルールの表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<PlausibilityRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::defaults()
    }
}

impl RuleSet {
    pub fn new(rules: Vec<PlausibilityRule>) -> Self {
        Self { rules }
    }

    /// ルールなし（すべて許可）
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// 既定ルール（人員系ラベル・病床日数・単価）
    pub fn defaults() -> Self {
        const BED_DAY_FIELDS: &[&str] = &["bed day", "occupied bed days", "available bed days"];

        Self::new(vec![
            PlausibilityRule::new(
                "staffing-not-bed-days",
                &[
                    "nurs",
                    "care worker",
                    "care minutes",
                    "personal care",
                    "staff",
                    "management",
                    "allied health",
                ],
                RuleKind::Forbid,
                BED_DAY_FIELDS,
            ),
            PlausibilityRule::new("bed-days-need-bed-days", &["bed day"], RuleKind::Require, BED_DAY_FIELDS),
            PlausibilityRule::new("rate-needs-rate", &["rate"], RuleKind::Require, &["rate"]),
        ])
    }

    pub fn rules(&self) -> &[PlausibilityRule] {
        &self.rules
    }

    /// 最初に違反したルールを返す（違反なしならNone）
    pub fn violation(&self, label: &str, field: &str) -> Option<&PlausibilityRule> {
        self.rules.iter().find(|rule| !rule.allows(label, field))
    }

    pub fn is_plausible(&self, label: &str, field: &str) -> bool {
        self.violation(label, field).is_none()
    }
}

/// 小文字化して英数字のみ残す
fn compact(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn mentions_any(compacted: &str, keywords: &[String]) -> bool {
    keywords
        .iter()
        .map(|k| compact(k))
        .any(|k| !k.is_empty() && compacted.contains(&k))
}
