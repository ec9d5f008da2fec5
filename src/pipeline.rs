//! 処理パイプライン
//!
//! 1. データソース集計
//! 2. テンプレート読み込み・プレースホルダ走査
//! 3. プレースホルダごとに 照合AI → 検証/フォールバック → 書き込み（走査順に1件ずつ）
//! 4. 別ファイルとして保存

use crate::error::{FillerError, Result};
use crate::filler::TemplateFiller;
use crate::matcher::{attempt_match, FieldMatcher};
use crate::sources::aggregate_sources;
use crate::template::{scan_placeholders, TemplateWorkbook};
use crate::validator::MatchValidator;
use serde::Serialize;
use std::path::{Path, PathBuf};
use template_filler_common::{
    FieldTable, MatchCandidate, MatchSource, Placeholder, PlaceholderState, RuleSet, SourceSchema,
};

/// パイプラインの設定
#[derive(Debug, Clone)]
pub struct FillOptions {
    pub marker: char,
    pub similarity_threshold: f64,
    pub value_column_offset: u16,
    pub decimals: u32,
    pub rules: RuleSet,
    pub source_schemas: Vec<SourceSchema>,
}

impl Default for FillOptions {
    fn default() -> Self {
        crate::config::Config::default().fill_options()
    }
}

/// 実行対象のファイル
#[derive(Debug, Clone)]
pub struct FillRequest {
    pub template: PathBuf,
    pub sources: Vec<PathBuf>,
    pub output: PathBuf,
}

/// プレースホルダ1件の処理結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderOutcome {
    pub placeholder: Placeholder,
    pub field: Option<String>,
    pub source: Option<MatchSource>,
    pub value: Option<f64>,
    pub trail: Vec<PlaceholderState>,
    pub rejected: Vec<MatchCandidate>,
    pub reason: Option<String>,
}

impl PlaceholderOutcome {
    pub fn is_filled(&self) -> bool {
        self.trail.last() == Some(&PlaceholderState::Filled)
    }
}

/// 実行結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub template: PathBuf,
    pub output: PathBuf,
    pub fields: FieldTable,
    pub outcomes: Vec<PlaceholderOutcome>,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn filled_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_filled()).count()
    }

    pub fn unresolved(&self) -> Vec<&PlaceholderOutcome> {
        self.outcomes.iter().filter(|o| !o.is_filled()).collect()
    }

    pub fn count_by_source(&self, source: MatchSource) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.is_filled() && o.source == Some(source))
            .count()
    }

    /// 照合率（書き込めた件数 / 全プレースホルダ、%）
    pub fn match_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        self.filled_count() as f64 / self.total() as f64 * 100.0
    }

    /// ラベル → フィールドの対応（書き込めたもの、走査順）
    pub fn mappings(&self) -> Vec<(&str, &str)> {
        self.outcomes
            .iter()
            .filter(|o| o.is_filled())
            .filter_map(|o| Some((o.placeholder.label.as_str(), o.field.as_deref()?)))
            .collect()
    }
}

/// 進捗通知
pub enum Progress<'a> {
    Aggregated(&'a FieldTable),
    Scanned(&'a [Placeholder]),
    Processed {
        index: usize,
        total: usize,
        outcome: &'a PlaceholderOutcome,
    },
    Saved(&'a Path),
}

/// パイプライン全体を実行する
pub async fn run<M: FieldMatcher>(
    request: &FillRequest,
    matcher: &M,
    options: &FillOptions,
    mut on_progress: impl FnMut(Progress<'_>),
) -> Result<RunReport> {
    if is_same_file(&request.template, &request.output) {
        return Err(FillerError::Write {
            path: request.output.display().to_string(),
            reason: "テンプレートと同じファイルには保存できません".into(),
        });
    }

    let fields = aggregate_sources(&request.sources, &options.source_schemas)?;
    if fields.is_empty() {
        log::warn!("集計できたフィールドがありません。すべて未解決になります");
    }
    on_progress(Progress::Aggregated(&fields));

    let mut workbook = TemplateWorkbook::load(&request.template)?;
    let placeholders = scan_placeholders(&workbook, options.marker);
    if placeholders.is_empty() {
        return Err(FillerError::NoPlaceholders {
            path: request.template.display().to_string(),
            marker: options.marker,
        });
    }
    on_progress(Progress::Scanned(&placeholders));

    let total = placeholders.len();
    let outcomes = fill_workbook(&mut workbook, placeholders, &fields, matcher, options, |index, outcome| {
        on_progress(Progress::Processed { index, total, outcome })
    })
    .await;

    workbook.save(&request.output)?;
    on_progress(Progress::Saved(&request.output));

    Ok(RunReport {
        template: request.template.clone(),
        output: request.output.clone(),
        fields,
        outcomes,
    })
}

/// 走査済みのプレースホルダを順に処理し、ブックに書き込む
///
/// プレースホルダ単位の失敗は結果に記録するだけで、処理は止めない。
pub async fn fill_workbook<M: FieldMatcher>(
    workbook: &mut TemplateWorkbook,
    placeholders: Vec<Placeholder>,
    fields: &FieldTable,
    matcher: &M,
    options: &FillOptions,
    mut on_outcome: impl FnMut(usize, &PlaceholderOutcome),
) -> Vec<PlaceholderOutcome> {
    let validator = MatchValidator::new(&options.rules, options.similarity_threshold);
    let mut filler = TemplateFiller::new(workbook, fields, options.value_column_offset, options.decimals)
        .with_placeholder_cells(&placeholders);
    let mut outcomes = Vec::with_capacity(placeholders.len());

    for (index, mut placeholder) in placeholders.into_iter().enumerate() {
        let mut trail = vec![PlaceholderState::Scanned, PlaceholderState::AiMatchAttempted];

        let ai = attempt_match(matcher, &placeholder.label, fields).await;
        let validation = validator.validate(&placeholder.label, &ai, fields);
        trail.extend(validation.trail);

        let mut reason = validation.reason;
        let mut filled = None;

        match validation.accepted {
            Some(candidate) => match filler.fill(&mut placeholder, &candidate.field) {
                Ok(value) => {
                    trail.push(PlaceholderState::Filled);
                    filled = Some((candidate, value));
                }
                Err(e) => {
                    log::warn!("{}: 書き込みできません: {}", placeholder.cell, e);
                    trail.push(PlaceholderState::Unresolved);
                    filler.leave_blank(&placeholder);
                    reason = Some(e.to_string());
                }
            },
            None => filler.leave_blank(&placeholder),
        }

        let outcome = PlaceholderOutcome {
            placeholder,
            field: filled.as_ref().map(|(c, _)| c.field.clone()),
            source: filled.as_ref().map(|(c, _)| c.source),
            value: filled.as_ref().map(|(_, v)| *v),
            trail,
            rejected: validation.rejected,
            reason,
        };
        on_outcome(index, &outcome);
        outcomes.push(outcome);
    }

    outcomes
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
