//! データソース（CSV）の読み込みと集計

use crate::error::{FillerError, Result};
use std::path::{Path, PathBuf};
use template_filler_common::{aggregate_table, merge_tables, FieldTable, SourceSchema, SourceTable};

/// CSVファイルを読み込む
///
/// 読めない行（不正なUTF-8など）は読み飛ばす。ファイル自体が開けない場合はエラー。
pub fn load_source(path: &Path) -> Result<SourceTable> {
    let source_err = |reason: String| FillerError::SourceLoad {
        path: path.display().to_string(),
        reason,
    };

    if !path.is_file() {
        return Err(source_err("ファイルが見つかりません".into()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| source_err(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| source_err(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        match record {
            Ok(record) => rows.push(record.iter().map(|c| c.to_string()).collect()),
            Err(e) => {
                skipped += 1;
                log::warn!("{}: 不正な行を読み飛ばし: {}", path.display(), e);
            }
        }
    }

    if skipped > 0 {
        log::warn!("{}: {}行を読み飛ばしました", path.display(), skipped);
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(SourceTable { name, headers, rows })
}

/// 全ソースを読み込み、フィールドテーブルに集計する
///
/// 1つでも読み込めないソースがあれば中断する（部分集計はしない）。
pub fn aggregate_sources(paths: &[PathBuf], schemas: &[SourceSchema]) -> Result<FieldTable> {
    let mut tables = Vec::with_capacity(paths.len());

    for path in paths {
        let table = load_source(path)?;
        let fields = aggregate_table(&table, schemas);
        if fields.is_empty() {
            log::warn!("{}: 集計できるフィールドがありません", path.display());
        }
        tables.push(fields);
    }

    Ok(merge_tables(&tables))
}
