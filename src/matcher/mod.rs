//! フィールド照合
//!
//! ラベル1件と候補フィールド集合から、照合AIに最適なフィールドを1つ選ばせる。
//! 通信失敗・パース失敗・候補外の応答はいずれも「該当なし」に落とし、
//! 実行を止めない（後段のフォールバック照合に回す）。

mod http;

pub use http::{HttpMatcher, HttpMatcherSettings};

use crate::error::Result;
use std::future::Future;
use template_filler_common::FieldTable;

/// 照合AIの抽象
///
/// 実装は外部サービスへの1回の問い合わせを行い、
/// 候補のフィールド名か該当なし（`Ok(None)`）を返す。
pub trait FieldMatcher {
    fn match_field(&self, label: &str, fields: &FieldTable) -> impl Future<Output = Result<Option<String>>>;
}

/// 照合AIの結果
#[derive(Debug, Clone, PartialEq)]
pub enum AiOutcome {
    /// 候補内のフィールド名
    Matched(String),
    /// 該当なしの応答
    NoMatch,
    /// 通信失敗・パース失敗・候補外の応答
    Failed(String),
}

/// 照合AIに1回問い合わせ、結果を候補集合で検証する
pub async fn attempt_match<M: FieldMatcher>(matcher: &M, label: &str, fields: &FieldTable) -> AiOutcome {
    if fields.is_empty() {
        return AiOutcome::NoMatch;
    }

    match matcher.match_field(label, fields).await {
        Ok(Some(field)) if fields.contains(&field) => AiOutcome::Matched(field),
        Ok(Some(field)) => {
            log::warn!("'{}': 候補にないフィールド '{}' が返されました", label, field);
            AiOutcome::Failed(format!("候補にないフィールド: {}", field))
        }
        Ok(None) => AiOutcome::NoMatch,
        Err(e) => {
            log::warn!("'{}': 照合AIの呼び出しに失敗: {}", label, e);
            AiOutcome::Failed(e.to_string())
        }
    }
}
