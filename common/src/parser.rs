//! 照合AIレスポンスパーサー
//!
//! 応答テキストから候補フィールド名を1つ取り出す。
//!
//! 判定順:
//! 1. 装飾（コードブロック・引用符・末尾のピリオド）を除去
//! 2. `NONE` / `NO MATCH` → 該当なし
//! 3. 候補との完全一致
//! 4. 大文字小文字・空白の揺れを無視した一意な一致
//! 5. それ以外 → パースエラー

use crate::error::{Error, Result};
use crate::prompts::NO_MATCH_SENTINEL;

/// 応答を候補フィールド名に変換
///
/// # Returns
/// * `Ok(Some(name))` - 候補内のフィールド名（候補スライスの表記）
/// * `Ok(None)` - 該当なしの応答
/// * `Err` - 空応答、または候補にない名前
///
/// # Examples
/// ```
/// use template_filler_common::parse_match_response;
///
/// let candidates = ["Nursing Hours", "Bed Days"];
/// let field = parse_match_response("\"bed days\"", &candidates).unwrap();
/// assert_eq!(field, Some("Bed Days"));
/// ```
pub fn parse_match_response<'a>(response: &str, candidates: &[&'a str]) -> Result<Option<&'a str>> {
    let answer = clean_response(response);

    if answer.is_empty() {
        return Err(Error::Parse("空の応答".into()));
    }

    let folded = fold(&answer);
    if folded == fold(NO_MATCH_SENTINEL) || folded == "no match" || folded == "no suitable match" {
        return Ok(None);
    }

    if let Some(&exact) = candidates.iter().find(|c| **c == answer) {
        return Ok(Some(exact));
    }

    let loose: Vec<&'a str> = candidates
        .iter()
        .copied()
        .filter(|c| fold(c) == folded)
        .collect();

    match loose.as_slice() {
        [single] => Ok(Some(*single)),
        [] => Err(Error::Parse(format!("候補にないフィールド: {}", answer))),
        _ => Err(Error::Parse(format!("候補が一意に決まらない: {}", answer))),
    }
}

/// コードブロック・引用符・末尾ピリオドを除去し、最初の空でない行を返す
fn clean_response(response: &str) -> String {
    let line = response
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("```"))
        .unwrap_or("");

    let mut text = line.trim();
    loop {
        let before = text;
        text = text
            .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '*'))
            .trim_end_matches('.')
            .trim();
        if text == before {
            break;
        }
    }
    text.to_string()
}

/// 大文字小文字・空白の揺れを除去
fn fold(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDIDATES: &[&str] = &["Nursing Hours", "Bed Days", "Hourly Rate RN"];

    #[test]
    fn test_exact_match() {
        assert_eq!(parse_match_response("Nursing Hours", CANDIDATES).unwrap(), Some("Nursing Hours"));
    }

    #[test]
    fn test_decorated_response() {
        assert_eq!(parse_match_response("  \"Bed Days\".\n", CANDIDATES).unwrap(), Some("Bed Days"));
        assert_eq!(parse_match_response("```\nHourly Rate RN\n```", CANDIDATES).unwrap(), Some("Hourly Rate RN"));
        assert_eq!(parse_match_response("**nursing  hours**", CANDIDATES).unwrap(), Some("Nursing Hours"));
    }

    #[test]
    fn test_no_match_sentinel() {
        assert_eq!(parse_match_response("NONE", CANDIDATES).unwrap(), None);
        assert_eq!(parse_match_response("none.", CANDIDATES).unwrap(), None);
        assert_eq!(parse_match_response("No match", CANDIDATES).unwrap(), None);
    }

    #[test]
    fn test_unknown_field_is_error() {
        let err = parse_match_response("Patient Transport", CANDIDATES).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("Patient Transport"));
    }

    #[test]
    fn test_empty_response_is_error() {
        assert!(parse_match_response("   \n", CANDIDATES).is_err());
    }

    #[test]
    fn test_ambiguous_loose_match_is_error() {
        let candidates = ["Bed Days", "bed days"];
        assert!(parse_match_response("BED DAYS", &candidates).is_err());
        assert_eq!(parse_match_response("bed days", &candidates).unwrap(), Some("bed days"));
    }
}
