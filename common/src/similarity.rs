//! 文字列類似度
//!
//! 照合AIが使えない・却下された場合のフォールバック照合で使う。
//! 編集距離ベースで、同じ入力なら常に同じ結果を返す。

/// 最良候補
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch<'a> {
    /// 候補スライス内の位置
    pub index: usize,
    pub field: &'a str,
    pub score: f64,
}

/// 比較用に正規化（小文字化・連続空白を1つに）
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 類似度を計算（0.0〜1.0、大文字小文字と空白の揺れは無視）
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let distance = levenshtein_distance(&a, &b);
    let max_len = a.chars().count().max(b.chars().count());

    1.0 - (distance as f64 / max_len as f64)
}

/// 最も類似度の高い候補を返す
///
/// 同点の場合は候補の並び順で先にあるものを選ぶ。
pub fn best_match<'a>(label: &str, candidates: &[&'a str]) -> Option<SimilarityMatch<'a>> {
    let mut best: Option<SimilarityMatch<'a>> = None;

    for (index, &field) in candidates.iter().enumerate() {
        let score = similarity(label, field);
        let better = match &best {
            Some(current) => score > current.score,
            None => true,
        };
        if better {
            best = Some(SimilarityMatch { index, field, score });
        }
    }

    best
}

/// レーベンシュタイン距離を計算
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // 1行分だけ保持する
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("abc", ""), 3);
        assert_eq!(levenshtein_distance("abc", "abc"), 0);
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
    }

    #[test]
    fn test_similarity_ignores_case_and_spacing() {
        assert!((similarity("Nursing Hours", "nursing  hours") - 1.0).abs() < 1e-9);
        assert!(similarity("Nursing Hrs", "Nursing Hours") > 0.8);
        assert!(similarity("Patient Transport", "Nursing Hours") < 0.4);
        assert_eq!(similarity("", "Bed Days"), 0.0);
    }

    #[test]
    fn test_best_match_picks_highest() {
        let candidates = ["Nursing Hours", "Bed Days", "Agency Nursing Costs"];
        let m = best_match("Total Bed Days", &candidates).unwrap();
        assert_eq!(m.field, "Bed Days");
        assert_eq!(m.index, 1);
        assert!(m.score > 0.5);
    }

    #[test]
    fn test_best_match_tie_takes_first() {
        let candidates = ["abcx", "abcy", "abcz"];
        let m = best_match("abcd", &candidates).unwrap();
        assert_eq!(m.field, "abcx");
        assert_eq!(m.index, 0);
    }

    #[test]
    fn test_best_match_is_deterministic() {
        let candidates = ["Registered Nurse", "Agency Nursing Costs", "Hourly Rate RN"];
        let first = best_match("Agency Nurse", &candidates);
        for _ in 0..10 {
            assert_eq!(best_match("Agency Nurse", &candidates), first);
        }
    }

    #[test]
    fn test_best_match_empty() {
        assert!(best_match("anything", &[]).is_none());
    }
}
