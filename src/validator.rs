//! 照合結果の検証とフォールバック
//!
//! 1. 照合AIの結果を妥当性ルールで検証
//! 2. 結果なし・却下 → 全候補との文字列類似度で最良のものを選ぶ
//! 3. 類似度が閾値以上、かつ妥当性ルールを満たせば採用。そうでなければ未解決

use crate::error::FillerError;
use crate::matcher::AiOutcome;
use template_filler_common::{
    best_match, FieldTable, MatchCandidate, MatchSource, PlaceholderState, RuleSet,
};

/// 検証結果
#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
    /// 採用された候補（未解決ならNone）
    pub accepted: Option<MatchCandidate>,
    /// 却下された候補
    pub rejected: Vec<MatchCandidate>,
    /// 通過した状態（AiMatchAttemptedの次から）
    pub trail: Vec<PlaceholderState>,
    /// 未解決・却下の理由
    pub reason: Option<String>,
}

pub struct MatchValidator<'a> {
    rules: &'a RuleSet,
    threshold: f64,
}

impl<'a> MatchValidator<'a> {
    pub fn new(rules: &'a RuleSet, threshold: f64) -> Self {
        Self { rules, threshold }
    }

    /// 照合AIの結果を検証し、必要ならフォールバック照合を行う
    pub fn validate(&self, label: &str, ai: &AiOutcome, fields: &FieldTable) -> Validation {
        let mut validation = Validation {
            accepted: None,
            rejected: Vec::new(),
            trail: Vec::new(),
            reason: None,
        };

        let ai_reason = match ai {
            AiOutcome::Matched(field) => match self.rules.violation(label, field) {
                None => {
                    validation.trail.push(PlaceholderState::AiAccepted);
                    validation.accepted = Some(candidate(label, field, true, MatchSource::Ai));
                    return validation;
                }
                Some(rule) => {
                    log::warn!("'{}' → '{}' を却下（ルール {}）", label, field, rule.name);
                    validation.rejected.push(candidate(label, field, false, MatchSource::Ai));
                    format!("AI照合 '{}' をルール {} で却下", field, rule.name)
                }
            },
            AiOutcome::NoMatch => "AI照合: 該当なし".to_string(),
            AiOutcome::Failed(e) => FillerError::MatcherUnavailable(e.clone()).to_string(),
        };

        validation.trail.push(PlaceholderState::AiRejectedOrMissing);
        validation.trail.push(PlaceholderState::FallbackAttempted);

        match self.fallback(label, fields) {
            Ok(field) => {
                validation.trail.push(PlaceholderState::FallbackAccepted);
                validation.accepted = Some(candidate(label, &field, true, MatchSource::Fallback));
            }
            Err((rejected, reason)) => {
                validation.trail.push(PlaceholderState::Unresolved);
                validation.rejected.extend(rejected);
                validation.reason = Some(format!(
                    "{}; {}",
                    ai_reason,
                    FillerError::NoAcceptableMatch(reason)
                ));
            }
        }

        validation
    }

    /// 文字列類似度によるフォールバック照合
    ///
    /// 最良候補（同点は先頭）を選び、閾値と妥当性ルールを満たすときだけ採用する。
    pub fn fallback(
        &self,
        label: &str,
        fields: &FieldTable,
    ) -> std::result::Result<String, (Option<MatchCandidate>, String)> {
        let names = fields.names();
        let Some(best) = best_match(label, &names) else {
            return Err((None, "候補フィールドがありません".into()));
        };

        if best.score < self.threshold {
            return Err((
                None,
                format!(
                    "最良候補 '{}' の類似度 {:.2} が閾値 {:.2} 未満",
                    best.field, best.score, self.threshold
                ),
            ));
        }

        if let Some(rule) = self.rules.violation(label, best.field) {
            return Err((
                Some(candidate(label, best.field, false, MatchSource::Fallback)),
                format!("フォールバック候補 '{}' をルール {} で却下", best.field, rule.name),
            ));
        }

        log::debug!("'{}' → '{}'（類似度 {:.2}）", label, best.field, best.score);
        Ok(best.field.to_string())
    }
}

fn candidate(label: &str, field: &str, accepted: bool, source: MatchSource) -> MatchCandidate {
    MatchCandidate {
        label: label.to_string(),
        field: field.to_string(),
        accepted,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaceholderState::*;

    fn fields() -> FieldTable {
        [("Nursing Hours", 1200.0), ("Bed Days", 4500.0)].into_iter().collect()
    }

    #[test]
    fn test_ai_match_accepted() {
        let rules = RuleSet::defaults();
        let v = MatchValidator::new(&rules, 0.4);
        let result = v.validate("Nursing Hours", &AiOutcome::Matched("Nursing Hours".into()), &fields());

        let accepted = result.accepted.unwrap();
        assert_eq!(accepted.field, "Nursing Hours");
        assert_eq!(accepted.source, MatchSource::Ai);
        assert_eq!(result.trail, vec![AiAccepted]);
        assert!(result.rejected.is_empty());
    }

    #[test]
    fn test_implausible_ai_match_falls_back() {
        let rules = RuleSet::defaults();
        let v = MatchValidator::new(&rules, 0.4);
        let result = v.validate("Nursing Hours", &AiOutcome::Matched("Bed Days".into()), &fields());

        let accepted = result.accepted.unwrap();
        assert_eq!(accepted.field, "Nursing Hours");
        assert_eq!(accepted.source, MatchSource::Fallback);
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].field, "Bed Days");
        assert!(!result.rejected[0].accepted);
        assert_eq!(result.trail, vec![AiRejectedOrMissing, FallbackAttempted, FallbackAccepted]);
    }

    #[test]
    fn test_no_match_below_threshold_is_unresolved() {
        let rules = RuleSet::defaults();
        let v = MatchValidator::new(&rules, 0.4);
        let result = v.validate("Patient Transport", &AiOutcome::NoMatch, &fields());

        assert!(result.accepted.is_none());
        assert_eq!(result.trail, vec![AiRejectedOrMissing, FallbackAttempted, Unresolved]);
        let reason = result.reason.unwrap();
        assert!(reason.contains("該当なし"));
        assert!(reason.contains("閾値"));
    }

    #[test]
    fn test_matcher_failure_uses_fallback() {
        let rules = RuleSet::defaults();
        let v = MatchValidator::new(&rules, 0.4);
        let result = v.validate("Total Bed Days", &AiOutcome::Failed("timeout".into()), &fields());

        assert_eq!(result.accepted.unwrap().field, "Bed Days");
    }

    #[test]
    fn test_implausible_fallback_is_rejected() {
        let rules = RuleSet::defaults();
        let v = MatchValidator::new(&rules, 0.4);
        let fields: FieldTable = [("Nursing Bed Days", 10.0)].into_iter().collect();

        let result = v.validate("Nursing Days", &AiOutcome::NoMatch, &fields);
        assert!(result.accepted.is_none());
        assert_eq!(result.rejected.len(), 1);
        assert_eq!(result.rejected[0].source, MatchSource::Fallback);
        assert!(result.reason.unwrap().contains("staffing-not-bed-days"));
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let rules = RuleSet::empty();
        let v = MatchValidator::new(&rules, 0.0);
        let fields: FieldTable = [("abcx", 1.0), ("abcy", 2.0)].into_iter().collect();

        for _ in 0..5 {
            assert_eq!(v.fallback("abcd", &fields).unwrap(), "abcx");
        }
    }

    #[test]
    fn test_fallback_empty_fields() {
        let rules = RuleSet::defaults();
        let v = MatchValidator::new(&rules, 0.4);
        let (rejected, reason) = v.fallback("Bed Days", &FieldTable::new()).unwrap_err();
        assert!(rejected.is_none());
        assert!(reason.contains("候補"));
    }
}
