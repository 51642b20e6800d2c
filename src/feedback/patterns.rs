//! Pattern learner
//!
//! Full recompute of the derived preference summary from the ledger: what
//! got approved, what got rejected, and the rules distilled from revision
//! comments. No incremental diffing; ledgers are human-paced and small.

use crate::types::{FeedbackAction, FeedbackEntry, PatternEntry, PatternRule, PatternSummary};

/// Rebuild the whole pattern summary from the full ledger.
///
/// Pure function; the caller persists the result. Ledger order is preserved
/// in every projection.
pub fn recompute_patterns(entries: &[FeedbackEntry]) -> PatternSummary {
    let mut summary = PatternSummary::default();

    for entry in entries {
        match entry.action {
            FeedbackAction::Approved => summary.approved.push(project(entry)),
            FeedbackAction::Rejected => summary.rejected.push(project(entry)),
            FeedbackAction::Revision => {
                if let Some(comment) = entry.comment.as_deref() {
                    let rule = comment.trim();
                    if !rule.is_empty() {
                        summary.rules.push(PatternRule {
                            from: entry.item_title.clone(),
                            rule: rule.to_string(),
                            timestamp: entry.timestamp,
                        });
                    }
                }
            }
            FeedbackAction::Commented => {}
        }
    }

    summary
}

fn project(entry: &FeedbackEntry) -> PatternEntry {
    PatternEntry {
        title: entry.item_title.clone(),
        stage: entry.stage,
        comment: entry.comment.clone(),
        timestamp: entry.timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;
    use chrono::Utc;

    fn entry(action: FeedbackAction, title: &str, comment: Option<&str>) -> FeedbackEntry {
        FeedbackEntry {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: format!("id-{}", title),
            item_title: title.to_string(),
            stage: Stage::Concept,
            action,
            comment: comment.map(|s| s.to_string()),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_partitions_by_action_in_order() {
        let ledger = vec![
            entry(FeedbackAction::Approved, "A", None),
            entry(FeedbackAction::Rejected, "B", Some("too salesy")),
            entry(FeedbackAction::Approved, "C", Some("love it")),
            entry(FeedbackAction::Commented, "D", Some("hmm")),
        ];

        let summary = recompute_patterns(&ledger);
        assert_eq!(
            summary.approved.iter().map(|p| p.title.as_str()).collect::<Vec<_>>(),
            vec!["A", "C"]
        );
        assert_eq!(summary.rejected.len(), 1);
        assert_eq!(summary.rejected[0].comment.as_deref(), Some("too salesy"));
        assert!(summary.rules.is_empty());
    }

    #[test]
    fn test_rules_only_from_nonempty_revision_comments() {
        let ledger = vec![
            entry(FeedbackAction::Revision, "A", Some("  use active voice  ")),
            entry(FeedbackAction::Revision, "B", Some("   ")),
            entry(FeedbackAction::Revision, "C", None),
        ];

        let summary = recompute_patterns(&ledger);
        assert_eq!(summary.rules.len(), 1);
        assert_eq!(summary.rules[0].from, "A");
        assert_eq!(summary.rules[0].rule, "use active voice");
    }

    #[test]
    fn test_empty_ledger_yields_empty_summary() {
        assert_eq!(recompute_patterns(&[]), PatternSummary::default());
    }
}
