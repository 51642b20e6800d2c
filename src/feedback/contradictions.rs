//! Contradiction detector
//!
//! Scans a project's ledger for feedback that conflicts with itself, two
//! ways: a direct approve/reject flip on the same item, and thematic
//! opposition inferred from comment keywords (asking for shorter and longer,
//! lighter and darker, grounded and absurd). Pure function of the ledger;
//! nothing is persisted and results are recomputed on every call.
//!
//! Theme matching is deliberately literal substring matching over a fixed
//! trigger table. The table is the definition of what themes exist.

use std::collections::HashMap;

use crate::types::{Contradiction, ContradictionKind, FeedbackAction, FeedbackEntry};

/// Comments longer than this are truncated in contradiction descriptions
const COMMENT_DISPLAY_LEN: usize = 60;

/// One side of an opposing-theme axis
struct Theme {
    name: &'static str,
    /// Case-insensitive substring triggers
    triggers: &'static [&'static str],
}

/// An axis of opposing themes
struct Axis {
    a: Theme,
    b: Theme,
}

/// The fixed theme vocabulary: three axes, six themes.
/// Axis order here is the emission order.
const AXES: [Axis; 3] = [
    Axis {
        a: Theme {
            name: "shorter",
            triggers: &["too long", "shorter", "trim", "cut down", "tighten"],
        },
        b: Theme {
            name: "longer",
            triggers: &["too short", "longer", "expand", "more detail", "flesh out"],
        },
    },
    Axis {
        a: Theme {
            name: "lighter",
            triggers: &["too dark", "lighter", "more upbeat", "more fun", "less serious"],
        },
        b: Theme {
            name: "darker",
            triggers: &["too light", "darker", "more serious", "edgier", "less fluffy"],
        },
    },
    Axis {
        a: Theme {
            name: "grounded",
            triggers: &["too absurd", "grounded", "more realistic", "believable", "too weird"],
        },
        b: Theme {
            name: "absurd",
            triggers: &["too literal", "absurd", "weirder", "wilder", "more surreal"],
        },
    },
];

/// Detect all contradictions in a ledger.
///
/// Returns direct contradictions first (grouped by item, pairs in discovery
/// order), then thematic ones in fixed axis order. Deterministic for a given
/// ledger.
pub fn detect_contradictions(entries: &[FeedbackEntry]) -> Vec<Contradiction> {
    let mut found = detect_direct(entries);
    found.extend(detect_thematic(entries));
    found
}

/// Approve/reject flips on the same item.
///
/// Every ordered pair is examined, not just adjacent entries: approve,
/// comment, comment, reject is still a flip between positions 1 and 4.
fn detect_direct(entries: &[FeedbackEntry]) -> Vec<Contradiction> {
    let mut by_item: HashMap<&str, Vec<&FeedbackEntry>> = HashMap::new();
    let mut item_order: Vec<&str> = Vec::new();
    for entry in entries {
        let group = by_item.entry(entry.item_id.as_str()).or_default();
        if group.is_empty() {
            item_order.push(entry.item_id.as_str());
        }
        group.push(entry);
    }

    let mut found = Vec::new();
    for item_id in item_order {
        let group = &by_item[item_id];
        for i in 0..group.len() {
            for j in (i + 1)..group.len() {
                let (first, second) = (group[i], group[j]);
                if is_status_flip(first.action, second.action) {
                    found.push(Contradiction {
                        id: uuid::Uuid::new_v4().to_string(),
                        kind: ContradictionKind::Direct,
                        entry1: first.clone(),
                        entry2: second.clone(),
                        description: format!(
                            "'{}' was {} and later {}",
                            first.item_title, first.action, second.action
                        ),
                    });
                }
            }
        }
    }
    found
}

fn is_status_flip(a: FeedbackAction, b: FeedbackAction) -> bool {
    matches!(
        (a, b),
        (FeedbackAction::Approved, FeedbackAction::Rejected)
            | (FeedbackAction::Rejected, FeedbackAction::Approved)
    )
}

/// Opposing-theme conflicts across comments.
///
/// A theme tags an entry when any trigger appears as a substring of the
/// lower-cased comment. An axis only fires when both sides have evidence;
/// the most recent entry on each side is the one reported.
fn detect_thematic(entries: &[FeedbackEntry]) -> Vec<Contradiction> {
    let mut found = Vec::new();

    for axis in &AXES {
        let latest_a = latest_tagged(entries, &axis.a);
        let latest_b = latest_tagged(entries, &axis.b);

        if let (Some(a), Some(b)) = (latest_a, latest_b) {
            let comment_a = a.comment.as_deref().unwrap_or_default();
            let comment_b = b.comment.as_deref().unwrap_or_default();
            found.push(Contradiction {
                id: uuid::Uuid::new_v4().to_string(),
                kind: ContradictionKind::Thematic,
                entry1: a.clone(),
                entry2: b.clone(),
                description: format!(
                    "Feedback pulls both ways ({} vs {}): \"{}\" vs \"{}\"",
                    axis.a.name,
                    axis.b.name,
                    truncate(comment_a, COMMENT_DISPLAY_LEN),
                    truncate(comment_b, COMMENT_DISPLAY_LEN),
                ),
            });
        }
    }

    found
}

/// Last entry in ledger order whose comment matches the theme
fn latest_tagged<'a>(entries: &'a [FeedbackEntry], theme: &Theme) -> Option<&'a FeedbackEntry> {
    entries.iter().rev().find(|entry| {
        entry
            .comment
            .as_deref()
            .map(|comment| {
                let lower = comment.to_lowercase();
                theme.triggers.iter().any(|trigger| lower.contains(trigger))
            })
            .unwrap_or(false)
    })
}

/// Truncate a string to max length with ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
}
