//! Cross-profile agreement.
//!
//! Concerns are grouped by the element they target and a normalized
//! recommendation key. Groups backed by enough distinct profiles become
//! universal improvements.

use std::collections::BTreeSet;

use crate::domain::{Directive, ScaffoldingDirective, VocabularyDirective, VocabularyEntry};

use super::proposal::Candidate;

/// Lowercase, whitespace-collapsed `change`, cut to `prefix_len` chars.
pub fn recommendation_key(change: &str, prefix_len: usize) -> String {
    change
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .chars()
        .take(prefix_len)
        .collect()
}

/// Concerns sharing one (element, recommendation key).
#[derive(Debug, Clone)]
pub(crate) struct AgreementGroup {
    /// Indices into the candidate list, in report order.
    pub members: Vec<usize>,
    /// Distinct contributing profiles, in report order.
    pub profiles: Vec<String>,
}

/// Group candidates, preserving first-seen order of groups and members.
pub(crate) fn group_candidates(
    candidates: &[Candidate<'_>],
    prefix_len: usize,
) -> Vec<AgreementGroup> {
    let mut keys: Vec<(String, String)> = Vec::new();
    let mut groups: Vec<AgreementGroup> = Vec::new();

    for (idx, c) in candidates.iter().enumerate() {
        let key = (
            c.concern.element.clone(),
            recommendation_key(&c.concern.recommendation.change, prefix_len),
        );
        let pos = match keys.iter().position(|k| *k == key) {
            Some(pos) => pos,
            None => {
                keys.push(key);
                groups.push(AgreementGroup {
                    members: Vec::new(),
                    profiles: Vec::new(),
                });
                groups.len() - 1
            }
        };
        let group = &mut groups[pos];
        group.members.push(idx);
        if !group.profiles.iter().any(|p| p == c.profile_id) {
            group.profiles.push(c.profile_id.to_string());
        }
    }
    groups
}

/// Combine the directives of agreeing concerns into one.
///
/// Vocabulary directives union their terms and scaffolding directives on the
/// same activity and tier union their entries. Anything else keeps the
/// first directive.
pub fn merge_directives(directives: &[&Directive]) -> Option<Directive> {
    let first = *directives.first()?;
    let merged = match first {
        Directive::Vocabulary(_) => {
            let mut seen = BTreeSet::new();
            let entries: Vec<VocabularyEntry> = directives
                .iter()
                .filter_map(|d| match d {
                    Directive::Vocabulary(v) => Some(v.entries.iter()),
                    _ => None,
                })
                .flatten()
                .filter(|e| seen.insert(e.term.trim().to_lowercase()))
                .cloned()
                .collect();
            Directive::Vocabulary(VocabularyDirective { entries })
        }
        Directive::Scaffolding(base) => {
            let mut entries: Vec<String> = Vec::new();
            for d in directives {
                if let Directive::Scaffolding(s) = d {
                    if s.activity_id == base.activity_id && s.tier == base.tier {
                        for e in &s.entries {
                            if !entries.contains(e) {
                                entries.push(e.clone());
                            }
                        }
                    }
                }
            }
            Directive::Scaffolding(ScaffoldingDirective {
                entries,
                ..base.clone()
            })
        }
        other => other.clone(),
    };
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SupportTier;

    #[test]
    fn test_key_normalizes_case_whitespace_and_length() {
        assert_eq!(
            recommendation_key("  Add   Definitions\tfor terms ", 48),
            "add definitions for terms"
        );
        assert_eq!(recommendation_key("Add definitions for terms", 3), "add");
    }

    #[test]
    fn test_merge_vocabulary_unions_terms() {
        let a = Directive::Vocabulary(VocabularyDirective {
            entries: vec![VocabularyEntry {
                term: "osmosis".into(),
                definition: None,
            }],
        });
        let b = Directive::Vocabulary(VocabularyDirective {
            entries: vec![
                VocabularyEntry {
                    term: "Osmosis".into(),
                    definition: None,
                },
                VocabularyEntry {
                    term: "diffusion".into(),
                    definition: None,
                },
            ],
        });
        match merge_directives(&[&a, &b]) {
            Some(Directive::Vocabulary(v)) => {
                let terms: Vec<&str> = v.entries.iter().map(|e| e.term.as_str()).collect();
                assert_eq!(terms, vec!["osmosis", "diffusion"]);
            }
            other => panic!("unexpected merge {other:?}"),
        }
    }

    #[test]
    fn test_merge_scaffolding_only_same_target() {
        let s = |activity: &str, tier, entry: &str| {
            Directive::Scaffolding(ScaffoldingDirective {
                activity_id: activity.into(),
                tier,
                entries: vec![entry.into()],
            })
        };
        let a = s("a1", SupportTier::Support, "frame");
        let b = s("a1", SupportTier::Support, "word bank");
        let c = s("a1", SupportTier::Extension, "stretch");
        match merge_directives(&[&a, &b, &c]) {
            Some(Directive::Scaffolding(m)) => {
                assert_eq!(m.entries, vec!["frame", "word bank"]);
                assert_eq!(m.tier, SupportTier::Support);
            }
            other => panic!("unexpected merge {other:?}"),
        }
        assert!(merge_directives(&[]).is_none());
    }
}
