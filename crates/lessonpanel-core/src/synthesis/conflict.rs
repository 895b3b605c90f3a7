//! Conflicting recommendations.
//!
//! Each recommendation's change text is reduced to a [`Stance`]: which
//! teaching trait it moves and in which direction. Two concerns from
//! different profiles on the same element conflict when their stances
//! oppose. The reduction is a keyword heuristic and is surfaced as such in
//! every teacher note. Quoted activity titles and vocabulary term lists are
//! lesson content, not advice, and never contribute to a stance.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::{Concern, DirectiveElement, SupportTier};

use super::proposal::{Candidate, Conflict, OpposingConcern, ResolutionChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Scaffolding,
    Complexity,
    Pacing,
    Depth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Increase,
    Decrease,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stance {
    #[serde(rename = "trait")]
    pub trait_: Trait,
    pub polarity: Polarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// Keep both as tiers: support for some learners, extension for others.
    TieredSupport,
    /// Shared accessible core with an optional depth extension.
    CorePlusExtension,
    /// Offer both paths and let students pick.
    StudentChoice,
    /// No safe automatic resolution.
    RequiresTeacherDecision,
}

impl std::fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TieredSupport => "tiered_support",
            Self::CorePlusExtension => "core_plus_extension",
            Self::StudentChoice => "student_choice",
            Self::RequiresTeacherDecision => "requires_teacher_decision",
        };
        write!(f, "{s}")
    }
}

const TRAIT_KEYWORDS: [(Trait, &[&str]); 4] = [
    (Trait::Scaffolding, &["scaffold", "support"]),
    (Trait::Complexity, &["complex", "challenge", "rigor"]),
    (Trait::Pacing, &["pacing", "pace"]),
    (Trait::Depth, &["depth", "deeper", "deepen"]),
];

const INCREASE: [&str; 10] = [
    "add", "adding", "increase", "more", "expand", "extend", "deepen", "raise", "provide",
    "include",
];
const DECREASE: [&str; 10] = [
    "remove", "removing", "reduce", "decrease", "fewer", "simplify", "less", "lower", "shorten",
    "fade",
];

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// The trait and direction a change text asks for, if recognisable.
///
/// The first trait keyword (prefix match) and the first polarity keyword
/// (whole word) in reading order win.
pub fn classify_change(text: &str) -> Option<Stance> {
    let tokens = tokens(text);
    let trait_ = tokens.iter().find_map(|tok| {
        TRAIT_KEYWORDS
            .iter()
            .find(|(_, kws)| kws.iter().any(|kw| tok.starts_with(kw)))
            .map(|(t, _)| *t)
    })?;
    let polarity = tokens.iter().find_map(|tok| {
        if INCREASE.contains(&tok.as_str()) {
            Some(Polarity::Increase)
        } else if DECREASE.contains(&tok.as_str()) {
            Some(Polarity::Decrease)
        } else {
            None
        }
    })?;
    Some(Stance { trait_, polarity })
}

fn quoted_span() -> Option<&'static Regex> {
    static QUOTED: OnceLock<Option<Regex>> = OnceLock::new();
    QUOTED
        .get_or_init(|| Regex::new(r"(?:^|\s)'[^']*'").ok())
        .as_ref()
}

/// The stance of a concern's recommendation.
///
/// Vocabulary directives only add definitions, so they never take a stance.
/// Quoted spans (rendered activity titles) are dropped before classifying.
pub fn concern_stance(concern: &Concern) -> Option<Stance> {
    let recommendation = &concern.recommendation;
    if recommendation.implementation.element() == DirectiveElement::Vocabulary {
        return None;
    }
    match quoted_span() {
        Some(re) => classify_change(&re.replace_all(&recommendation.change, " ")),
        None => classify_change(&recommendation.change),
    }
}

/// Whether two stances pull the same element in incompatible directions.
pub fn opposes(a: Stance, b: Stance) -> bool {
    use Polarity::*;
    use Trait::*;

    if a.trait_ == b.trait_ {
        return a.polarity != b.polarity;
    }
    let pair = |x: Stance, y: Stance| {
        matches!(
            (x.trait_, x.polarity, y.trait_, y.polarity),
            // support vs challenge
            (Scaffolding, Increase, Complexity, Increase)
            // depth vs accessibility
            | (Depth, Increase, Complexity, Decrease)
        )
    };
    pair(a, b) || pair(b, a)
}

/// Which side of a conflict pushes toward harder work.
fn is_challenge_side(s: Stance) -> bool {
    matches!(
        (s.trait_, s.polarity),
        (Trait::Complexity, Polarity::Increase)
            | (Trait::Scaffolding, Polarity::Decrease)
            | (Trait::Depth, Polarity::Increase)
    )
}

pub fn strategy_for(a: Stance, b: Stance, both_auto_applicable: bool) -> ResolutionStrategy {
    let support_pair =
        |t: Trait| matches!(t, Trait::Scaffolding | Trait::Complexity);
    let depth_pair = |x: Trait, y: Trait| {
        x == Trait::Depth && matches!(y, Trait::Depth | Trait::Complexity)
    };

    if support_pair(a.trait_) && support_pair(b.trait_) {
        ResolutionStrategy::TieredSupport
    } else if depth_pair(a.trait_, b.trait_) || depth_pair(b.trait_, a.trait_) {
        ResolutionStrategy::CorePlusExtension
    } else if both_auto_applicable {
        ResolutionStrategy::StudentChoice
    } else {
        ResolutionStrategy::RequiresTeacherDecision
    }
}

/// Tier each side's directive is moved to under `strategy`; `None` keeps
/// the directive as proposed.
fn tier_for(strategy: ResolutionStrategy, stance: Stance) -> Option<SupportTier> {
    let challenge = is_challenge_side(stance);
    match strategy {
        ResolutionStrategy::TieredSupport => Some(if challenge {
            SupportTier::Extension
        } else {
            SupportTier::Support
        }),
        ResolutionStrategy::CorePlusExtension => Some(if challenge {
            SupportTier::Extension
        } else {
            SupportTier::Core
        }),
        ResolutionStrategy::StudentChoice => Some(SupportTier::Choice),
        ResolutionStrategy::RequiresTeacherDecision => None,
    }
}

fn teacher_note(
    strategy: ResolutionStrategy,
    a: &OpposingConcern,
    b: &OpposingConcern,
) -> String {
    let summary = format!(
        "{} recommends \"{}\" while {} recommends \"{}\".",
        a.profile_id, a.concern.recommendation.change, b.profile_id, b.concern.recommendation.change
    );
    let plan = match strategy {
        ResolutionStrategy::TieredSupport => {
            "Both are kept as tiers: the support entry for learners who need it, the extension entry for learners ready for more."
        }
        ResolutionStrategy::CorePlusExtension => {
            "Both are kept: the accessible version becomes the shared core and the deeper version an optional extension."
        }
        ResolutionStrategy::StudentChoice => {
            "Both are offered as choices so students pick the path that suits them."
        }
        ResolutionStrategy::RequiresTeacherDecision => {
            "No automatic resolution is safe here; approve the side you want to keep."
        }
    };
    format!(
        "{summary} {plan} Opposition was inferred from keywords in the recommendation text and may be approximate."
    )
}

/// Pair opposing candidates greedily in candidate order.
///
/// `eligible` marks candidates still available (not already universal).
/// Each candidate takes part in at most one conflict. Returned pairs are
/// `(i, j)` with `i < j`; the caller marks both as consumed.
pub(crate) fn find_conflicts(
    candidates: &[Candidate<'_>],
    eligible: &[bool],
) -> Vec<(usize, usize, Stance, Stance)> {
    let stances: Vec<Option<Stance>> = candidates
        .iter()
        .map(|c| concern_stance(c.concern))
        .collect();
    let mut used = vec![false; candidates.len()];
    let mut pairs = Vec::new();

    for i in 0..candidates.len() {
        let Some(si) = stances[i] else { continue };
        if used[i] || !eligible[i] {
            continue;
        }
        for j in (i + 1)..candidates.len() {
            let Some(sj) = stances[j] else { continue };
            if used[j] || !eligible[j] {
                continue;
            }
            let (a, b) = (&candidates[i], &candidates[j]);
            if a.concern.element == b.concern.element
                && a.profile_id != b.profile_id
                && opposes(si, sj)
            {
                used[i] = true;
                used[j] = true;
                pairs.push((i, j, si, sj));
                break;
            }
        }
    }
    pairs
}

/// Build one [`Conflict`] with its resolution directives.
pub(crate) fn build_conflict(
    change_id: String,
    a: (&Candidate<'_>, Stance),
    b: (&Candidate<'_>, Stance),
) -> Conflict {
    let side = |c: &Candidate<'_>, stance: Stance| OpposingConcern {
        profile_id: c.profile_id.to_string(),
        priority_tag: c.priority_tag.to_string(),
        stance,
        concern: c.concern.clone(),
    };
    let (sa, sb) = (side(a.0, a.1), side(b.0, b.1));
    let both_auto = sa.concern.recommendation.implementation.is_auto_applicable()
        && sb.concern.recommendation.implementation.is_auto_applicable();
    let strategy = strategy_for(a.1, b.1, both_auto);

    let resolution: Vec<ResolutionChange> = [&sa, &sb]
        .into_iter()
        .enumerate()
        .map(|(n, s)| {
            let tier = tier_for(strategy, s.stance);
            let directive = &s.concern.recommendation.implementation;
            ResolutionChange {
                change_id: format!("{change_id}.{}", n + 1),
                profile_id: s.profile_id.clone(),
                tier,
                directive: match tier {
                    Some(tier) => directive.retiered(tier),
                    None => directive.clone(),
                },
            }
        })
        .collect();

    Conflict {
        change_id,
        element: sa.concern.element.clone(),
        teacher_note: teacher_note(strategy, &sa, &sb),
        resolution_strategy: strategy,
        opposing_concerns: [sa, sb],
        resolution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Criterion, Directive, Evidence, Recommendation, Severity, VocabularyDirective,
        VocabularyEntry,
    };

    fn stance(t: Trait, p: Polarity) -> Stance {
        Stance {
            trait_: t,
            polarity: p,
        }
    }

    #[test]
    fn test_classify_change() {
        assert_eq!(
            classify_change("Add scaffolding support to 'Lab'"),
            Some(stance(Trait::Scaffolding, Polarity::Increase))
        );
        assert_eq!(
            classify_change("Increase complexity in 'Lab' with an extension task"),
            Some(stance(Trait::Complexity, Polarity::Increase))
        );
        assert_eq!(
            classify_change("Reduce complexity by adding scaffolding"),
            Some(stance(Trait::Complexity, Polarity::Decrease))
        );
        assert_eq!(
            classify_change("Deepen 'Lab' beyond recall"),
            Some(stance(Trait::Depth, Polarity::Increase))
        );
        assert_eq!(classify_change("Define chlorophyll"), None);
        assert_eq!(classify_change("Scaffolding is nice"), None);
    }

    fn concern(change: &str, directive: Directive) -> Concern {
        Concern {
            criterion: Criterion::ScaffoldingSupport,
            severity: Severity::Medium,
            element: "activity:lab".into(),
            issue: "issue".into(),
            evidence: Evidence {
                field_path: "/activities/0".into(),
                observed: serde_json::json!(0),
            },
            recommendation: Recommendation {
                change: change.into(),
                rationale: "rationale".into(),
                implementation: directive,
            },
        }
    }

    #[test]
    fn test_concern_stance_ignores_rendered_content() {
        let vocab = Directive::Vocabulary(VocabularyDirective {
            entries: vec![VocabularyEntry {
                term: "support".into(),
                definition: None,
            }],
        });
        let generic = |s: &str| Directive::Generic { summary: s.into() };

        assert_eq!(
            concern_stance(&concern("Add definitions for support, scaffold", vocab)),
            None
        );
        assert_eq!(
            concern_stance(&concern(
                "Add a movement break to 'Support stations'",
                generic("break")
            )),
            None
        );
        assert_eq!(
            concern_stance(&concern(
                "Remove scaffolding from 'Lab' so students work alone",
                generic("fade")
            )),
            Some(stance(Trait::Scaffolding, Polarity::Decrease))
        );
    }

    #[test]
    fn test_opposition_rules() {
        use Polarity::*;
        use Trait::*;
        let support = stance(Scaffolding, Increase);
        let fade = stance(Scaffolding, Decrease);
        let harder = stance(Complexity, Increase);
        assert!(opposes(support, fade));
        assert!(opposes(support, harder));
        assert!(opposes(harder, support));
        assert!(opposes(stance(Depth, Increase), stance(Complexity, Decrease)));
        assert!(!opposes(support, support));
        assert!(!opposes(stance(Pacing, Increase), stance(Depth, Increase)));
    }

    #[test]
    fn test_strategy_mapping() {
        use Polarity::*;
        use ResolutionStrategy::*;
        use Trait::*;
        let (support, fade) = (stance(Scaffolding, Increase), stance(Scaffolding, Decrease));
        let (simpler, deeper) = (stance(Complexity, Decrease), stance(Depth, Increase));
        let (faster, slower) = (stance(Pacing, Increase), stance(Pacing, Decrease));
        assert_eq!(strategy_for(support, fade, true), TieredSupport);
        assert_eq!(strategy_for(simpler, deeper, true), CorePlusExtension);
        assert_eq!(strategy_for(faster, slower, true), StudentChoice);
        assert_eq!(strategy_for(faster, slower, false), RequiresTeacherDecision);
    }

    #[test]
    fn test_tiers_keep_both_sides() {
        use Polarity::*;
        use ResolutionStrategy::*;
        use SupportTier::*;
        use Trait::*;
        let (support, fade) = (stance(Scaffolding, Increase), stance(Scaffolding, Decrease));
        let (simpler, deeper) = (stance(Complexity, Decrease), stance(Depth, Increase));
        assert_eq!(tier_for(TieredSupport, support), Some(Support));
        assert_eq!(tier_for(TieredSupport, fade), Some(Extension));
        assert_eq!(tier_for(CorePlusExtension, simpler), Some(Core));
        assert_eq!(tier_for(CorePlusExtension, deeper), Some(Extension));
        assert_eq!(tier_for(RequiresTeacherDecision, deeper), None);
    }
}
