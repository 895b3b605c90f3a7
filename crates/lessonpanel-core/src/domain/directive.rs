//! Implementation directives: the machine-actionable payload of a concern.
//!
//! A `Directive` names the lesson element it patches and carries a payload
//! shaped for that element. There is deliberately no variant that removes
//! content; every handler in [`crate::patch`] only inserts or restructures.

use serde::{Deserialize, Serialize};

use super::lesson::{SupportTier, VocabularyEntry};

/// Element tag selecting a patch handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveElement {
    Vocabulary,
    Scaffolding,
    Pacing,
    Instructions,
    Generic,
}

impl std::fmt::Display for DirectiveElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Vocabulary => "vocabulary",
            Self::Scaffolding => "scaffolding",
            Self::Pacing => "pacing",
            Self::Instructions => "instructions",
            Self::Generic => "generic",
        };
        write!(f, "{s}")
    }
}

/// Add glossary entries for terms the lesson uses without defining.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyDirective {
    pub entries: Vec<VocabularyEntry>,
}

/// Attach tiered scaffolds to one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaffoldingDirective {
    pub activity_id: String,
    pub tier: SupportTier,
    pub entries: Vec<String>,
}

/// Insert pacing checkpoints every `interval_minutes` inside one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacingDirective {
    pub activity_id: String,
    pub interval_minutes: u32,
    pub note: String,
}

/// Break one instruction step into sub-steps, keeping the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionsDirective {
    pub activity_id: String,
    pub step_index: usize,
    pub sub_steps: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Directive {
    Vocabulary(VocabularyDirective),
    Scaffolding(ScaffoldingDirective),
    Pacing(PacingDirective),
    Instructions(InstructionsDirective),
    /// Free-form advice that is never auto-applied.
    Generic { summary: String },
}

impl Directive {
    pub fn element(&self) -> DirectiveElement {
        match self {
            Self::Vocabulary(_) => DirectiveElement::Vocabulary,
            Self::Scaffolding(_) => DirectiveElement::Scaffolding,
            Self::Pacing(_) => DirectiveElement::Pacing,
            Self::Instructions(_) => DirectiveElement::Instructions,
            Self::Generic { .. } => DirectiveElement::Generic,
        }
    }

    /// The activity a directive targets, if it is activity-scoped.
    pub fn activity_id(&self) -> Option<&str> {
        match self {
            Self::Scaffolding(d) => Some(&d.activity_id),
            Self::Pacing(d) => Some(&d.activity_id),
            Self::Instructions(d) => Some(&d.activity_id),
            Self::Vocabulary(_) | Self::Generic { .. } => None,
        }
    }

    /// Whether a patch handler can apply this directive without a human.
    pub fn is_auto_applicable(&self) -> bool {
        !matches!(self, Self::Generic { .. })
    }

    /// Re-tier a scaffolding directive; other directives pass through.
    pub fn retiered(&self, tier: SupportTier) -> Directive {
        match self {
            Self::Scaffolding(d) => Self::Scaffolding(ScaffoldingDirective {
                tier,
                ..d.clone()
            }),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_serializes_with_element_tag() {
        let d = Directive::Vocabulary(VocabularyDirective {
            entries: vec![VocabularyEntry {
                term: "osmosis".into(),
                definition: None,
            }],
        });
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["element"], "vocabulary");
        assert_eq!(json["entries"][0]["term"], "osmosis");
        let back: Directive = serde_json::from_value(json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn test_generic_is_not_auto_applicable() {
        let d = Directive::Generic {
            summary: "rethink the closure".into(),
        };
        assert!(!d.is_auto_applicable());
        assert_eq!(d.element(), DirectiveElement::Generic);
        assert_eq!(d.activity_id(), None);
    }

    #[test]
    fn test_retiered_only_touches_scaffolding() {
        let s = Directive::Scaffolding(ScaffoldingDirective {
            activity_id: "a1".into(),
            tier: SupportTier::Support,
            entries: vec!["sentence frames".into()],
        });
        match s.retiered(SupportTier::Choice) {
            Directive::Scaffolding(d) => {
                assert_eq!(d.tier, SupportTier::Choice);
                assert_eq!(d.entries, vec!["sentence frames".to_string()]);
            }
            other => panic!("unexpected directive {other:?}"),
        }

        let p = Directive::Pacing(PacingDirective {
            activity_id: "a1".into(),
            interval_minutes: 10,
            note: "stretch".into(),
        });
        assert_eq!(p.retiered(SupportTier::Extension), p);
    }
}
