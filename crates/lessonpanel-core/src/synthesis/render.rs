//! Markdown summary of a revision proposal for the teacher.

use crate::domain::Concern;

use super::proposal::RevisionProposal;

fn concern_line(change_id: &str, profile: &str, concern: &Concern) -> String {
    format!(
        "- `{}` **{}** [{}] {}: {} (from {})\n",
        change_id,
        concern.severity,
        concern.element,
        concern.recommendation.change,
        concern.issue,
        profile
    )
}

/// Render the proposal as markdown, in proposal order.
pub fn render_proposal_md(proposal: &RevisionProposal) -> String {
    let mut out = String::new();
    out.push_str("# Revision Proposal\n\n");

    if proposal.is_empty() {
        out.push_str("No changes proposed.\n");
        return out;
    }

    if !proposal.universal_improvements.is_empty() {
        out.push_str("## Universal Improvements\n");
        for u in &proposal.universal_improvements {
            out.push_str(&format!(
                "- `{}` **{}** [{}] {} (agreed by {})\n",
                u.change_id,
                u.severity,
                u.element,
                u.change,
                u.profile_ids.join(", ")
            ));
        }
        out.push('\n');
    }

    for category in &proposal.priority_categories {
        out.push_str(&format!("## {}\n", category.tag));
        for c in &category.changes {
            out.push_str(&concern_line(&c.change_id, &c.profile_id, &c.concern));
        }
        out.push('\n');
    }

    if !proposal.conflicts.is_empty() {
        out.push_str("## Conflicts\n");
        for c in &proposal.conflicts {
            out.push_str(&format!(
                "### `{}` {} ({})\n",
                c.change_id, c.element, c.resolution_strategy
            ));
            for side in &c.opposing_concerns {
                out.push_str(&format!(
                    "- {}: {}\n",
                    side.profile_id, side.concern.recommendation.change
                ));
            }
            out.push_str(&format!("\n{}\n", c.teacher_note));
            if !c.resolution.is_empty() {
                out.push('\n');
                for r in &c.resolution {
                    match r.tier {
                        Some(tier) => out.push_str(&format!(
                            "- `{}` {} tier for {}\n",
                            r.change_id, tier, r.profile_id
                        )),
                        None => out.push_str(&format!(
                            "- `{}` as proposed by {}\n",
                            r.change_id, r.profile_id
                        )),
                    }
                }
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_proposal_renders_placeholder() {
        let md = render_proposal_md(&RevisionProposal::default());
        assert!(md.starts_with("# Revision Proposal"));
        assert!(md.contains("No changes proposed."));
    }
}
