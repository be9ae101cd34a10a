//! Default transferable principle and problem title per rubric category.

use super::{PrincipleBlock, SkillLevel};
use crate::rubric::{RubricCategory, Severity};

/// The principle taught for a category when coaching supplies none.
pub fn default_principle(category: RubricCategory) -> PrincipleBlock {
    let (name, description, skill_level, why_it_matters) = match category {
        RubricCategory::OpeningHook => (
            "Start in the moment",
            "Open inside a specific scene or line of thought instead of with a summary or a definition.",
            SkillLevel::Foundational,
            "Readers decide in the first two sentences whether the essay is about a person or a résumé line.",
        ),
        RubricCategory::Vulnerability => (
            "Show the cost",
            "Name the doubt, failure or fear you actually felt and let it stay on the page before resolving it.",
            SkillLevel::Advanced,
            "Admissions readers trust growth only when they have seen what it cost you.",
        ),
        RubricCategory::Dialogue => (
            "Let people speak",
            "Use one or two exact lines of speech to carry a turning point rather than paraphrasing what was said.",
            SkillLevel::Intermediate,
            "A quoted line puts the reader in the room and does characterization in a handful of words.",
        ),
        RubricCategory::Structure => (
            "Shape the arc",
            "Order paragraphs so each one changes what the reader knows about you, ending somewhere the opening could not.",
            SkillLevel::Intermediate,
            "A clear arc lets a tired reader follow your growth without rereading.",
        ),
        RubricCategory::Specificity => (
            "Name the particulars",
            "Replace general claims with names, numbers, places and objects only you would know.",
            SkillLevel::Foundational,
            "Specific details are the evidence that the experience was yours and not anyone's.",
        ),
        RubricCategory::Imagery => (
            "Engage the senses",
            "Anchor key moments in what you saw, heard or felt physically.",
            SkillLevel::Foundational,
            "Sensory detail makes a moment memorable long after the reader moves to the next file.",
        ),
        RubricCategory::Voice => (
            "Sound like yourself",
            "Write the way you think, including the asides and word choices a friend would recognize.",
            SkillLevel::Advanced,
            "Voice is the one thing no other applicant can copy.",
        ),
        RubricCategory::Stakes => (
            "Make it matter",
            "Make clear early what you stood to lose or gain and why it mattered to you at the time.",
            SkillLevel::Intermediate,
            "Without stakes, even a dramatic event reads as a list of things that happened.",
        ),
        RubricCategory::Reflection => (
            "Earn the insight",
            "Draw a conclusion that follows from the scenes you showed and says something non-obvious about you.",
            SkillLevel::Advanced,
            "Reflection is where the reader learns how you think, which is what the essay is for.",
        ),
        RubricCategory::Pacing => (
            "Slow down where it counts",
            "Spend sentences on the pivotal moment and compress the setup and logistics around it.",
            SkillLevel::Intermediate,
            "Pacing tells the reader which moment you want them to remember.",
        ),
        RubricCategory::Ending => (
            "Land the ending",
            "Close on an image, action or line that echoes the opening and points forward.",
            SkillLevel::Intermediate,
            "The last line is what the reader carries into the committee discussion.",
        ),
    };

    PrincipleBlock {
        name: name.to_string(),
        description: description.to_string(),
        skill_level,
        why_it_matters: why_it_matters.to_string(),
    }
}

/// Problem title used when coaching has no headline for the category.
pub(super) fn problem_title(category: RubricCategory, severity: Severity) -> String {
    let label = category.label();
    match severity {
        Severity::Critical => format!("{} is holding this essay back", label),
        Severity::Major => format!("{} needs strengthening", label),
        Severity::Minor => format!("{} could be sharper", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_principle() {
        for category in RubricCategory::ALL {
            let principle = default_principle(category);
            assert!(!principle.name.is_empty());
            assert!(!principle.why_it_matters.is_empty());
        }
    }

    #[test]
    fn test_problem_title_reflects_severity() {
        assert_eq!(
            problem_title(RubricCategory::OpeningHook, Severity::Critical),
            "Opening Hook is holding this essay back"
        );
        assert_eq!(
            problem_title(RubricCategory::Dialogue, Severity::Minor),
            "Dialogue could be sharper"
        );
    }
}
