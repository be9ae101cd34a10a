//! Built-in before/after exemplars drawn from admitted personal narratives.

use super::{AfterExcerpt, Annotation, BeforeExcerpt, EliteEssayExample, SchoolTier};
use crate::rubric::RubricCategory;

struct Draft<'a> {
    id: &'a str,
    category: RubricCategory,
    tier: SchoolTier,
    context: &'a str,
    before: &'a str,
    problems: &'a [&'a str],
    after: &'a str,
    improvement: &'a str,
    annotations: &'a [(&'a str, &'a str, &'a str)],
}

impl Draft<'_> {
    fn build(&self) -> EliteEssayExample {
        EliteEssayExample {
            id: self.id.to_string(),
            category: self.category,
            context: self.context.to_string(),
            tier: self.tier,
            before: BeforeExcerpt {
                text: self.before.to_string(),
                problems: self.problems.iter().map(|p| p.to_string()).collect(),
            },
            after: AfterExcerpt {
                text: self.after.to_string(),
                score_improvement: self.improvement.to_string(),
            },
            annotations: self
                .annotations
                .iter()
                .map(|(highlight, explanation, principle)| Annotation {
                    highlight: highlight.to_string(),
                    explanation: explanation.to_string(),
                    principle: principle.to_string(),
                })
                .collect(),
        }
    }
}

/// Full catalog in display order.
pub(super) fn catalog() -> Vec<EliteEssayExample> {
    use RubricCategory::*;
    use SchoolTier::*;

    let drafts = [
        Draft {
            id: "hook-robotics-ivy",
            category: OpeningHook,
            tier: IvyPlus,
            context: "Robotics captain, engineering applicant",
            before: "I have always been passionate about robotics and joined the team in ninth grade.",
            problems: &["Opens with a generic claim", "No scene or tension in the first line"],
            after: "The robot died thirty seconds into the semifinal, and every eye in the gym turned to the kid holding the controller: me.",
            improvement: "Opening hook 4/10 -> 9/10",
            annotations: &[(
                "The robot died thirty seconds into the semifinal",
                "Starts in the middle of the highest-stakes moment.",
                "In medias res",
            )],
        },
        Draft {
            id: "hook-bakery-competitive",
            category: OpeningHook,
            tier: Competitive,
            context: "Part-time job at a family bakery",
            before: "Working at my aunt's bakery taught me many valuable lessons.",
            problems: &["Announces the lesson before the story", "Abstract wording"],
            after: "At 4:45 a.m. the bakery smells like burnt sugar and my aunt's impatience.",
            improvement: "Opening hook 5/10 -> 8/10",
            annotations: &[(
                "At 4:45 a.m.",
                "A precise time grounds the reader immediately.",
                "Concrete entry point",
            )],
        },
        Draft {
            id: "vuln-debate-ivy",
            category: Vulnerability,
            tier: IvyPlus,
            context: "Debate team, lost state final",
            before: "Losing the state final was disappointing, but I learned to accept failure.",
            problems: &["Names the feeling without showing it", "Rushes to the lesson"],
            after: "I sat in the bus bathroom for twenty minutes so nobody would see that I had rehearsed my victory speech and not one word for losing.",
            improvement: "Vulnerability 3/10 -> 9/10",
            annotations: &[(
                "rehearsed my victory speech",
                "Admits a private, slightly embarrassing truth.",
                "Specific admission over general feeling",
            )],
        },
        Draft {
            id: "vuln-tutor-topuc",
            category: Vulnerability,
            tier: TopUc,
            context: "Peer tutor for algebra",
            before: "Sometimes tutoring was hard but I always stayed positive.",
            problems: &["Hides the struggle", "Positivity reads as a mask"],
            after: "The third time Marco asked me to explain slope, I realized I had been explaining it for me, not for him.",
            improvement: "Vulnerability 5/10 -> 8/10",
            annotations: &[(
                "explaining it for me, not for him",
                "The writer owns a flaw in their own approach.",
                "Self-implication",
            )],
        },
        Draft {
            id: "vuln-swim-competitive",
            category: Vulnerability,
            tier: Competitive,
            context: "Varsity swimmer recovering from injury",
            before: "My shoulder injury was a setback that made me stronger.",
            problems: &["Cliche framing", "No moment of doubt on the page"],
            after: "For a month I told my coach the shoulder felt fine because I was more afraid of the bench than the pain.",
            improvement: "Vulnerability 6/10 -> 8/10",
            annotations: &[(
                "more afraid of the bench than the pain",
                "Shows a real fear and the choice it caused.",
                "Cost of the choice",
            )],
        },
        Draft {
            id: "vuln-choir-ivy",
            category: Vulnerability,
            tier: IvyPlus,
            context: "Choir section leader",
            before: "I was nervous about my solo but I overcame my fear.",
            problems: &["Overcoming is asserted, not dramatized"],
            after: "My voice cracked on the first note, and for two bars I sang only to the exit sign.",
            improvement: "Vulnerability 4/10 -> 8/10",
            annotations: &[(
                "sang only to the exit sign",
                "An image of wanting to escape carries the fear.",
                "Show the flinch",
            )],
        },
        Draft {
            id: "dialogue-clinic-ivy",
            category: Dialogue,
            tier: IvyPlus,
            context: "Hospital volunteer, interpreter",
            before: "The patient told me she was worried about the test results and I reassured her.",
            problems: &["Summarized speech", "The key exchange is reported, not heard"],
            after: "\"Tell me the truth,\" she said in Tagalog. \"Is it bad?\" I looked at the doctor, then back at her. \"He says they need one more scan.\"",
            improvement: "Dialogue 4/10 -> 9/10",
            annotations: &[(
                "I looked at the doctor, then back at her.",
                "A beat of action between lines shows the interpreter's dilemma.",
                "Action beats carry subtext",
            )],
        },
        Draft {
            id: "dialogue-garage-competitive",
            category: Dialogue,
            tier: Competitive,
            context: "Working in a father's auto shop",
            before: "My dad always told me to do things right the first time.",
            problems: &["Habitual summary instead of one real moment"],
            after: "\"You torqued it?\" Dad asked. \"Pretty sure.\" He handed me the wrench. \"Pretty sure isn't a number.\"",
            improvement: "Dialogue 6/10 -> 8/10",
            annotations: &[(
                "Pretty sure isn't a number.",
                "One line of speech captures a whole value system.",
                "Let the character speak the theme",
            )],
        },
        Draft {
            id: "dialogue-council-topuc",
            category: Dialogue,
            tier: TopUc,
            context: "Student council budget fight",
            before: "There was a lot of disagreement at the meeting about the budget.",
            problems: &["Conflict is described, not staged"],
            after: "\"We are not cutting the art supply line,\" Priya said. \"Then tell me which club goes dark,\" I said, and nobody answered.",
            improvement: "Dialogue 5/10 -> 8/10",
            annotations: &[(
                "and nobody answered",
                "Silence after a line is its own piece of dialogue.",
                "Use silence",
            )],
        },
        Draft {
            id: "structure-farm-ivy",
            category: Structure,
            tier: IvyPlus,
            context: "Summers on a grandparent's farm",
            before: "First I did chores, then I learned to drive the tractor, then I planted a garden, then I came home.",
            problems: &["Chronological list with no turn", "Every event weighted the same"],
            after: "The essay opens on the dead seedlings, flashes back to the spring planting, and returns to the replanting that closes it.",
            improvement: "Structure 4/10 -> 9/10",
            annotations: &[(
                "returns to the replanting",
                "A frame gives the ending a place to land.",
                "Circular structure",
            )],
        },
        Draft {
            id: "structure-band-competitive",
            category: Structure,
            tier: Competitive,
            context: "Marching band drum line",
            before: "Three paragraphs describe practice, then the last paragraph suddenly introduces a conflict with the director.",
            problems: &["Conflict arrives too late", "No rising action"],
            after: "The conflict with the director is seeded in paragraph one and tightens through each rehearsal.",
            improvement: "Structure 6/10 -> 8/10",
            annotations: &[(
                "seeded in paragraph one",
                "Plant tension early so later scenes pay it off.",
                "Setup and payoff",
            )],
        },
        Draft {
            id: "specificity-food-bank-topuc",
            category: Specificity,
            tier: TopUc,
            context: "Food bank coordinator",
            before: "I helped a lot of families get food during the pandemic.",
            problems: &["Vague scale", "No named detail"],
            after: "Every Saturday we packed 212 boxes; the Nguyens always asked for extra rice and never for anything else.",
            improvement: "Specificity 5/10 -> 9/10",
            annotations: &[(
                "212 boxes",
                "A real number makes the scale believable.",
                "Quantify",
            )],
        },
        Draft {
            id: "specificity-lab-ivy",
            category: Specificity,
            tier: IvyPlus,
            context: "Summer research internship",
            before: "I did research on cells and learned a lot about science.",
            problems: &["Generic noun phrases", "Reader cannot picture the work"],
            after: "I spent six weeks counting zebrafish heartbeats under a microscope that fogged every time I exhaled.",
            improvement: "Specificity 3/10 -> 9/10",
            annotations: &[(
                "zebrafish heartbeats",
                "The exact organism and task replace 'cells'.",
                "Name the thing",
            )],
        },
        Draft {
            id: "imagery-orchard-topuc",
            category: Imagery,
            tier: TopUc,
            context: "Harvest job at an orchard",
            before: "The orchard was beautiful in the fall.",
            problems: &["Evaluative adjective instead of sensory detail"],
            after: "By October the rows smelled like cider going sour, and wasps drifted drunk between the fallen apples.",
            improvement: "Imagery 5/10 -> 9/10",
            annotations: &[(
                "smelled like cider going sour",
                "Smell is the most underused sense in narratives.",
                "Engage more than sight",
            )],
        },
        Draft {
            id: "imagery-kitchen-competitive",
            category: Imagery,
            tier: Competitive,
            context: "Cooking for younger siblings",
            before: "Dinner was always chaotic at my house.",
            problems: &["Tells the mood directly"],
            after: "Rice boiled over while the twins fought over the last clean fork.",
            improvement: "Imagery 6/10 -> 8/10",
            annotations: &[(
                "the last clean fork",
                "One small object implies the whole household.",
                "Telling detail",
            )],
        },
        Draft {
            id: "voice-chess-ivy",
            category: Voice,
            tier: IvyPlus,
            context: "Chess club founder",
            before: "Chess has taught me patience, strategy, and critical thinking skills.",
            problems: &["Resume register", "Could be written by anyone"],
            after: "I am the kind of person who apologizes to the pawns I sacrifice, which is a problem in a game built on sacrificing pawns.",
            improvement: "Voice 4/10 -> 9/10",
            annotations: &[(
                "apologizes to the pawns",
                "Self-aware humor marks a distinct personality.",
                "Earned humor",
            )],
        },
        Draft {
            id: "voice-lifeguard-competitive",
            category: Voice,
            tier: Competitive,
            context: "Community pool lifeguard",
            before: "Being a lifeguard is a very important responsibility.",
            problems: &["Flat, formal tone"],
            after: "Lifeguarding is ninety-nine percent sunscreen and one percent the worst ten seconds of your summer.",
            improvement: "Voice 6/10 -> 8/10",
            annotations: &[(
                "ninety-nine percent sunscreen",
                "A wry ratio sounds like a real teenager talking.",
                "Conversational precision",
            )],
        },
        Draft {
            id: "stakes-translator-ivy",
            category: Stakes,
            tier: IvyPlus,
            context: "Translating for immigrant parents",
            before: "I often translated for my parents at appointments.",
            problems: &["Nothing seems at risk"],
            after: "If I mistranslated 'eviction' the way I had mistranslated 'deductible', we would not have an apartment in March.",
            improvement: "Stakes 4/10 -> 9/10",
            annotations: &[(
                "we would not have an apartment in March",
                "States the concrete consequence of failure.",
                "Make the cost tangible",
            )],
        },
        Draft {
            id: "stakes-theater-topuc",
            category: Stakes,
            tier: TopUc,
            context: "Stage manager for the school play",
            before: "Opening night had some technical problems that I fixed.",
            problems: &["Problems minimized", "No ticking clock"],
            after: "With four minutes to curtain the lighting board rebooted and forgot every cue we had programmed in three weeks.",
            improvement: "Stakes 5/10 -> 8/10",
            annotations: &[(
                "four minutes to curtain",
                "A deadline raises pressure without adjectives.",
                "Ticking clock",
            )],
        },
        Draft {
            id: "reflection-shelter-ivy",
            category: Reflection,
            tier: IvyPlus,
            context: "Animal shelter volunteer",
            before: "This experience taught me the importance of compassion.",
            problems: &["Moral is generic", "No change in thinking is shown"],
            after: "I used to think compassion meant feeling sorry for the dogs. Now I think it means cleaning the kennel of the one that bit me, the same way, every day.",
            improvement: "Reflection 4/10 -> 9/10",
            annotations: &[(
                "I used to think ... Now I think",
                "Shows the before and after of a belief.",
                "Articulate the shift",
            )],
        },
        Draft {
            id: "reflection-soccer-competitive",
            category: Reflection,
            tier: Competitive,
            context: "Youth soccer referee",
            before: "Refereeing made me a better leader.",
            problems: &["Claim without insight"],
            after: "Refereeing taught me that being fair and being liked are different jobs, and I only get paid for one.",
            improvement: "Reflection 6/10 -> 8/10",
            annotations: &[(
                "fair and being liked are different jobs",
                "A precise distinction reads as real insight.",
                "Insight through contrast",
            )],
        },
        Draft {
            id: "pacing-hackathon-topuc",
            category: Pacing,
            tier: TopUc,
            context: "24-hour hackathon",
            before: "Two paragraphs on team formation, one sentence on the demo that failed.",
            problems: &["Time spent on setup, the climax rushed"],
            after: "The demo failure gets a slowed, beat-by-beat paragraph; team formation shrinks to one line.",
            improvement: "Pacing 5/10 -> 8/10",
            annotations: &[(
                "beat-by-beat paragraph",
                "Slow down where the stakes peak.",
                "Scene time matches importance",
            )],
        },
        Draft {
            id: "pacing-mural-competitive",
            category: Pacing,
            tier: Competitive,
            context: "Community mural project",
            before: "We planned, sketched, painted, fixed mistakes, finished, and held an unveiling.",
            problems: &["Every step compressed into one sentence"],
            after: "The essay skips the planning and lingers on the night rain washed out the half-finished sky.",
            improvement: "Pacing 6/10 -> 8/10",
            annotations: &[(
                "lingers on the night rain",
                "Choose one moment to expand instead of listing all.",
                "Selective expansion",
            )],
        },
        Draft {
            id: "ending-library-ivy",
            category: Ending,
            tier: IvyPlus,
            context: "Starting a library in a refugee center",
            before: "In conclusion, this project showed me that I can make a difference.",
            problems: &["Summary ending", "Restates instead of resonates"],
            after: "Last week a girl returned the first book we ever lent, then asked for the sequel we do not have yet.",
            improvement: "Ending 4/10 -> 9/10",
            annotations: &[(
                "the sequel we do not have yet",
                "Ends on forward motion rather than a verdict.",
                "Open, earned ending",
            )],
        },
        Draft {
            id: "ending-track-competitive",
            category: Ending,
            tier: Competitive,
            context: "Cross-country runner",
            before: "Running will always be a big part of my life.",
            problems: &["Vague promise about the future"],
            after: "I still run the hill behind school every Tuesday, slower now, mostly so the freshmen have someone to pass.",
            improvement: "Ending 6/10 -> 8/10",
            annotations: &[(
                "someone to pass",
                "A closing image shows how the writer's role changed.",
                "End on an image",
            )],
        },
    ];

    drafts.iter().map(Draft::build).collect()
}
