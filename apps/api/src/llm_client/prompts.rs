// Cross-cutting prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// Instruction shared by every prompt that sees candidate data.
pub const FAIRNESS_INSTRUCTION: &str = "\
    Judge only job-relevant skills and experience. \
    Ignore names, age, gender, nationality and any other protected attribute.";
