//! Research agent - answers plan steps from a fixed response table.

/// Known step descriptions and their canned findings.
const RESPONSES: &[(&str, &str)] = &[
    ("Clarify objectives", "Objective confirmed with PM and Sales"),
    ("Collect supporting data", "Gathered metrics from last quarter"),
    ("Synthesize insights", "Identified churn drivers in segment B"),
    (
        "Draft recommendations",
        "Suggested pricing experiment for Enterprise tier",
    ),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct ResearchAgent;

impl ResearchAgent {
    pub const NAME: &'static str = "researcher";

    pub fn new() -> Self {
        Self
    }

    /// Look up the canned output for an instruction.
    ///
    /// Matching is exact; anything else yields `Completed: <instruction>`.
    pub fn execute(&self, instruction: &str) -> String {
        RESPONSES
            .iter()
            .find(|(known, _)| *known == instruction)
            .map(|(_, output)| (*output).to_string())
            .unwrap_or_else(|| format!("Completed: {}", instruction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_instruction_returns_canned_output() {
        let agent = ResearchAgent::new();
        assert_eq!(
            agent.execute("Collect supporting data"),
            "Gathered metrics from last quarter"
        );
    }

    #[test]
    fn test_unknown_instruction_falls_back() {
        let agent = ResearchAgent::new();
        assert_eq!(agent.execute("Call the CFO"), "Completed: Call the CFO");
        // Exact match only
        assert_eq!(
            agent.execute("clarify objectives"),
            "Completed: clarify objectives"
        );
    }
}
