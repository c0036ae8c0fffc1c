//! sample-run - runs the hardcoded planned task through the script orchestrator
//! and prints its summary.
//!
//! Logs go to stderr so stdout carries only the summary.

use planned_task_runner::memory::MemoryStore;
use planned_task_runner::orchestrator::TaskOrchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const TITLE: &str = "Competitive Pricing Review";
const DESCRIPTION: &str = "Understand how competitors price premium tiers";
const ESTIMATED_STEPS: u32 = 3;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "planned_task_runner=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut orchestrator = TaskOrchestrator::new(MemoryStore::new());
    let summary = orchestrator.run_task(TITLE, DESCRIPTION, ESTIMATED_STEPS)?;

    println!("Short answer: {}", summary.short_answer);
    println!("Detailed answer: {}", summary.detailed_answer);
    println!("Next steps:");
    for step in &summary.next_steps {
        println!("- {}", step);
    }

    for line in orchestrator.history(TITLE) {
        tracing::debug!("{}", line);
    }

    Ok(())
}
