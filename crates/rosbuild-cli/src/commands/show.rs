//! Topology inspection command.

use anyhow::Result;

use super::assemble;

pub fn show(path: &str) -> Result<()> {
    let (master, _pool) = assemble(path)?;

    for source in &master.change_sources {
        println!(
            "change source: {} (category: {})",
            source.name(),
            source.category().unwrap_or("-")
        );
    }

    for rule in &master.schedulers {
        println!(
            "scheduler: {} -> {} (category: {})",
            rule.name,
            rule.builder_names.join(", "),
            rule.change_filter.category
        );
    }

    for builder in &master.builders {
        println!("builder: {}", builder.name);
        println!("  workers: {}", builder.worker_names.join(", "));
        if !builder.locks.is_empty() {
            println!("  locks: {}", builder.locks.join(", "));
        }
        for step in builder.pipeline.steps() {
            let hidden = if step.hidden_on_success() {
                " [hidden on success]"
            } else {
                ""
            };
            println!("  step: {}{}", step, hidden);
        }
    }

    Ok(())
}
