//! Mermaid rendering of the scheduler's phase graph.

use crate::scheduler::Phase;

const START: &str = "__start__";
const END: &str = "__end__";

/// Routed edges (chosen by the round counter) are dotted; fixed ones solid.
pub fn mermaid() -> String {
    let mut lines = vec![
        "graph TD;".to_string(),
        format!("    {START}([{START}]):::first"),
    ];
    for phase in Phase::ALL.into_iter().filter(|p| *p != Phase::Complete) {
        lines.push(format!("    {}({})", phase.name(), phase.name()));
    }
    lines.push(format!("    {END}([{END}]):::last"));

    lines.push(format!("    {START} --> {};", Phase::AgentATurn.name()));
    for phase in Phase::ALL {
        let successors = phase.successors();
        let arrow = if successors.len() > 1 { "-.->" } else { "-->" };
        for next in successors {
            let target = if *next == Phase::Complete { END } else { next.name() };
            lines.push(format!("    {} {arrow} {target};", phase.name()));
        }
    }

    lines.push("    classDef default fill:#f2f0ff,line-height:1.2".to_string());
    lines.push("    classDef first fill-opacity:0".to_string());
    lines.push("    classDef last fill:#bfb6fc".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_has_every_edge() {
        let text = mermaid();
        for edge in [
            "__start__ --> AgentA;",
            "AgentA -.-> AgentB;",
            "AgentA -.-> Judge;",
            "AgentB -.-> AgentA;",
            "AgentB -.-> Judge;",
            "Judge --> __end__;",
        ] {
            assert!(text.contains(edge), "missing {edge}");
        }
        assert!(!text.contains("Complete"));
    }
}
