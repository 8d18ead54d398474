//! Rendering measurement results.

use std::collections::BTreeMap;

use console::style;
use serde::Serialize;

use tangle_core::Counts;
use tangle_core::measure::outcome_to_bitstring;

use crate::circuit::Circuit;

/// Outcomes of one run, keyed by bitstring with qubit 0 leftmost.
#[derive(Debug, Serialize)]
pub struct Report {
    pub num_qubits: usize,
    pub nodes: usize,
    pub circuit: Circuit,
    pub shots: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<u64>,
    pub counts: BTreeMap<String, u64>,
}

impl Report {
    pub fn new(
        num_qubits: usize,
        nodes: usize,
        circuit: Circuit,
        shots: usize,
        counts: &Counts,
    ) -> Self {
        let outcome = if shots == 1 {
            counts.keys().next().copied()
        } else {
            None
        };
        let counts = counts
            .iter()
            .map(|(&index, &count)| (outcome_to_bitstring(index, num_qubits), count))
            .collect();
        Self {
            num_qubits,
            nodes,
            circuit,
            shots,
            outcome,
            counts,
        }
    }

    /// Outcomes sorted by count, most frequent first.
    pub fn sorted(&self) -> Vec<(&str, u64)> {
        let mut sorted: Vec<_> = self
            .counts
            .iter()
            .map(|(bits, &count)| (bits.as_str(), count))
            .collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        sorted
    }

    pub fn print(&self) {
        if let Some(outcome) = self.outcome {
            println!(
                "{} Measured {} ({})",
                style("✓").green().bold(),
                style(outcome).cyan().bold(),
                outcome_to_bitstring(outcome, self.num_qubits)
            );
            return;
        }

        println!(
            "\n{} Results ({} shots, {} qubits on {} ranks):",
            style("✓").green().bold(),
            self.shots,
            self.num_qubits,
            self.nodes
        );

        let sorted = self.sorted();
        let total = self.shots.max(1) as f64;

        for (bitstring, count) in sorted.iter().take(16) {
            let prob = *count as f64 / total * 100.0;
            let bar: String = "█".repeat((prob / 2.0).round() as usize);
            println!(
                "  {}: {:>6} ({:>5.2}%) {}",
                style(bitstring).cyan(),
                count,
                prob,
                style(bar).green()
            );
        }

        if sorted.len() > 16 {
            println!("  ... and {} more outcomes", sorted.len() - 16);
        }
    }
}
