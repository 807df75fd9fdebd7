//! C8 sequence generator (spec §4.8 step 1): turns the opportunity
//! calculators' output into candidate multi-step `ActionSequence`s,
//! pruning infeasible ones (insufficient cash or quantity) and deduping by
//! `sequence_hash` so the evaluator never scores the same plan twice.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::domain::hash::{sequence_hash, CanonicalAction};
use crate::domain::ledger::Side;
use crate::domain::opportunity::{ActionCandidate, ActionSequence, OpportunitiesByCategory};
use crate::domain::portfolio::PortfolioSnapshot;

pub struct GeneratorConfig {
    /// Maximum number of steps chained into a single sequence.
    pub max_depth: usize,
    /// Maximum number of distinct sequences returned.
    pub max_sequences: usize,
    /// Whether infeasible sequences (insufficient cash or quantity at some
    /// step) are dropped as they're built, rather than kept and scored.
    pub prune_infeasible: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_sequences: 200,
            prune_infeasible: true,
        }
    }
}

/// One depth's worth of generation stats (spec §4.8: `DetailedProgressUpdate`,
/// `subphase=depth_k`).
#[derive(Debug, Clone)]
pub struct DetailedProgressUpdate {
    pub current_depth: usize,
    pub candidates_count: usize,
    pub combinations_at_depth: u64,
    pub sequences_generated: u64,
    pub infeasible_pruned: u64,
}

/// Receives one `DetailedProgressUpdate` per depth as the generator walks
/// from depth 1 to `max_depth`.
pub trait GenerationProgressSink: Send + Sync {
    fn on_depth_progress(&self, update: DetailedProgressUpdate);
}

pub struct SequenceGenerator {
    config: GeneratorConfig,
}

impl SequenceGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, opportunities: &OpportunitiesByCategory, snapshot: &PortfolioSnapshot) -> Vec<ActionSequence> {
        self.generate_with_progress(opportunities, snapshot, None)
    }

    /// Builds sequences depth by depth: depth 1 is every candidate taken
    /// alone; each depth d+1 sequence is a depth-d sequence with one more
    /// not-already-present candidate appended, kept only if it remains
    /// feasible (spec §4.8: "each depth-d sequence concatenated with every
    /// candidate not already present that remains feasible"). Feasibility
    /// pruning applies at every depth, including depth 1, when
    /// `prune_infeasible` is set; disabling it never shrinks the result
    /// (spec §4.8 P5: "infeasibility monotonic").
    pub fn generate_with_progress(
        &self,
        opportunities: &OpportunitiesByCategory,
        snapshot: &PortfolioSnapshot,
        sink: Option<&dyn GenerationProgressSink>,
    ) -> Vec<ActionSequence> {
        let mut candidates: Vec<ActionCandidate> = opportunities.values().flatten().cloned().collect();
        candidates.sort_by(|a, b| b.priority.partial_cmp(&a.priority).unwrap_or(std::cmp::Ordering::Equal));

        let mut sequences = Vec::new();
        let mut seen_hashes = HashSet::new();
        let mut frontier: Vec<Vec<ActionCandidate>> = Vec::new();

        let mut combinations = 0u64;
        let mut generated = 0u64;
        let mut infeasible_pruned = 0u64;

        for c in &candidates {
            combinations += 1;
            let steps = vec![c.clone()];
            if self.config.prune_infeasible && !is_feasible(snapshot, &steps) {
                infeasible_pruned += 1;
                continue;
            }
            if push_unique(&mut sequences, &mut seen_hashes, steps.clone()) {
                generated += 1;
            }
            frontier.push(steps);
            if sequences.len() >= self.config.max_sequences {
                break;
            }
        }
        report(sink, 1, candidates.len(), combinations, generated, infeasible_pruned);

        let mut depth = 1;
        while depth < self.config.max_depth && !frontier.is_empty() && sequences.len() < self.config.max_sequences {
            depth += 1;
            combinations = 0;
            generated = 0;
            infeasible_pruned = 0;
            let mut next_frontier = Vec::new();

            'outer: for prior in &frontier {
                for candidate in &candidates {
                    if prior.iter().any(|s| s.isin == candidate.isin) {
                        continue;
                    }
                    combinations += 1;
                    let mut steps = prior.clone();
                    steps.push(candidate.clone());

                    if self.config.prune_infeasible && !is_feasible(snapshot, &steps) {
                        infeasible_pruned += 1;
                        continue;
                    }
                    if push_unique(&mut sequences, &mut seen_hashes, steps.clone()) {
                        generated += 1;
                    }
                    next_frontier.push(steps);
                    if sequences.len() >= self.config.max_sequences {
                        break 'outer;
                    }
                }
            }

            report(sink, depth, candidates.len(), combinations, generated, infeasible_pruned);
            frontier = next_frontier;
        }

        sequences.truncate(self.config.max_sequences);
        sequences
    }
}

fn report(
    sink: Option<&dyn GenerationProgressSink>,
    current_depth: usize,
    candidates_count: usize,
    combinations_at_depth: u64,
    sequences_generated: u64,
    infeasible_pruned: u64,
) {
    if let Some(sink) = sink {
        sink.on_depth_progress(DetailedProgressUpdate {
            current_depth,
            candidates_count,
            combinations_at_depth,
            sequences_generated,
            infeasible_pruned,
        });
    }
}

/// Inserts the sequence if its canonical hash hasn't been seen yet, returning
/// whether it was newly inserted.
fn push_unique(sequences: &mut Vec<ActionSequence>, seen: &mut HashSet<String>, steps: Vec<ActionCandidate>) -> bool {
    let actions: Vec<CanonicalAction> = steps
        .iter()
        .map(|s| CanonicalAction {
            isin: s.isin.clone(),
            side: s.side,
            quantity: s.quantity,
        })
        .collect();
    let hash = sequence_hash(&actions);
    if !seen.insert(hash) {
        return false;
    }
    let pattern_type = ActionSequence::classify_pattern(&steps);
    let depth = steps.len();
    sequences.push(ActionSequence {
        steps,
        depth,
        pattern_type,
    });
    true
}

/// Checks that a simulated cash balance never goes negative and no sell
/// exceeds the held quantity, using EUR cash as the settlement currency
/// proxy (spec §4.8 step 1 feasibility pruning).
fn is_feasible(snapshot: &PortfolioSnapshot, steps: &[ActionCandidate]) -> bool {
    let mut cash = snapshot.cash_of("EUR");
    let mut quantities: HashMap<String, Decimal> = HashMap::new();
    for step in steps {
        let held = *quantities
            .entry(step.isin.to_string())
            .or_insert_with(|| snapshot.quantity_of(&step.isin));
        match step.side {
            Side::Sell => {
                if step.quantity > held {
                    return false;
                }
                quantities.insert(step.isin.to_string(), held - step.quantity);
                cash += step.value_eur;
            }
            Side::Buy => {
                if step.value_eur > cash {
                    return false;
                }
                cash -= step.value_eur;
                quantities.insert(step.isin.to_string(), held + step.quantity);
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use rust_decimal_macros::dec;

    use crate::domain::ids::Isin;
    use crate::domain::opportunity::ActionCategory;
    use crate::domain::portfolio::{CashBalance, Position};

    use super::*;

    fn candidate(isin: &str, side: Side, quantity: Decimal, value_eur: Decimal, priority: f64) -> ActionCandidate {
        ActionCandidate {
            isin: Isin::parse(isin).unwrap(),
            symbol: isin.to_string(),
            side,
            quantity,
            value_eur,
            priority,
            category: ActionCategory::RebalanceSell,
        }
    }

    fn snapshot_with(isin: &str, quantity: Decimal, cash_eur: Decimal) -> PortfolioSnapshot {
        let mut snapshot = PortfolioSnapshot::default();
        let isin = Isin::parse(isin).unwrap();
        snapshot.positions.insert(
            isin.clone(),
            Position {
                isin,
                quantity,
                avg_cost: Decimal::ZERO,
                market_price: Decimal::ZERO,
                market_value_eur: Decimal::ZERO,
                last_update: chrono::Utc::now(),
            },
        );
        snapshot
            .cash
            .insert("EUR".to_string(), CashBalance { currency: "EUR".to_string(), amount: cash_eur });
        snapshot
    }

    /// Two feasible SELL-only candidates with `MaxDepth=2` must yield both
    /// singles plus both orderings of the pair: `2 + 2 = 4` sequences, and
    /// the depth-2 progress update reports exactly 2 combinations and 2
    /// newly generated sequences.
    #[test]
    fn two_sells_at_depth_two_yield_four_sequences() {
        let mut snapshot = PortfolioSnapshot::default();
        let isin_a = Isin::parse("US0378331005").unwrap();
        let isin_b = Isin::parse("US5949181045").unwrap();
        snapshot.positions.insert(
            isin_a.clone(),
            Position { isin: isin_a, quantity: dec!(100), avg_cost: Decimal::ZERO, market_price: Decimal::ZERO, market_value_eur: Decimal::ZERO, last_update: chrono::Utc::now() },
        );
        snapshot.positions.insert(
            isin_b.clone(),
            Position { isin: isin_b, quantity: dec!(100), avg_cost: Decimal::ZERO, market_price: Decimal::ZERO, market_value_eur: Decimal::ZERO, last_update: chrono::Utc::now() },
        );

        let mut opportunities = OpportunitiesByCategory::new();
        opportunities.insert(
            ActionCategory::RebalanceSell,
            vec![
                candidate("US0378331005", Side::Sell, dec!(10), dec!(1000), 0.9),
                candidate("US5949181045", Side::Sell, dec!(10), dec!(1000), 0.8),
            ],
        );

        let generator = SequenceGenerator::new(GeneratorConfig { max_depth: 2, max_sequences: 200, prune_infeasible: true });

        let depth_updates = Mutex::new(Vec::new());
        struct Recorder<'a>(&'a Mutex<Vec<DetailedProgressUpdate>>);
        impl GenerationProgressSink for Recorder<'_> {
            fn on_depth_progress(&self, update: DetailedProgressUpdate) {
                self.0.lock().unwrap().push(update);
            }
        }
        let sink = Recorder(&depth_updates);

        let sequences = generator.generate_with_progress(&opportunities, &snapshot, Some(&sink));
        assert_eq!(sequences.len(), 4);

        let updates = depth_updates.into_inner().unwrap();
        let depth_two = updates.iter().find(|u| u.current_depth == 2).expect("depth-2 update");
        assert_eq!(depth_two.combinations_at_depth, 2);
        assert_eq!(depth_two.sequences_generated, 2);
    }

    /// A BUY too expensive to afford alone is pruned at depth 1 and never
    /// reappears at depth 2 (it's infeasible in any order), while an
    /// affordable BUY survives.
    #[test]
    fn infeasible_single_step_buy_is_pruned_and_never_chained() {
        let snapshot = snapshot_with("US0378331005", Decimal::ZERO, dec!(500));

        let mut opportunities = OpportunitiesByCategory::new();
        opportunities.insert(
            ActionCategory::OpportunityBuy,
            vec![
                candidate("US0378331005", Side::Buy, dec!(100), dec!(5000), 0.9),
                candidate("US5949181045", Side::Buy, dec!(1), dec!(100), 0.5),
            ],
        );

        let generator = SequenceGenerator::new(GeneratorConfig { max_depth: 2, max_sequences: 200, prune_infeasible: true });
        let sequences = generator.generate(&opportunities, &snapshot);

        let expensive = Isin::parse("US0378331005").unwrap();
        assert!(sequences.iter().all(|s| !s.contains_isin(&expensive)));
        assert_eq!(sequences.iter().filter(|s| s.depth == 1).count(), 1);
        assert!(sequences.iter().all(|s| s.depth < 2));
    }

    #[test]
    fn disabling_pruning_never_shrinks_the_result() {
        let snapshot = snapshot_with("US0378331005", Decimal::ZERO, dec!(500));
        let mut opportunities = OpportunitiesByCategory::new();
        opportunities.insert(
            ActionCategory::OpportunityBuy,
            vec![
                candidate("US0378331005", Side::Buy, dec!(100), dec!(5000), 0.9),
                candidate("US5949181045", Side::Buy, dec!(1), dec!(100), 0.5),
            ],
        );

        let pruned = SequenceGenerator::new(GeneratorConfig { max_depth: 2, max_sequences: 200, prune_infeasible: true })
            .generate(&opportunities, &snapshot);
        let unpruned = SequenceGenerator::new(GeneratorConfig { max_depth: 2, max_sequences: 200, prune_infeasible: false })
            .generate(&opportunities, &snapshot);

        assert!(unpruned.len() >= pruned.len());
    }
}
