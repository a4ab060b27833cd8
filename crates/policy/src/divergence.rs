use crate::{DecisionKind, RolloutPolicy, Trace};
use rotasim_core::{AbilityId, ScoringContext, SimState};
use serde::Serialize;
use std::collections::HashMap;

/// One (chosen, optimal) disagreement class with its aggregate weight and a
/// literal state snapshot from its first occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct DivergenceRecord {
    pub chosen: AbilityId,
    pub optimal: AbilityId,
    /// Mean rollout-score gap per occurrence; non-negative by construction.
    pub score_gap: f64,
    pub occurrences: u32,
    /// gap x occurrences / total trace score; 0 when the trace scored 0.
    pub estimated_share: f64,
    pub example_time: f64,
    pub example: SimState,
}

#[derive(Debug, Clone, Serialize)]
pub struct DivergenceReport {
    pub records: Vec<DivergenceRecord>,
    pub compared: u32,
    pub diverged: u32,
    pub total_trace_score: f64,
}

struct Group {
    total_gap: f64,
    count: u32,
    example_time: f64,
    example: SimState,
}

/// Replays a recorded trace against the rollout evaluator. Every comparison
/// reconstructs the exact stored pre-decision snapshot rather than
/// re-simulating, so earlier disagreements can never compound into drift.
pub fn compare_trace(
    trace: &Trace,
    rollout: &RolloutPolicy,
    scoring: &ScoringContext,
) -> DivergenceReport {
    let mut groups: HashMap<(AbilityId, AbilityId), Group> = HashMap::new();
    let mut compared = 0u32;
    let mut diverged = 0u32;

    for record in &trace.records {
        if record.kind != DecisionKind::SlotFilling {
            continue;
        }
        let Some((optimal, optimal_total)) = rollout.best_action(&record.pre, scoring) else {
            continue;
        };
        compared += 1;
        if optimal == record.ability {
            continue;
        }
        // Both sides scored by the same evaluator; the chosen action was
        // available at record time, so the gap cannot be negative.
        let chosen_total = rollout.action_total(&record.pre, record.ability, scoring);
        let gap = (optimal_total - chosen_total).max(0.0);
        diverged += 1;
        groups
            .entry((record.ability, optimal))
            .and_modify(|group| {
                group.total_gap += gap;
                group.count += 1;
            })
            .or_insert_with(|| Group {
                total_gap: gap,
                count: 1,
                example_time: record.time,
                example: record.pre.clone(),
            });
    }

    let total_trace_score = trace.summary.total_score;
    let mut records: Vec<DivergenceRecord> = groups
        .into_iter()
        .map(|((chosen, optimal), group)| DivergenceRecord {
            chosen,
            optimal,
            score_gap: group.total_gap / group.count as f64,
            occurrences: group.count,
            estimated_share: if total_trace_score > 0.0 {
                group.total_gap / total_trace_score
            } else {
                0.0
            },
            example_time: group.example_time,
            example: group.example,
        })
        .collect();
    records.sort_by(|a, b| {
        b.estimated_share
            .total_cmp(&a.estimated_share)
            .then_with(|| (a.chosen, a.optimal).cmp(&(b.chosen, b.optimal)))
    });

    DivergenceReport {
        records,
        compared,
        diverged,
        total_trace_score,
    }
}
