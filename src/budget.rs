//! Budget allocator — fits candidates to a token budget under one of
//! three strategies.
//!
//! `drop` walks candidates by priority and skips whatever would
//! overflow. `truncate` demotes an overflowing file to structure mode
//! before giving up on it. `hybrid` adds a pre-pass that demotes any
//! file costing more than 10% of the budget up front, so a single
//! large file cannot starve everything behind it, then allocates like
//! `truncate`.
//!
//! Always-include files bypass the budget entirely: they are emitted
//! regardless of cost and do not consume the allowance the other
//! files compete for.
//!
//! The streaming variant commits files in walk order through a
//! bounded window, demoting or dropping the lowest-priority window
//! entries whenever the window no longer fits the remaining budget.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::truncate::TruncateMode;

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Budget strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Skip files that would overflow.
    Drop,
    /// Force overflowing files to structure mode; drop if still over.
    Truncate,
    /// Structure-first pre-pass for large files, then `Truncate`.
    #[default]
    Hybrid,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "truncate" => Ok(Self::Truncate),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown budget strategy '{other}'")),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Drop => "drop",
            Self::Truncate => "truncate",
            Self::Hybrid => "hybrid",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Candidates and allocations
// ---------------------------------------------------------------------------

/// One file as the allocator sees it.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub rel_path: String,
    pub priority: u8,
    pub always_include: bool,
    /// Mode the file is planned to be emitted with, before budgeting.
    pub mode: TruncateMode,
    /// Estimated cost of the planned emission.
    pub full_cost: usize,
    /// Estimated cost in structure mode.
    pub structure_cost: usize,
}

/// Allocator decision for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Emit with the planned mode at the planned cost.
    Full { cost: usize },
    /// Emit demoted to structure mode.
    Structure { cost: usize },
    /// Not emitted.
    Dropped,
}

impl Allocation {
    pub fn cost(&self) -> usize {
        match self {
            Self::Full { cost } | Self::Structure { cost } => *cost,
            Self::Dropped => 0,
        }
    }

    pub fn emitted(&self) -> bool {
        !matches!(self, Self::Dropped)
    }
}

// ---------------------------------------------------------------------------
// Budget report
// ---------------------------------------------------------------------------

/// Deterministic summary of an allocation run, for the diagnostic
/// channel.
#[derive(Debug, Clone, Default)]
pub struct BudgetReport {
    pub budget: Option<usize>,
    /// Total estimated cost of everything emitted, always-include
    /// files counted.
    pub used: usize,
    pub emitted_full: usize,
    pub emitted_structure: usize,
    pub dropped: usize,
    /// Per-file decisions, in input order.
    pub decisions: Vec<(String, Allocation)>,
}

impl BudgetReport {
    pub fn utilization_pct(&self) -> Option<f64> {
        self.budget
            .filter(|&b| b > 0)
            .map(|b| (self.used as f64 / b as f64) * 100.0)
    }

    /// Render the report as diagnostic lines.
    pub fn lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        match self.budget {
            Some(budget) => {
                let pct = self.utilization_pct().unwrap_or(0.0);
                out.push(format!(
                    "budget report: {} of {budget} tokens used ({pct:.1}%)",
                    self.used
                ));
            }
            None => out.push(format!(
                "budget report: no budget, {} tokens estimated",
                self.used
            )),
        }
        out.push(format!(
            "budget report: {} full, {} structured, {} dropped",
            self.emitted_full, self.emitted_structure, self.dropped
        ));
        for (path, allocation) in &self.decisions {
            let verdict = match allocation {
                Allocation::Full { cost } => format!("emitted ({cost} tokens)"),
                Allocation::Structure { cost } => format!("structured ({cost} tokens)"),
                Allocation::Dropped => "dropped".to_string(),
            };
            out.push(format!("budget report: {path}: {verdict}"));
        }
        out
    }

    fn record(&mut self, path: &str, allocation: Allocation) {
        match allocation {
            Allocation::Full { cost } => {
                self.emitted_full += 1;
                self.used += cost;
            }
            Allocation::Structure { cost } => {
                self.emitted_structure += 1;
                self.used += cost;
            }
            Allocation::Dropped => self.dropped += 1,
        }
        self.decisions.push((path.to_string(), allocation));
    }
}

// ---------------------------------------------------------------------------
// Batch allocation
// ---------------------------------------------------------------------------

/// Allocate a fully known candidate list.
///
/// The returned allocations are parallel to the input: batch emission
/// order is the caller's sort order, the allocator only decides
/// membership and mode.
pub fn allocate(
    candidates: &[Candidate],
    budget: Option<usize>,
    strategy: Strategy,
) -> (Vec<Allocation>, BudgetReport) {
    let mut allocations = vec![Allocation::Dropped; candidates.len()];
    let mut report = BudgetReport {
        budget,
        ..BudgetReport::default()
    };

    let Some(budget) = budget else {
        // No budget: everything is emitted with its planned mode.
        for (idx, candidate) in candidates.iter().enumerate() {
            allocations[idx] = Allocation::Full {
                cost: candidate.full_cost,
            };
        }
        for (candidate, allocation) in candidates.iter().zip(&allocations) {
            report.record(&candidate.rel_path, *allocation);
        }
        return (allocations, report);
    };

    // Pre-pass for hybrid: demote files that would eat more than 10%
    // of the budget, when structure mode actually saves something.
    let forced: Vec<bool> = candidates
        .iter()
        .map(|c| {
            strategy == Strategy::Hybrid
                && c.full_cost * 10 > budget
                && c.structure_cost < c.full_cost
        })
        .collect();

    // Priority order: priority descending, input position (the sort
    // key order) as tie-break.
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        candidates[b]
            .priority
            .cmp(&candidates[a].priority)
            .then(a.cmp(&b))
    });

    let mut remaining = budget;
    for idx in order {
        let candidate = &candidates[idx];

        if candidate.always_include {
            // Bypasses the budget; still honors a hybrid demotion.
            allocations[idx] = if forced[idx] {
                Allocation::Structure {
                    cost: candidate.structure_cost,
                }
            } else {
                Allocation::Full {
                    cost: candidate.full_cost,
                }
            };
            continue;
        }

        let planned = if forced[idx] {
            Allocation::Structure {
                cost: candidate.structure_cost,
            }
        } else {
            Allocation::Full {
                cost: candidate.full_cost,
            }
        };

        if planned.cost() <= remaining {
            remaining -= planned.cost();
            allocations[idx] = planned;
            continue;
        }

        // Overflow. Under truncate/hybrid, retry in structure mode.
        if matches!(strategy, Strategy::Truncate | Strategy::Hybrid)
            && candidate.structure_cost <= remaining
        {
            remaining -= candidate.structure_cost;
            allocations[idx] = Allocation::Structure {
                cost: candidate.structure_cost,
            };
            continue;
        }

        allocations[idx] = Allocation::Dropped;
    }

    for (candidate, allocation) in candidates.iter().zip(&allocations) {
        report.record(&candidate.rel_path, *allocation);
    }
    (allocations, report)
}

// ---------------------------------------------------------------------------
// Streaming allocation
// ---------------------------------------------------------------------------

/// Window size of the streaming allocator.
pub const STREAM_WINDOW: usize = 16;

/// Bounded-lookahead allocator for streaming mode.
///
/// Candidates are committed in arrival (walk) order. Before the front
/// of the window is committed, the window is shrunk to fit the
/// remaining budget by demoting or dropping its lowest-priority
/// entries, so a committed file has survived a priority comparison
/// against a full window of successors.
pub struct StreamAllocator {
    budget: Option<usize>,
    strategy: Strategy,
    remaining: usize,
    window: VecDeque<(Candidate, Allocation)>,
    report: BudgetReport,
}

impl StreamAllocator {
    pub fn new(budget: Option<usize>, strategy: Strategy) -> Self {
        Self {
            budget,
            strategy,
            remaining: budget.unwrap_or(usize::MAX),
            window: VecDeque::new(),
            report: BudgetReport {
                budget,
                ..BudgetReport::default()
            },
        }
    }

    /// Add a candidate; returns any allocation committed by the push.
    pub fn push(&mut self, candidate: Candidate) -> Vec<(Candidate, Allocation)> {
        let planned = self.plan(&candidate);
        self.window.push_back((candidate, planned));

        let mut committed = Vec::new();
        while self.window.len() > STREAM_WINDOW {
            committed.push(self.commit_front());
        }
        committed
    }

    /// Drain the window and finish the report.
    pub fn finish(mut self) -> (Vec<(Candidate, Allocation)>, BudgetReport) {
        let mut committed = Vec::new();
        while !self.window.is_empty() {
            committed.push(self.commit_front());
        }
        (committed, self.report)
    }

    fn plan(&self, candidate: &Candidate) -> Allocation {
        if self.budget.is_some()
            && self.strategy == Strategy::Hybrid
            && candidate.full_cost * 10 > self.budget.unwrap_or(0)
            && candidate.structure_cost < candidate.full_cost
        {
            Allocation::Structure {
                cost: candidate.structure_cost,
            }
        } else {
            Allocation::Full {
                cost: candidate.full_cost,
            }
        }
    }

    fn commit_front(&mut self) -> (Candidate, Allocation) {
        if self.budget.is_some() {
            self.shrink_to_fit();
        }

        let (candidate, allocation) = self.window.pop_front().expect("window not empty");
        if allocation.emitted() && !candidate.always_include {
            self.remaining = self.remaining.saturating_sub(allocation.cost());
        }
        self.report.record(&candidate.rel_path, allocation);
        (candidate, allocation)
    }

    /// Demote or drop lowest-priority window entries until the window's
    /// budgeted total fits what remains.
    fn shrink_to_fit(&mut self) {
        loop {
            let total: usize = self
                .window
                .iter()
                .filter(|(c, a)| a.emitted() && !c.always_include)
                .map(|(_, a)| a.cost())
                .sum();
            if total <= self.remaining {
                return;
            }

            // Victim: lowest priority, latest arrival on ties.
            let victim = self
                .window
                .iter()
                .enumerate()
                .filter(|(_, (c, a))| a.emitted() && !c.always_include)
                .min_by_key(|(idx, (c, _))| (c.priority, usize::MAX - idx))
                .map(|(idx, _)| idx);

            let Some(idx) = victim else { return };
            let (candidate, allocation) = &mut self.window[idx];
            let can_demote = matches!(self.strategy, Strategy::Truncate | Strategy::Hybrid)
                && matches!(allocation, Allocation::Full { .. })
                && candidate.structure_cost < allocation.cost();
            *allocation = if can_demote {
                Allocation::Structure {
                    cost: candidate.structure_cost,
                }
            } else {
                Allocation::Dropped
            };
        }
    }
}
