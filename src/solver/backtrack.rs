//! Exhaustive depth-first search over individual batch demands.
//!
//! Each depth of the search places one demand. Candidates are enumerated
//! day, then slot, then lab, then qualified faculty; the first valid one is
//! taken and the search descends. When a depth runs out of candidates the
//! previous placement is undone and its depth resumes where it stopped.
//!
//! The search is complete: it either places every demand or proves there
//! is no assignment. The worst case is exponential in the number of
//! demands, so every expansion checks an attempt budget, an optional
//! deadline and an optional [`CancelToken`].

use super::{CancelToken, Outcome, Scheduler, shuffle_within_years};
use crate::config::GeneratorConfig;
use crate::conflict::{Rules, check_placement};
use crate::data::{Day, SessionDemand, TimeSlot};
use crate::demand::Qualifications;
use crate::error::{AbortReason, GenerationError, Result};
use crate::grid::Grid;
use log::{debug, info};
use std::time::{Duration, Instant};

const SLOTS: usize = TimeSlot::ALL.len();

#[derive(Debug, Clone)]
pub struct BacktrackingScheduler {
    rules: Rules,
    seed: Option<u64>,
    qualifications: Qualifications,
    max_attempts: u64,
    timeout: Option<Duration>,
    cancel: Option<CancelToken>,
}

impl BacktrackingScheduler {
    pub fn new(config: &GeneratorConfig, qualifications: Qualifications) -> Self {
        Self {
            rules: Rules::from(config),
            seed: config.shuffle_seed,
            qualifications,
            max_attempts: config.max_attempts,
            timeout: config.timeout(),
            cancel: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn check_budget(&self, attempts: u64, deadline: Option<Instant>) -> Result<()> {
        let reason = if attempts >= self.max_attempts {
            Some(AbortReason::AttemptLimit)
        } else if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            Some(AbortReason::Cancelled)
        } else if deadline.is_some_and(|d| Instant::now() >= d) {
            Some(AbortReason::Timeout)
        } else {
            None
        };
        match reason {
            Some(reason) => Err(GenerationError::SearchAborted { reason, attempts }),
            None => Ok(()),
        }
    }

    /// One copy of the demand per qualified faculty, in candidate order.
    fn variants(&self, demand: &SessionDemand) -> Vec<SessionDemand> {
        self.qualifications
            .candidates(demand)
            .into_iter()
            .map(|(id, name)| SessionDemand {
                faculty_id: id,
                faculty_name: name,
                ..demand.clone()
            })
            .collect()
    }
}

/// Decodes a candidate index into (day, slot, lab, faculty variant).
fn decode(cursor: usize, labs: usize, faculties: usize) -> (Day, TimeSlot, usize, usize) {
    let faculty = cursor % faculties;
    let rest = cursor / faculties;
    let lab = rest % labs;
    let rest = rest / labs;
    let slot = TimeSlot::ALL[rest % SLOTS];
    let day = Day::ALL[rest / SLOTS];
    (day, slot, lab, faculty)
}

impl Scheduler for BacktrackingScheduler {
    fn schedule(&self, mut grid: Grid, mut demands: Vec<SessionDemand>) -> Result<Outcome> {
        demands.sort_by(|a, b| {
            (a.year.priority(), &a.division, &a.subject, a.batch)
                .cmp(&(b.year.priority(), &b.division, &b.subject, b.batch))
        });
        shuffle_within_years(&mut demands, self.seed, |d| d.year);

        let total = demands.len();
        let labs = grid.lab_count();
        let variants: Vec<Vec<SessionDemand>> = demands.iter().map(|d| self.variants(d)).collect();
        info!(
            "Backtracking over {} demands, {} labs, budget {} attempts",
            total, labs, self.max_attempts
        );

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut attempts = 0u64;
        let mut deepest = 0usize;
        // cursors[i] is the next candidate to try for demands[i].
        let mut cursors: Vec<usize> = vec![0];

        while cursors.len() <= total {
            self.check_budget(attempts, deadline)?;
            let depth = cursors.len() - 1;
            let options = &variants[depth];
            let space = Day::ALL.len() * SLOTS * labs * options.len();

            let mut placed = false;
            while cursors[depth] < space {
                if attempts >= self.max_attempts {
                    break;
                }
                let (day, slot, lab, faculty) = decode(cursors[depth], labs, options.len());
                cursors[depth] += 1;
                attempts += 1;

                let candidate = &options[faculty];
                if check_placement(&grid, candidate, lab, day, slot, self.rules).is_none() {
                    placed = grid.place(candidate.clone(), lab, day, slot);
                    if placed {
                        break;
                    }
                }
            }

            if placed {
                deepest = deepest.max(cursors.len());
                cursors.push(0);
            } else if cursors[depth] < space {
                // Budget ran out mid-level; the next loop turn reports it.
                continue;
            } else {
                cursors.pop();
                if cursors.is_empty() {
                    return Err(GenerationError::Infeasible {
                        placed: deepest,
                        total,
                    });
                }
                if let Some(undone) = grid.remove_last() {
                    debug!("Backtracking: undo {} at {} {}", undone.demand, undone.day, undone.slot);
                }
            }
        }

        info!("All {} demands placed after {} attempts", total, attempts);
        Ok(Outcome {
            grid,
            leftovers: Vec::new(),
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        Faculty, GenerationInput, Lab, PracticalType, SubjectRecord, WorkloadRecord, Year,
    };
    use crate::demand::build_demands;

    fn input(labs: usize, workloads: Vec<WorkloadRecord>) -> GenerationInput {
        GenerationInput {
            labs: (1..=labs).map(|i| Lab::new(format!("Lab {i}"))).collect(),
            faculties: vec![Faculty::new("f1", "AMP"), Faculty::new("f2", "RKS")],
            workloads,
            class_structure: Vec::new(),
            subjects: Vec::new(),
        }
    }

    fn run(inp: &GenerationInput, config: &GeneratorConfig) -> Result<Outcome> {
        let demands = build_demands(inp, config);
        BacktrackingScheduler::new(config, Qualifications::from_input(inp))
            .schedule(Grid::new(&inp.labs), demands)
    }

    #[test]
    fn decode_walks_faculty_then_lab_then_slot_then_day() {
        assert_eq!(decode(0, 2, 2), (Day::Monday, TimeSlot::Morning, 0, 0));
        assert_eq!(decode(1, 2, 2), (Day::Monday, TimeSlot::Morning, 0, 1));
        assert_eq!(decode(2, 2, 2), (Day::Monday, TimeSlot::Morning, 1, 0));
        assert_eq!(decode(4, 2, 2), (Day::Monday, TimeSlot::Afternoon, 0, 0));
        assert_eq!(decode(12, 2, 2), (Day::Tuesday, TimeSlot::Morning, 0, 0));
    }

    #[test]
    fn places_every_batch() {
        let inp = input(
            1,
            vec![WorkloadRecord::new("f1", Year::SY, "A", "DS", vec![1, 2, 3])],
        );
        let out = run(&inp, &GeneratorConfig::default()).unwrap();
        assert_eq!(out.grid.len(), 3);
        assert!(out.leftovers.is_empty());
        let days: Vec<Day> = out.grid.sessions().iter().map(|s| s.day).collect();
        assert_eq!(days, vec![Day::Monday, Day::Tuesday, Day::Wednesday]);
    }

    #[test]
    fn a_qualified_colleague_takes_over_a_busy_slot() {
        // f1 and f2 both teach SY DS; the two batches run side by side.
        let inp = input(
            2,
            vec![
                WorkloadRecord::new("f1", Year::SY, "A", "DS", vec![1, 2]),
                WorkloadRecord::new("f2", Year::SY, "B", "DS", vec![1]),
            ],
        );
        let out = run(&inp, &GeneratorConfig::default()).unwrap();
        let first_two: Vec<(&str, Day)> = out.grid.sessions()[..2]
            .iter()
            .map(|s| (s.demand.faculty_id.as_str(), s.day))
            .collect();
        assert_eq!(first_two, vec![("f1", Day::Monday), ("f2", Day::Monday)]);
    }

    #[test]
    fn exhausted_search_is_a_failure() {
        // Full-day practicals in a single lab: six batches, five days.
        let mut inp = input(
            1,
            vec![WorkloadRecord::new("f1", Year::SY, "A", "DS", (1..=6).collect())],
        );
        inp.subjects.push(SubjectRecord {
            year: Year::SY,
            short_name: "DS".into(),
            name: "Data Structures".into(),
            practical_hrs: 2,
            practical_duration: 3,
            practical_type: PracticalType::SpecificLab,
        });
        match run(&inp, &GeneratorConfig::default()) {
            Err(GenerationError::Infeasible { placed, total }) => {
                assert_eq!(total, 6);
                assert_eq!(placed, 5);
            }
            other => panic!("expected infeasible, got {other:?}"),
        }
    }

    #[test]
    fn attempt_budget_aborts_the_search() {
        let config = GeneratorConfig {
            max_attempts: 10,
            ..GeneratorConfig::default()
        };
        let inp = input(
            1,
            vec![WorkloadRecord::new("f1", Year::SY, "A", "DS", (1..=6).collect())],
        );
        match run(&inp, &config) {
            Err(GenerationError::SearchAborted { reason, attempts }) => {
                assert_eq!(reason, AbortReason::AttemptLimit);
                assert_eq!(attempts, 10);
            }
            other => panic!("expected abort, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_search_stops_immediately() {
        let inp = input(1, vec![WorkloadRecord::new("f1", Year::SY, "A", "DS", vec![1])]);
        let config = GeneratorConfig::default();
        let token = CancelToken::new();
        token.cancel();
        let err = BacktrackingScheduler::new(&config, Qualifications::from_input(&inp))
            .with_cancel_token(token)
            .schedule(Grid::new(&inp.labs), build_demands(&inp, &config))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerationError::SearchAborted {
                reason: AbortReason::Cancelled,
                attempts: 0
            }
        ));
    }

    #[test]
    fn expired_deadline_stops_the_search() {
        let config = GeneratorConfig {
            timeout_ms: Some(0),
            ..GeneratorConfig::default()
        };
        let inp = input(1, vec![WorkloadRecord::new("f1", Year::SY, "A", "DS", vec![1])]);
        match run(&inp, &config) {
            Err(GenerationError::SearchAborted { reason, attempts }) => {
                assert_eq!(reason, AbortReason::Timeout);
                assert_eq!(attempts, 0);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
