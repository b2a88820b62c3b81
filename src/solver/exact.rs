//! Integer-programming strategy solved with the HiGHS backend.
//!
//! x[d, lab, day, start] = 1 if demand d runs in lab from start that day.
//! The objective maximises placed sessions, so an infeasible week still
//! yields the largest grid and reports the rest as leftovers.

use super::{Outcome, Scheduler};
use crate::config::{FacultyMatch, GeneratorConfig, GroupingMode};
use crate::data::{Day, SessionDemand, TimeSlot};
use crate::demand::group_demands;
use crate::error::{GenerationError, Result};
use crate::grid::{Grid, LabIndex};
use good_lp::{
    Expression, ProblemVariables, Solution, SolverModel, Variable, constraint, default_solver,
    variable,
};
use itertools::Itertools;
use log::{info, trace};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct ExactScheduler {
    grouping: GroupingMode,
    faculty_match: FacultyMatch,
    one_practical_per_day: bool,
}

struct Candidate {
    demand: usize,
    lab: LabIndex,
    day: Day,
    start: TimeSlot,
    var: Variable,
}

impl ExactScheduler {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            grouping: config.grouping,
            faculty_match: config.faculty_match,
            one_practical_per_day: config.one_practical_per_day,
        }
    }

    fn faculty_of<'d>(&self, d: &'d SessionDemand) -> &'d str {
        match self.faculty_match {
            FacultyMatch::Identifier => &d.faculty_id,
            FacultyMatch::DisplayName => &d.faculty_name,
        }
    }
}

/// Groups in key order, so constraint rows come out the same every run.
fn sorted_groups<K: Ord, V>(groups: &HashMap<K, V>) -> Vec<(&K, &V)> {
    groups.iter().sorted_by(|a, b| a.0.cmp(b.0)).collect()
}

fn covers(start: TimeSlot, duration: u32, slot: TimeSlot) -> bool {
    let s = start.index();
    (s..s + duration.max(1) as usize).contains(&slot.index())
}

impl Scheduler for ExactScheduler {
    fn schedule(&self, mut grid: Grid, demands: Vec<SessionDemand>) -> Result<Outcome> {
        let start_time = Instant::now();
        // Atomic groups index into the flat demand list in group order.
        let groups = group_demands(demands, self.grouping);
        let demands: Vec<SessionDemand> =
            groups.iter().flat_map(|g| g.demands.iter().cloned()).collect();
        let mut group_of = Vec::with_capacity(demands.len());
        for (g, group) in groups.iter().enumerate() {
            group_of.extend(std::iter::repeat_n(g, group.len()));
        }

        info!(
            "Setting up ILP model with {} sessions, {} labs and {} slots a week...",
            demands.len(),
            grid.lab_count(),
            Day::ALL.len() * TimeSlot::ALL.len()
        );
        let mut problem = ProblemVariables::new();

        // pre-filter: a session must fit inside its day
        let mut candidates = Vec::new();
        for (d, demand) in demands.iter().enumerate() {
            for lab in 0..grid.lab_count() {
                for day in Day::ALL {
                    for start in TimeSlot::ALL {
                        if start.span(demand.duration).is_some() {
                            let var = problem.add(variable().binary());
                            candidates.push(Candidate {
                                demand: d,
                                lab,
                                day,
                                start,
                                var,
                            });
                        }
                    }
                }
            }
        }
        trace!("Generated {} assignment variables", candidates.len());

        // w[g, day, start]: group g starts at (day, start)
        let mut group_start: HashMap<(usize, Day, TimeSlot), Variable> = HashMap::new();
        if self.grouping == GroupingMode::Atomic {
            for g in 0..groups.len() {
                for day in Day::ALL {
                    for start in TimeSlot::ALL {
                        group_start.insert((g, day, start), problem.add(variable().binary()));
                    }
                }
            }
        }

        // y[year, division, day, start]: the division's practical slot that day
        let divisions: Vec<_> = demands
            .iter()
            .map(|d| (d.year, d.division.as_str()))
            .unique()
            .collect();
        let mut division_start = HashMap::new();
        if self.one_practical_per_day && self.grouping == GroupingMode::PerBatch {
            for &div in &divisions {
                for day in Day::ALL {
                    for start in TimeSlot::ALL {
                        division_start.insert((div, day, start), problem.add(variable().binary()));
                    }
                }
            }
        }

        let objective: Expression = candidates.iter().map(|c| c.var).sum();
        let mut model = problem
            .maximise(objective)
            .using(default_solver)
            .set_option("threads", 1) // limit to 1 thread for reproducibility
            .set_option("random_seed", 1234);

        info!("Adding 'session placed at most once' constraints...");
        for (_, cands) in &candidates.iter().chunk_by(|c| c.demand) {
            let placed: Expression = cands.map(|c| c.var).sum();
            model.add_constraint(constraint!(placed <= 1));
        }

        info!("Adding 'no lab overlap' constraints...");
        let by_lab_day = candidates.iter().into_group_map_by(|c| (c.lab, c.day));
        for (_, cands) in sorted_groups(&by_lab_day) {
            for slot in TimeSlot::ALL {
                let occupied: Expression = cands
                    .iter()
                    .filter(|c| covers(c.start, demands[c.demand].duration, slot))
                    .map(|c| c.var)
                    .sum();
                model.add_constraint(constraint!(occupied <= 1));
            }
        }

        info!("Adding 'no batch overlap' constraints...");
        let by_batch_day = candidates.iter().into_group_map_by(|c| {
            let d = &demands[c.demand];
            (d.year, d.division.as_str(), d.batch, c.day)
        });
        for (_, cands) in sorted_groups(&by_batch_day) {
            for slot in TimeSlot::ALL {
                let busy: Expression = cands
                    .iter()
                    .filter(|c| covers(c.start, demands[c.demand].duration, slot))
                    .map(|c| c.var)
                    .sum();
                model.add_constraint(constraint!(busy <= 1));
            }
        }

        info!("Adding 'no faculty overlap' constraints...");
        match self.grouping {
            GroupingMode::PerBatch => {
                let by_faculty_day = candidates
                    .iter()
                    .into_group_map_by(|c| (self.faculty_of(&demands[c.demand]), c.day));
                for (_, cands) in sorted_groups(&by_faculty_day) {
                    for slot in TimeSlot::ALL {
                        let teaching: Expression = cands
                            .iter()
                            .filter(|c| covers(c.start, demands[c.demand].duration, slot))
                            .map(|c| c.var)
                            .sum();
                        model.add_constraint(constraint!(teaching <= 1));
                    }
                }
            }
            GroupingMode::Atomic => {
                // Siblings of one group count once per faculty.
                let faculty_groups = groups
                    .iter()
                    .enumerate()
                    .flat_map(|(g, group)| {
                        group
                            .demands
                            .iter()
                            .map(move |d| (self.faculty_of(d), g))
                            .unique()
                    })
                    .into_group_map();
                for (_, gs) in sorted_groups(&faculty_groups) {
                    for day in Day::ALL {
                        for slot in TimeSlot::ALL {
                            let teaching: Expression = gs
                                .iter()
                                .flat_map(|&g| {
                                    let duration = groups[g].duration();
                                    TimeSlot::ALL
                                        .into_iter()
                                        .filter(move |&start| covers(start, duration, slot))
                                        .map(move |start| (g, start))
                                })
                                .map(|(g, start)| group_start[&(g, day, start)])
                                .sum();
                            model.add_constraint(constraint!(teaching <= 1));
                        }
                    }
                }
            }
        }

        if self.grouping == GroupingMode::Atomic {
            info!("Adding 'batches of a group start together' constraints...");
            let by_demand_start = candidates
                .iter()
                .into_group_map_by(|c| (c.demand, c.day, c.start));
            for (d, &g) in group_of.iter().enumerate() {
                for day in Day::ALL {
                    for start in TimeSlot::ALL {
                        let placed: Expression = by_demand_start
                            .get(&(d, day, start))
                            .into_iter()
                            .flatten()
                            .map(|c| c.var)
                            .sum();
                        let w = group_start[&(g, day, start)];
                        model.add_constraint(constraint!(placed == w));
                    }
                }
            }
            for g in 0..groups.len() {
                let once: Expression = Day::ALL
                    .into_iter()
                    .cartesian_product(TimeSlot::ALL)
                    .map(|(day, start)| group_start[&(g, day, start)])
                    .sum();
                model.add_constraint(constraint!(once <= 1));
            }
            if self.one_practical_per_day {
                info!("Adding 'one practical per division per day' constraints...");
                for &div in &divisions {
                    for day in Day::ALL {
                        let daily: Expression = groups
                            .iter()
                            .enumerate()
                            .filter(|(_, group)| (group.year, group.division.as_str()) == div)
                            .flat_map(|(g, _)| {
                                TimeSlot::ALL.into_iter().map(move |start| (g, start))
                            })
                            .map(|(g, start)| group_start[&(g, day, start)])
                            .sum();
                        model.add_constraint(constraint!(daily <= 1));
                    }
                }
            }
        } else if self.one_practical_per_day {
            info!("Adding 'one practical slot per division per day' constraints...");
            for c in &candidates {
                let d = &demands[c.demand];
                let x = c.var;
                let y = division_start[&((d.year, d.division.as_str()), c.day, c.start)];
                model.add_constraint(constraint!(x <= y));
            }
            for &div in &divisions {
                for day in Day::ALL {
                    let daily: Expression = TimeSlot::ALL
                        .into_iter()
                        .map(|start| division_start[&(div, day, start)])
                        .sum();
                    model.add_constraint(constraint!(daily <= 1));
                }
            }
        }

        //solve
        info!("Starting ILP solver...");
        let solution = model.solve().map_err(|e| {
            GenerationError::Internal(format!("ILP solver failed: {e}"))
        })?;
        info!("Solution found in {:.2?}", start_time.elapsed());

        let mut chosen: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| solution.value(c.var) > 0.9)
            .collect();
        chosen.sort_by_key(|c| (c.day, c.start, c.lab, c.demand));

        let mut placed = vec![false; demands.len()];
        for c in chosen {
            if grid.place(demands[c.demand].clone(), c.lab, c.day, c.start) {
                placed[c.demand] = true;
            } else {
                return Err(GenerationError::Internal(format!(
                    "ILP solution double-books {} at {} {}",
                    grid.lab_name(c.lab),
                    c.day,
                    c.start
                )));
            }
        }

        let leftovers = demands
            .into_iter()
            .zip(placed)
            .filter(|(_, p)| !p)
            .map(|(d, _)| d)
            .collect();
        let attempts = candidates.len() as u64;
        Ok(Outcome {
            grid,
            leftovers,
            attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Lab, Year};

    fn demand(div: &str, batch: u32, subject: &str, faculty: &str) -> SessionDemand {
        SessionDemand {
            year: Year::SY,
            division: div.into(),
            batch,
            subject: subject.into(),
            subject_full: subject.into(),
            faculty_id: faculty.into(),
            faculty_name: faculty.into(),
            duration: 1,
        }
    }

    #[test]
    fn solves_a_small_week_completely() {
        let grid = Grid::new(&[Lab::new("L1"), Lab::new("L2")]);
        let demands = vec![
            demand("A", 1, "DS", "f1"),
            demand("A", 2, "DS", "f1"),
            demand("B", 1, "DS", "f1"),
            demand("B", 2, "OOP", "f2"),
        ];
        let out = ExactScheduler::new(&GeneratorConfig::default())
            .schedule(grid, demands)
            .unwrap();
        assert_eq!(out.grid.len() + out.leftovers.len(), 4);
        let rules = crate::conflict::Rules::from(&GeneratorConfig::default());
        assert!(crate::validation::audit(&out.grid, rules).is_empty());
    }

    #[test]
    fn same_input_same_grid() {
        let demands = vec![
            demand("A", 1, "DS", "f1"),
            demand("A", 2, "DS", "f1"),
            demand("A", 1, "OOP", "f2"),
            demand("B", 1, "DS", "f1"),
            demand("B", 2, "OOP", "f2"),
        ];
        for config in [
            GeneratorConfig::default(),
            GeneratorConfig::default().with_grouping(GroupingMode::PerBatch),
        ] {
            let solve = || {
                let grid = Grid::new(&[Lab::new("L1"), Lab::new("L2")]);
                ExactScheduler::new(&config)
                    .schedule(grid, demands.clone())
                    .unwrap()
            };
            let (a, b) = (solve(), solve());
            assert_eq!(a.grid.sessions(), b.grid.sessions());
            assert_eq!(a.leftovers, b.leftovers);
        }
    }

    #[test]
    fn overflow_becomes_leftovers() {
        let grid = Grid::new(&[Lab::new("L1")]);
        let demands: Vec<_> = (1..=2).map(|b| demand("A", b, "DS", "f1")).collect();
        let out = ExactScheduler::new(&GeneratorConfig::default())
            .schedule(grid, demands)
            .unwrap();
        assert!(out.grid.is_empty());
        assert_eq!(out.leftovers.len(), 2);
    }
}
