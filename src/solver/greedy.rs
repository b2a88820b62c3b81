//! Single-pass priority sweep.
//!
//! Days are visited in weekly order and slots in daily order. At each
//! (day, slot) the pending groups are tried by priority: final year first,
//! then division, then subject. A group is placed only when every one of
//! its batches fits, each in its own lab, and is otherwise retried at the
//! next slot. Whatever is still pending after Friday's last slot is left
//! over. Runtime is O(days * slots * groups).

use super::{Outcome, Scheduler, shuffle_within_years};
use crate::config::{GeneratorConfig, GroupingMode};
use crate::conflict::{Conflict, Rules, check_people};
use crate::data::{Day, Division, SessionDemand, TimeSlot, Year};
use crate::demand::{DemandGroup, group_demands};
use crate::error::{GenerationError, Result};
use crate::grid::{Grid, LabIndex};
use log::{debug, info, trace, warn};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    DivisionDone,
    NotEnoughLabs { free: usize, needed: usize },
    Conflict(Conflict),
}

#[derive(Debug, Clone)]
pub struct GreedyScheduler {
    rules: Rules,
    grouping: GroupingMode,
    seed: Option<u64>,
}

impl GreedyScheduler {
    pub fn new(config: &GeneratorConfig) -> Self {
        Self {
            rules: Rules::from(config),
            grouping: config.grouping,
            seed: config.shuffle_seed,
        }
    }

    /// Labs the group would take at (day, slot), or why it has to wait.
    fn fit(
        &self,
        grid: &Grid,
        group: &DemandGroup,
        day: Day,
        slot: TimeSlot,
        scheduled_today: &HashMap<(Year, Division), TimeSlot>,
    ) -> std::result::Result<Vec<LabIndex>, Skip> {
        if self.rules.one_practical_per_day {
            // Single batches of one division may still share the slot it
            // already uses today.
            let taken = scheduled_today.get(&(group.year, group.division.clone()));
            let blocked = match (taken, self.grouping) {
                (None, _) => false,
                (Some(_), GroupingMode::Atomic) => true,
                (Some(&used), GroupingMode::PerBatch) => used != slot,
            };
            if blocked {
                return Err(Skip::DivisionDone);
            }
        }

        let duration = group.duration();
        let span: Vec<TimeSlot> = match slot.span(duration) {
            Some(span) => span.collect(),
            None => return Err(Skip::Conflict(Conflict::OutOfDay)),
        };

        let mut free = grid.free_labs(day, slot, duration);
        if free.len() < group.len() {
            return Err(Skip::NotEnoughLabs {
                free: free.len(),
                needed: group.len(),
            });
        }

        // Checked against sessions already on the grid; siblings sharing a
        // faculty form one supervised practical.
        for demand in &group.demands {
            if let Some(conflict) = check_people(grid, demand, day, &span, self.rules) {
                return Err(Skip::Conflict(conflict));
            }
        }

        free.truncate(group.len());
        Ok(free)
    }
}

impl Scheduler for GreedyScheduler {
    fn schedule(&self, mut grid: Grid, demands: Vec<SessionDemand>) -> Result<Outcome> {
        let mut pending = group_demands(demands, self.grouping);
        shuffle_within_years(&mut pending, self.seed, |g| g.year);
        info!(
            "Greedy sweep over {} groups, {} labs",
            pending.len(),
            grid.lab_count()
        );

        let mut attempts = 0u64;
        for day in Day::ALL {
            let mut scheduled_today: HashMap<(Year, Division), TimeSlot> = HashMap::new();
            for slot in TimeSlot::ALL {
                let mut i = 0;
                while i < pending.len() {
                    attempts += 1;
                    let labs = match self.fit(&grid, &pending[i], day, slot, &scheduled_today) {
                        Ok(labs) => labs,
                        Err(Skip::DivisionDone) => {
                            i += 1;
                            continue;
                        }
                        Err(reason) => {
                            debug!("Skipping {} at {} {}: {:?}", pending[i], day, slot, reason);
                            i += 1;
                            continue;
                        }
                    };

                    let group = pending.remove(i);
                    scheduled_today.insert((group.year, group.division.clone()), slot);
                    for (demand, lab) in group.demands.into_iter().zip(labs) {
                        trace!(
                            "Placed {} in {} at {} {} by {}",
                            demand,
                            grid.lab_name(lab),
                            day,
                            slot,
                            demand.faculty_name
                        );
                        if !grid.place(demand, lab, day, slot) {
                            return Err(GenerationError::Internal(format!(
                                "lab {} reported free at {day} {slot} but refused a session",
                                grid.lab_name(lab)
                            )));
                        }
                    }
                }
            }
        }

        let leftovers: Vec<SessionDemand> =
            pending.into_iter().flat_map(|g| g.demands).collect();
        if !leftovers.is_empty() {
            warn!(
                "Leftover (unscheduled) sessions exist. Total: {}",
                leftovers.len()
            );
        }

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
    use crate::config::FacultyMatch;
    use crate::data::Lab;

    fn demand(year: Year, div: &str, batch: u32, subject: &str, faculty: &str) -> SessionDemand {
        SessionDemand {
            year,
            division: div.into(),
            batch,
            subject: subject.into(),
            subject_full: subject.into(),
            faculty_id: faculty.into(),
            faculty_name: faculty.to_uppercase(),
            duration: 1,
        }
    }

    fn labs(n: usize) -> Grid {
        let labs: Vec<Lab> = (1..=n).map(|i| Lab::new(format!("Lab {i}"))).collect();
        Grid::new(&labs)
    }

    fn where_is(out: &Outcome, subject: &str, batch: u32) -> (String, Day, TimeSlot) {
        let s = out
            .grid
            .sessions()
            .iter()
            .find(|s| s.demand.subject == subject && s.demand.batch == batch)
            .unwrap();
        (out.grid.lab_name(s.lab).to_string(), s.day, s.slot)
    }

    #[test]
    fn sibling_batches_share_a_slot_in_distinct_labs() {
        let demands = vec![
            demand(Year::SY, "A", 1, "DS", "f1"),
            demand(Year::SY, "A", 2, "DS", "f1"),
        ];
        let out = GreedyScheduler::new(&GeneratorConfig::default())
            .schedule(labs(3), demands)
            .unwrap();
        assert_eq!(where_is(&out, "DS", 1), ("Lab 1".into(), Day::Monday, TimeSlot::Morning));
        assert_eq!(where_is(&out, "DS", 2), ("Lab 2".into(), Day::Monday, TimeSlot::Morning));
        assert!(out.leftovers.is_empty());
    }

    #[test]
    fn final_year_claims_labs_first() {
        let demands = vec![
            demand(Year::SY, "A", 1, "DS", "f1"),
            demand(Year::BE, "A", 1, "ML", "f2"),
        ];
        let out = GreedyScheduler::new(&GeneratorConfig::default())
            .schedule(labs(1), demands)
            .unwrap();
        assert_eq!(where_is(&out, "ML", 1).2, TimeSlot::Morning);
        assert_eq!(where_is(&out, "DS", 1).2, TimeSlot::Afternoon);
    }

    #[test]
    fn a_division_gets_one_practical_per_day() {
        let demands = vec![
            demand(Year::TY, "A", 1, "CN", "f1"),
            demand(Year::TY, "A", 1, "OS", "f2"),
        ];
        let out = GreedyScheduler::new(&GeneratorConfig::default())
            .schedule(labs(2), demands)
            .unwrap();
        assert_eq!(where_is(&out, "CN", 1).1, Day::Monday);
        assert_eq!(where_is(&out, "OS", 1).1, Day::Tuesday);
    }

    #[test]
    fn relaxing_the_daily_rule_uses_later_slots() {
        let demands = vec![
            demand(Year::TY, "A", 1, "CN", "f1"),
            demand(Year::TY, "A", 1, "OS", "f2"),
        ];
        let config = GeneratorConfig {
            one_practical_per_day: false,
            ..GeneratorConfig::default()
        };
        let out = GreedyScheduler::new(&config).schedule(labs(2), demands).unwrap();
        assert_eq!(where_is(&out, "OS", 1), ("Lab 1".into(), Day::Monday, TimeSlot::Afternoon));
    }

    #[test]
    fn oversized_group_is_left_over_whole() {
        let demands: Vec<_> = (1..=4).map(|b| demand(Year::SY, "A", b, "DS", "f1")).collect();
        let out = GreedyScheduler::new(&GeneratorConfig::default())
            .schedule(labs(3), demands)
            .unwrap();
        assert!(out.grid.is_empty());
        assert_eq!(out.leftovers.len(), 4);
    }

    #[test]
    fn per_batch_mode_splits_an_oversized_group() {
        let demands: Vec<_> = (1..=4)
            .map(|b| demand(Year::SY, "A", b, "DS", &format!("f{b}")))
            .collect();
        let config = GeneratorConfig::default().with_grouping(GroupingMode::PerBatch);
        let out = GreedyScheduler::new(&config).schedule(labs(3), demands).unwrap();
        assert!(out.leftovers.is_empty());
        assert_eq!(where_is(&out, "DS", 4).1, Day::Tuesday);
    }

    #[test]
    fn namesakes_collide_only_in_display_name_mode() {
        let mut a = demand(Year::SY, "A", 1, "DS", "f1");
        let mut b = demand(Year::SY, "B", 1, "OOP", "f2");
        a.faculty_name = "Patil".into();
        b.faculty_name = "Patil".into();

        let by_id = GreedyScheduler::new(&GeneratorConfig::default())
            .schedule(labs(2), vec![a.clone(), b.clone()])
            .unwrap();
        assert_eq!(where_is(&by_id, "OOP", 1).2, TimeSlot::Morning);

        let config = GeneratorConfig::default().with_faculty_match(FacultyMatch::DisplayName);
        let by_name = GreedyScheduler::new(&config).schedule(labs(2), vec![a, b]).unwrap();
        assert_eq!(where_is(&by_name, "OOP", 1).2, TimeSlot::Afternoon);
    }
}
