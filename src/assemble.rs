use crate::config::Strategy;
use crate::data::{
    Day, GenerationOutput, GenerationSummary, LabTimetable, Leftovers, ScheduledSession,
    SessionDemand, TimeSlot, WeekSchedule,
};
use crate::grid::Grid;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Run facts carried into the output alongside the grid.
#[derive(Debug, Clone)]
pub struct RunMeta {
    pub strategy: Strategy,
    pub seed: Option<u64>,
    pub attempts: u64,
    pub generated_at: DateTime<Utc>,
}

/// Builds the per-lab timetables and the leftover report. Every lab lists
/// every day and slot, empty or not; a multi-slot session appears under
/// each slot it covers.
pub fn assemble(grid: &Grid, leftovers: Vec<SessionDemand>, meta: RunMeta) -> GenerationOutput {
    let timetables = (0..grid.lab_count())
        .map(|lab| {
            let schedule: WeekSchedule = Day::ALL
                .iter()
                .map(|&day| {
                    let slots = TimeSlot::ALL
                        .iter()
                        .map(|&slot| {
                            let sessions = grid
                                .at(lab, day, slot)
                                .map(|s| ScheduledSession::from(&s.demand))
                                .into_iter()
                                .collect();
                            (slot, sessions)
                        })
                        .collect();
                    (day, slots)
                })
                .collect();
            LabTimetable {
                lab_name: grid.lab_name(lab).to_string(),
                schedule,
                generated_at: meta.generated_at,
            }
        })
        .collect();

    let placed = grid.len();
    let leftover = leftovers.len();
    GenerationOutput {
        timetables,
        leftovers: group_leftovers(leftovers),
        summary: GenerationSummary {
            strategy: meta.strategy,
            total_demands: placed + leftover,
            placed,
            leftover,
            seed: meta.seed,
            attempts: meta.attempts,
        },
        generated_at: meta.generated_at,
    }
}

/// Groups unplaced demands by year, division and subject.
pub fn group_leftovers(leftovers: Vec<SessionDemand>) -> Leftovers {
    let mut grouped: Leftovers = BTreeMap::new();
    for d in leftovers {
        grouped
            .entry(d.year)
            .or_default()
            .entry(d.division.clone())
            .or_default()
            .entry(d.subject.clone())
            .or_default()
            .push(d);
    }
    grouped
}
