//! Side-effect free placement checks against the current grid.

use crate::config::{FacultyMatch, GeneratorConfig};
use crate::data::{Batch, Day, SessionDemand, TimeSlot, Year};
use crate::grid::{Grid, LabIndex, PlacedSession};
use std::fmt;

/// How a faculty member is recognised across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacultyKey<'a> {
    Id(&'a str),
    Name(&'a str),
}

impl<'a> FacultyKey<'a> {
    pub fn of(demand: &'a SessionDemand, mode: FacultyMatch) -> Self {
        match mode {
            FacultyMatch::Identifier => FacultyKey::Id(&demand.faculty_id),
            FacultyMatch::DisplayName => FacultyKey::Name(&demand.faculty_name),
        }
    }

    fn matches(&self, session: &PlacedSession) -> bool {
        match *self {
            FacultyKey::Id(id) => session.demand.faculty_id == id,
            FacultyKey::Name(name) => session.demand.faculty_name == name,
        }
    }
}

/// Hard constraints in force for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rules {
    pub faculty_match: FacultyMatch,
    pub one_practical_per_day: bool,
}

impl From<&GeneratorConfig> for Rules {
    fn from(config: &GeneratorConfig) -> Self {
        Self {
            faculty_match: config.faculty_match,
            one_practical_per_day: config.one_practical_per_day,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conflict {
    /// The session would run past the last slot of the day.
    OutOfDay,
    Lab,
    Faculty,
    Batch,
    /// The division already attends a practical in another slot today.
    Division,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Conflict::OutOfDay => "runs past the end of the day",
            Conflict::Lab => "lab occupied",
            Conflict::Faculty => "faculty busy",
            Conflict::Batch => "batch already in a practical",
            Conflict::Division => "division already has a practical today",
        };
        f.write_str(what)
    }
}

pub fn lab_occupied(grid: &Grid, day: Day, slot: TimeSlot, lab: LabIndex) -> bool {
    !grid.is_free(lab, day, slot)
}

pub fn faculty_busy(grid: &Grid, day: Day, slot: TimeSlot, faculty: FacultyKey<'_>) -> bool {
    grid.sessions_at(day, slot).any(|s| faculty.matches(s))
}

pub fn division_has_session_today(grid: &Grid, day: Day, year: Year, division: &str) -> bool {
    grid.sessions_on(day)
        .any(|s| s.demand.year == year && s.demand.division == division)
}

/// Whether the division has a session today that starts in a slot other
/// than `slot`. Sibling batches sharing the slot are allowed.
pub fn division_busy_other_slot(
    grid: &Grid,
    day: Day,
    slot: TimeSlot,
    year: Year,
    division: &str,
) -> bool {
    grid.sessions_on(day).any(|s| {
        s.demand.year == year && s.demand.division == division && s.slot != slot
    })
}

pub fn batch_has_session(
    grid: &Grid,
    day: Day,
    slot: TimeSlot,
    year: Year,
    division: &str,
    batch: Batch,
) -> bool {
    grid.sessions_at(day, slot).any(|s| {
        s.demand.year == year && s.demand.division == division && s.demand.batch == batch
    })
}

/// First conflict that placing `demand` in `lab` at (day, slot) would
/// cause, or `None` if the placement is valid.
pub fn check_placement(
    grid: &Grid,
    demand: &SessionDemand,
    lab: LabIndex,
    day: Day,
    slot: TimeSlot,
    rules: Rules,
) -> Option<Conflict> {
    let span: Vec<TimeSlot> = match slot.span(demand.duration) {
        Some(span) => span.collect(),
        None => return Some(Conflict::OutOfDay),
    };
    if span.iter().any(|&s| lab_occupied(grid, day, s, lab)) {
        return Some(Conflict::Lab);
    }
    if let Some(conflict) = check_people(grid, demand, day, &span, rules) {
        return Some(conflict);
    }
    None
}

/// Faculty, batch and division checks, independent of the lab.
pub fn check_people(
    grid: &Grid,
    demand: &SessionDemand,
    day: Day,
    span: &[TimeSlot],
    rules: Rules,
) -> Option<Conflict> {
    let faculty = FacultyKey::of(demand, rules.faculty_match);
    if span.iter().any(|&s| faculty_busy(grid, day, s, faculty)) {
        return Some(Conflict::Faculty);
    }
    if span.iter().any(|&s| {
        batch_has_session(grid, day, s, demand.year, &demand.division, demand.batch)
    }) {
        return Some(Conflict::Batch);
    }
    if rules.one_practical_per_day {
        if let Some(&start) = span.first() {
            if division_busy_other_slot(grid, day, start, demand.year, &demand.division) {
                return Some(Conflict::Division);
            }
        }
    }
    None
}
