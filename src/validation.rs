//! Post-run audit of the hard constraints on a filled grid.
//!
//! Strategies enforce these while placing; the audit recomputes them from
//! scratch so a strategy bug surfaces as an error instead of a bad
//! timetable:
//! - No (lab, day, slot) cell holds two sessions
//! - No faculty runs two practicals in one (day, slot)
//! - No batch attends two practicals in one (day, slot)
//! - No division uses two different slots on one day (when enforced)
//!
//! Sibling batches of one subject starting together under the same
//! faculty count as one supervised practical.

use crate::config::FacultyMatch;
use crate::conflict::Rules;
use crate::data::{Batch, Day, TimeSlot, Year};
use crate::grid::{Grid, LabIndex, PlacedSession};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViolationKind {
    DoubleBookedLab,
    FacultyClash,
    BatchClash,
    DivisionSplitDay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

fn covered(s: &PlacedSession) -> impl Iterator<Item = TimeSlot> + '_ {
    TimeSlot::ALL.into_iter().filter(|&slot| s.covers(slot))
}

type PracticalKey<'a> = (Year, &'a str, &'a str, TimeSlot);

fn practical(s: &PlacedSession) -> PracticalKey<'_> {
    (
        s.demand.year,
        s.demand.division.as_str(),
        s.demand.subject.as_str(),
        s.slot,
    )
}

/// Checks every hard constraint; an empty result means the grid is sound.
pub fn audit(grid: &Grid, rules: Rules) -> Vec<Violation> {
    let mut errors = Vec::new();

    let mut cells: HashSet<(LabIndex, Day, TimeSlot)> = HashSet::new();
    let mut faculty: HashMap<(Day, TimeSlot, &str), PracticalKey<'_>> = HashMap::new();
    let mut batches: HashSet<(Day, TimeSlot, Year, &str, Batch)> = HashSet::new();
    let mut division_slots: HashMap<(Day, Year, &str), HashSet<TimeSlot>> = HashMap::new();

    for s in grid.sessions() {
        let d = &s.demand;
        let who = match rules.faculty_match {
            FacultyMatch::Identifier => d.faculty_id.as_str(),
            FacultyMatch::DisplayName => d.faculty_name.as_str(),
        };

        for slot in covered(s) {
            if !cells.insert((s.lab, s.day, slot)) {
                errors.push(Violation::new(
                    ViolationKind::DoubleBookedLab,
                    format!("{} is booked twice at {} {}", grid.lab_name(s.lab), s.day, slot),
                ));
            }

            match faculty.get(&(s.day, slot, who)) {
                Some(&owner) if owner != practical(s) => errors.push(Violation::new(
                    ViolationKind::FacultyClash,
                    format!("{} teaches two practicals at {} {}", who, s.day, slot),
                )),
                Some(_) => {}
                None => {
                    faculty.insert((s.day, slot, who), practical(s));
                }
            }

            if !batches.insert((s.day, slot, d.year, d.division.as_str(), d.batch)) {
                errors.push(Violation::new(
                    ViolationKind::BatchClash,
                    format!("{} has two practicals at {} {}", d, s.day, slot),
                ));
            }
        }

        division_slots
            .entry((s.day, d.year, d.division.as_str()))
            .or_default()
            .insert(s.slot);
    }

    if rules.one_practical_per_day {
        let mut split: Vec<(Day, Year, &str)> = division_slots
            .iter()
            .filter(|(_, slots)| slots.len() > 1)
            .map(|(&key, _)| key)
            .collect();
        split.sort();
        for (day, year, division) in split {
            errors.push(Violation::new(
                ViolationKind::DivisionSplitDay,
                format!("{year}-{division} has practicals in several slots on {day}"),
            ));
        }
    }

    errors
}
