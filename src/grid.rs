//! The weekly (lab, day, slot) occupancy grid for one generation run.

use crate::data::{Day, Lab, SessionDemand, TimeSlot};
use log::warn;
use std::collections::HashMap;

pub type LabIndex = usize;

const DAYS: usize = Day::ALL.len();
const SLOTS: usize = TimeSlot::ALL.len();

/// A demand bound to a concrete lab, day and start slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedSession {
    pub demand: SessionDemand,
    pub lab: LabIndex,
    pub day: Day,
    pub slot: TimeSlot,
}

impl PlacedSession {
    /// Whether this session occupies `slot` on its day.
    pub fn covers(&self, slot: TimeSlot) -> bool {
        let start = self.slot.index();
        let end = start + self.demand.duration.max(1) as usize;
        (start..end).contains(&slot.index())
    }
}

/// Cells are indexed by (lab, day, slot) into a flat array. Each cell refers
/// to at most one placed session.
#[derive(Debug, Clone)]
pub struct Grid {
    labs: Vec<String>,
    lab_index: HashMap<String, LabIndex>,
    cells: Vec<Option<usize>>,
    sessions: Vec<PlacedSession>,
}

impl Grid {
    /// Creates an empty grid. Labs keep their listing order; repeated names
    /// are dropped.
    pub fn new(labs: &[Lab]) -> Self {
        let mut names = Vec::with_capacity(labs.len());
        let mut lab_index = HashMap::with_capacity(labs.len());
        for lab in labs {
            if lab_index.contains_key(&lab.name) {
                warn!("Duplicate lab '{}' ignored", lab.name);
                continue;
            }
            lab_index.insert(lab.name.clone(), names.len());
            names.push(lab.name.clone());
        }
        Self {
            cells: vec![None; names.len() * DAYS * SLOTS],
            labs: names,
            lab_index,
            sessions: Vec::new(),
        }
    }

    fn cell(lab: LabIndex, day: Day, slot: TimeSlot) -> usize {
        (lab * DAYS + day.index()) * SLOTS + slot.index()
    }

    pub fn lab_count(&self) -> usize {
        self.labs.len()
    }

    pub fn lab_name(&self, lab: LabIndex) -> &str {
        &self.labs[lab]
    }

    pub fn lab_by_name(&self, name: &str) -> Option<LabIndex> {
        self.lab_index.get(name).copied()
    }

    pub fn at(&self, lab: LabIndex, day: Day, slot: TimeSlot) -> Option<&PlacedSession> {
        self.cells[Self::cell(lab, day, slot)].map(|i| &self.sessions[i])
    }

    pub fn is_free(&self, lab: LabIndex, day: Day, slot: TimeSlot) -> bool {
        self.cells[Self::cell(lab, day, slot)].is_none()
    }

    /// Whether `lab` is free for `duration` slots starting at `slot`.
    pub fn is_span_free(&self, lab: LabIndex, day: Day, slot: TimeSlot, duration: u32) -> bool {
        match slot.span(duration) {
            Some(mut span) => span.all(|s| self.is_free(lab, day, s)),
            None => false,
        }
    }

    /// Labs free over the whole span, in listing order.
    pub fn free_labs(&self, day: Day, slot: TimeSlot, duration: u32) -> Vec<LabIndex> {
        (0..self.labs.len())
            .filter(|&lab| self.is_span_free(lab, day, slot, duration))
            .collect()
    }

    /// Sessions occupying (day, slot) across all labs.
    pub fn sessions_at(&self, day: Day, slot: TimeSlot) -> impl Iterator<Item = &PlacedSession> {
        (0..self.labs.len()).filter_map(move |lab| self.at(lab, day, slot))
    }

    /// Sessions starting on `day`, in placement order.
    pub fn sessions_on(&self, day: Day) -> impl Iterator<Item = &PlacedSession> {
        self.sessions.iter().filter(move |s| s.day == day)
    }

    pub fn sessions(&self) -> &[PlacedSession] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Places `demand` in `lab` from `slot` on. Returns `false`, leaving the
    /// grid untouched, if any covered cell is taken or the span overruns
    /// the day.
    pub fn place(&mut self, demand: SessionDemand, lab: LabIndex, day: Day, slot: TimeSlot) -> bool {
        if lab >= self.labs.len() || !self.is_span_free(lab, day, slot, demand.duration) {
            return false;
        }
        let id = self.sessions.len();
        if let Some(span) = slot.span(demand.duration) {
            for s in span {
                self.cells[Self::cell(lab, day, s)] = Some(id);
            }
        }
        self.sessions.push(PlacedSession {
            demand,
            lab,
            day,
            slot,
        });
        true
    }

    /// Undoes the most recent placement.
    pub fn remove_last(&mut self) -> Option<PlacedSession> {
        let session = self.sessions.pop()?;
        if let Some(span) = session.slot.span(session.demand.duration) {
            for s in span {
                self.cells[Self::cell(session.lab, session.day, s)] = None;
            }
        }
        Some(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Year;

    fn demand(batch: u32, duration: u32) -> SessionDemand {
        SessionDemand {
            year: Year::SY,
            division: "A".into(),
            batch,
            subject: "DS".into(),
            subject_full: "Data Structures".into(),
            faculty_id: "f1".into(),
            faculty_name: "AMP".into(),
            duration,
        }
    }

    fn grid(n: usize) -> Grid {
        let labs: Vec<Lab> = (0..n).map(|i| Lab::new(format!("L{i}"))).collect();
        Grid::new(&labs)
    }

    #[test]
    fn duplicate_lab_names_collapse() {
        let g = Grid::new(&[Lab::new("OS Lab"), Lab::new("DB Lab"), Lab::new("OS Lab")]);
        assert_eq!(g.lab_count(), 2);
        assert_eq!(g.lab_by_name("DB Lab"), Some(1));
    }

    #[test]
    fn a_cell_holds_one_session() {
        let mut g = grid(1);
        assert!(g.place(demand(1, 1), 0, Day::Monday, TimeSlot::Morning));
        assert!(!g.place(demand(2, 1), 0, Day::Monday, TimeSlot::Morning));
        assert_eq!(g.len(), 1);
        assert_eq!(g.at(0, Day::Monday, TimeSlot::Morning).unwrap().demand.batch, 1);
    }

    #[test]
    fn multi_slot_sessions_cover_their_span() {
        let mut g = grid(2);
        assert!(g.place(demand(1, 2), 0, Day::Tuesday, TimeSlot::Afternoon));
        assert!(!g.is_free(0, Day::Tuesday, TimeSlot::Evening));
        assert_eq!(g.free_labs(Day::Tuesday, TimeSlot::Morning, 2), vec![1]);
        assert!(!g.place(demand(2, 2), 1, Day::Tuesday, TimeSlot::Evening));
        assert_eq!(g.sessions_at(Day::Tuesday, TimeSlot::Evening).count(), 1);
    }

    #[test]
    fn remove_last_frees_the_cells() {
        let mut g = grid(1);
        g.place(demand(1, 3), 0, Day::Friday, TimeSlot::Morning);
        let undone = g.remove_last().unwrap();
        assert_eq!(undone.demand.batch, 1);
        assert!(g.is_empty());
        assert_eq!(g.free_labs(Day::Friday, TimeSlot::Morning, 3), vec![0]);
        assert!(g.remove_last().is_none());
    }
}
