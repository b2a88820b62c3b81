//! Turns workload records into per-batch session demands.
//!
//! A workload row names one faculty teaching one subject to some batches of
//! a division. Each (row, batch) pair becomes a [`SessionDemand`]; rows whose
//! practical hours fall below the configured threshold are lecture-only and
//! produce nothing.

use crate::config::{GeneratorConfig, GroupingMode};
use crate::data::{
    Batch, Division, FacultyId, GenerationInput, SessionDemand, SubjectCode, SubjectRecord, Year,
};
use itertools::Itertools;
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

/// Batches of one (year, division, subject) scheduled as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandGroup {
    pub year: Year,
    pub division: Division,
    pub subject: SubjectCode,
    pub demands: Vec<SessionDemand>,
}

impl DemandGroup {
    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Slots the whole group needs; siblings share the longest duration.
    pub fn duration(&self) -> u32 {
        self.demands.iter().map(|d| d.duration).max().unwrap_or(1)
    }

    fn first_batch(&self) -> Batch {
        self.demands.iter().map(|d| d.batch).min().unwrap_or(0)
    }
}

impl std::fmt::Display for DemandGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.year, self.division, self.subject)
    }
}

/// Builds one demand per (workload record, batch).
pub fn build_demands(input: &GenerationInput, config: &GeneratorConfig) -> Vec<SessionDemand> {
    let faculty_names: HashMap<&str, &str> = input
        .faculties
        .iter()
        .map(|f| (f.id.as_str(), f.name.as_str()))
        .collect();
    let catalog: HashMap<(Year, &str), &SubjectRecord> = input
        .subjects
        .iter()
        .map(|s| ((s.year, s.short_name.trim()), s))
        .collect();
    let batch_counts: HashMap<(Year, &str), u32> = input
        .class_structure
        .iter()
        .map(|c| ((c.year, c.division.trim()), c.batches))
        .collect();

    let mut seen: HashSet<(Year, Division, Batch, SubjectCode)> = HashSet::new();
    let mut demands = Vec::new();

    for w in &input.workloads {
        let subject = w.subject.trim();
        let division = w.division.trim();
        let entry = catalog.get(&(w.year, subject)).copied();

        let practical_hrs = w.practical_hrs.or(entry.map(|s| s.practical_hrs));
        if let Some(hrs) = practical_hrs {
            if hrs < config.min_practical_hours {
                debug!(
                    "Skipping {}-{}-{}: {} practical hrs is below {}",
                    w.year, division, subject, hrs, config.min_practical_hours
                );
                continue;
            }
        }

        let faculty_name = match faculty_names.get(w.faculty_id.as_str()) {
            Some(name) => (*name).to_string(),
            None => {
                warn!(
                    "Faculty '{}' not found; using the identifier as display name",
                    w.faculty_id
                );
                w.faculty_id.clone()
            }
        };

        let batches: Vec<Batch> = if w.batches.is_empty() {
            match batch_counts.get(&(w.year, division)) {
                Some(&n) => (1..=n).collect(),
                None => {
                    warn!(
                        "Workload {}-{}-{} lists no batches and the class structure has no entry for it",
                        w.year, division, subject
                    );
                    Vec::new()
                }
            }
        } else {
            w.batches.clone()
        };

        let subject_full = w
            .subject_full
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or(entry.map(|s| s.name.clone()))
            .unwrap_or_else(|| subject.to_string());
        let duration = entry.map(|s| s.practical_duration).unwrap_or(1).max(1);

        for batch in batches {
            if batch == 0 {
                warn!(
                    "Workload {}-{}-{} lists batch 0; batches are numbered from 1",
                    w.year, division, subject
                );
                continue;
            }
            let key = (w.year, division.to_string(), batch, subject.to_string());
            if !seen.insert(key) {
                warn!(
                    "Duplicate demand {}-{}-B{} {} dropped",
                    w.year, division, batch, subject
                );
                continue;
            }
            demands.push(SessionDemand {
                year: w.year,
                division: division.to_string(),
                batch,
                subject: subject.to_string(),
                subject_full: subject_full.clone(),
                faculty_id: w.faculty_id.clone(),
                faculty_name: faculty_name.clone(),
                duration,
            });
        }
    }

    demands
}

/// Groups demands into scheduling units, sorted by year priority, then
/// division, then subject.
pub fn group_demands(demands: Vec<SessionDemand>, mode: GroupingMode) -> Vec<DemandGroup> {
    let mut groups: Vec<DemandGroup> = match mode {
        GroupingMode::Atomic => demands
            .into_iter()
            .into_group_map_by(|d| (d.year, d.division.clone(), d.subject.clone()))
            .into_iter()
            .map(|((year, division, subject), demands)| DemandGroup {
                year,
                division,
                subject,
                demands,
            })
            .collect(),
        GroupingMode::PerBatch => demands
            .into_iter()
            .map(|d| DemandGroup {
                year: d.year,
                division: d.division.clone(),
                subject: d.subject.clone(),
                demands: vec![d],
            })
            .collect(),
    };
    groups.sort_by(|a, b| priority_key(a).cmp(&priority_key(b)));
    groups
}

fn priority_key(g: &DemandGroup) -> (usize, &str, &str, Batch) {
    (
        g.year.priority(),
        g.division.as_str(),
        g.subject.as_str(),
        g.first_batch(),
    )
}

/// Faculty allowed to take a (year, subject), in faculty-list order.
#[derive(Debug, Clone, Default)]
pub struct Qualifications {
    by_subject: HashMap<(Year, SubjectCode), Vec<(FacultyId, String)>>,
}

impl Qualifications {
    pub fn from_input(input: &GenerationInput) -> Self {
        let assigned: HashSet<(Year, &str, &str)> = input
            .workloads
            .iter()
            .map(|w| (w.year, w.subject.trim(), w.faculty_id.as_str()))
            .collect();
        let mut by_subject: HashMap<(Year, SubjectCode), Vec<(FacultyId, String)>> =
            HashMap::new();
        for &(year, subject, _) in &assigned {
            let qualified = input
                .faculties
                .iter()
                .filter(|f| assigned.contains(&(year, subject, f.id.as_str())))
                .map(|f| (f.id.clone(), f.name.clone()))
                .collect();
            by_subject.insert((year, subject.to_string()), qualified);
        }
        Self { by_subject }
    }

    /// Candidates for `demand`: its own faculty first, then every other
    /// qualified faculty.
    pub fn candidates(&self, demand: &SessionDemand) -> Vec<(FacultyId, String)> {
        let mut out = vec![(demand.faculty_id.clone(), demand.faculty_name.clone())];
        if let Some(list) = self.by_subject.get(&(demand.year, demand.subject.clone())) {
            out.extend(
                list.iter()
                    .filter(|(id, _)| *id != demand.faculty_id)
                    .cloned(),
            );
        }
        out
    }
}
