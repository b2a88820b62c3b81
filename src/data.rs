use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Type aliases for clarity
pub type FacultyId = String;
pub type Division = String;
pub type SubjectCode = String;
pub type Batch = u32;

/// Academic year sharing the common lab pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Year {
    #[serde(alias = "sy")]
    SY,
    #[serde(alias = "ty")]
    TY,
    #[serde(alias = "be")]
    BE,
}

impl Year {
    /// Years in scheduling priority order: final year first.
    pub const PRIORITY: [Year; 3] = [Year::BE, Year::TY, Year::SY];

    pub fn priority(self) -> usize {
        match self {
            Year::BE => 0,
            Year::TY => 1,
            Year::SY => 2,
        }
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Year::SY => "SY",
            Year::TY => "TY",
            Year::BE => "BE",
        };
        f.write_str(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Day {
    pub const ALL: [Day; 5] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// One of the fixed daily practical windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(rename = "11:15")]
    Morning,
    #[serde(rename = "14:15")]
    Afternoon,
    #[serde(rename = "16:20")]
    Evening,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 3] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeSlot::Morning => "11:15",
            TimeSlot::Afternoon => "14:15",
            TimeSlot::Evening => "16:20",
        }
    }

    /// Slots covered by a session of `duration` starting here, or `None` if
    /// it would run past the last slot of the day.
    pub fn span(self, duration: u32) -> Option<impl Iterator<Item = TimeSlot>> {
        let start = self.index();
        let end = start + duration.max(1) as usize;
        if end > TimeSlot::ALL.len() {
            return None;
        }
        Some(TimeSlot::ALL.into_iter().skip(start).take(end - start))
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A physical lab. Only the name matters to the scheduler.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lab {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
}

impl Lab {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            short_name: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faculty {
    pub id: FacultyId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
}

impl Faculty {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            short_name: None,
        }
    }
}

fn default_division() -> Division {
    "A".to_string()
}

/// A faculty's teaching allocation for one subject and division.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadRecord {
    pub faculty_id: FacultyId,
    pub year: Year,
    #[serde(default = "default_division")]
    pub division: Division,
    pub subject: SubjectCode,
    #[serde(default)]
    pub subject_full: Option<String>,
    #[serde(default)]
    pub batches: Vec<Batch>,
    #[serde(default)]
    pub theory_hrs: Option<u32>,
    #[serde(default)]
    pub practical_hrs: Option<u32>,
}

impl WorkloadRecord {
    pub fn new(
        faculty_id: impl Into<String>,
        year: Year,
        division: impl Into<String>,
        subject: impl Into<String>,
        batches: Vec<Batch>,
    ) -> Self {
        Self {
            faculty_id: faculty_id.into(),
            year,
            division: division.into(),
            subject: subject.into(),
            subject_full: None,
            batches,
            theory_hrs: None,
            practical_hrs: Some(2),
        }
    }

    pub fn with_practical_hrs(mut self, hrs: Option<u32>) -> Self {
        self.practical_hrs = hrs;
        self
    }
}

/// Number of batches a division is split into for practicals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassStructureEntry {
    pub year: Year,
    pub division: Division,
    pub batches: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum PracticalType {
    #[default]
    #[serde(rename = "Specific Lab")]
    SpecificLab,
    #[serde(rename = "Common Lab")]
    CommonLab,
}

fn default_duration() -> u32 {
    1
}

/// Subject catalog entry for one year.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub year: Year,
    pub short_name: SubjectCode,
    pub name: String,
    #[serde(default)]
    pub practical_hrs: u32,
    #[serde(default = "default_duration")]
    pub practical_duration: u32,
    #[serde(default)]
    pub practical_type: PracticalType,
}

/// One batch's need for one weekly practical session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDemand {
    pub year: Year,
    pub division: Division,
    pub batch: Batch,
    pub subject: SubjectCode,
    pub subject_full: String,
    pub faculty_id: FacultyId,
    pub faculty_name: String,
    /// Consecutive slots required.
    pub duration: u32,
}

impl fmt::Display for SessionDemand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-B{} {}",
            self.year, self.division, self.batch, self.subject
        )
    }
}

/// A session as it appears in a lab's weekly schedule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledSession {
    pub year: Year,
    pub division: Division,
    pub batch: Batch,
    pub subject: SubjectCode,
    pub subject_full: String,
    pub faculty_id: FacultyId,
    pub faculty: String,
}

impl From<&SessionDemand> for ScheduledSession {
    fn from(d: &SessionDemand) -> Self {
        Self {
            year: d.year,
            division: d.division.clone(),
            batch: d.batch,
            subject: d.subject.clone(),
            subject_full: d.subject_full.clone(),
            faculty_id: d.faculty_id.clone(),
            faculty: d.faculty_name.clone(),
        }
    }
}

pub type WeekSchedule = BTreeMap<Day, BTreeMap<TimeSlot, Vec<ScheduledSession>>>;

/// Output record for one lab, handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabTimetable {
    pub lab_name: String,
    pub schedule: WeekSchedule,
    pub generated_at: DateTime<Utc>,
}

pub type Leftovers = BTreeMap<Year, BTreeMap<Division, BTreeMap<SubjectCode, Vec<SessionDemand>>>>;

/// The complete input for one generation run.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationInput {
    pub labs: Vec<Lab>,
    pub faculties: Vec<Faculty>,
    pub workloads: Vec<WorkloadRecord>,
    pub class_structure: Vec<ClassStructureEntry>,
    pub subjects: Vec<SubjectRecord>,
}

/// Run statistics attached to every successful output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSummary {
    pub strategy: crate::config::Strategy,
    pub total_demands: usize,
    pub placed: usize,
    pub leftover: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Candidate placements examined by the search.
    pub attempts: u64,
}

/// The final output of a generation run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutput {
    pub timetables: Vec<LabTimetable>,
    pub leftovers: Leftovers,
    pub summary: GenerationSummary,
    pub generated_at: DateTime<Utc>,
}

impl GenerationOutput {
    pub fn placed_sessions(&self) -> usize {
        self.summary.placed
    }

    pub fn leftover_sessions(&self) -> usize {
        self.leftovers
            .values()
            .flat_map(|divs| divs.values())
            .flat_map(|subjects| subjects.values())
            .map(Vec::len)
            .sum()
    }
}
