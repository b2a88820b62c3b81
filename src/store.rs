//! Seams to the record-keeping side of the system.
//!
//! The generator never reaches for global handles: reference data comes in
//! through [`ReferenceData`], and the finished master timetable leaves
//! through [`TimetableSink`].

use crate::data::{
    ClassStructureEntry, Faculty, GenerationInput, Lab, LabTimetable, SubjectRecord,
    WorkloadRecord,
};
use crate::error::StoreError;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read-only source of the records a run schedules from.
pub trait ReferenceData {
    fn labs(&self) -> StoreResult<Vec<Lab>>;
    fn faculties(&self) -> StoreResult<Vec<Faculty>>;
    fn workloads(&self) -> StoreResult<Vec<WorkloadRecord>>;

    fn class_structure(&self) -> StoreResult<Vec<ClassStructureEntry>> {
        Ok(Vec::new())
    }

    fn subjects(&self) -> StoreResult<Vec<SubjectRecord>> {
        Ok(Vec::new())
    }

    /// Loads everything up front; scheduling never goes back to the store.
    fn snapshot(&self) -> StoreResult<GenerationInput> {
        Ok(GenerationInput {
            labs: self.labs()?,
            faculties: self.faculties()?,
            workloads: self.workloads()?,
            class_structure: self.class_structure()?,
            subjects: self.subjects()?,
        })
    }
}

impl ReferenceData for GenerationInput {
    fn labs(&self) -> StoreResult<Vec<Lab>> {
        Ok(self.labs.clone())
    }

    fn faculties(&self) -> StoreResult<Vec<Faculty>> {
        Ok(self.faculties.clone())
    }

    fn workloads(&self) -> StoreResult<Vec<WorkloadRecord>> {
        Ok(self.workloads.clone())
    }

    fn class_structure(&self) -> StoreResult<Vec<ClassStructureEntry>> {
        Ok(self.class_structure.clone())
    }

    fn subjects(&self) -> StoreResult<Vec<SubjectRecord>> {
        Ok(self.subjects.clone())
    }

    fn snapshot(&self) -> StoreResult<GenerationInput> {
        Ok(self.clone())
    }
}

/// Receives the master timetable, one record per lab.
pub trait TimetableSink {
    /// Replaces whatever was stored by the previous run.
    fn replace_all(&mut self, timetables: &[LabTimetable]) -> StoreResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryTimetableStore {
    timetables: Vec<LabTimetable>,
}

impl MemoryTimetableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timetables(&self) -> &[LabTimetable] {
        &self.timetables
    }

    pub fn get(&self, lab_name: &str) -> Option<&LabTimetable> {
        self.timetables.iter().find(|t| t.lab_name == lab_name)
    }
}

impl TimetableSink for MemoryTimetableStore {
    fn replace_all(&mut self, timetables: &[LabTimetable]) -> StoreResult<()> {
        self.timetables = timetables.to_vec();
        Ok(())
    }
}
