//! Weekly lab timetable generation for practical sessions.
//!
//! Workload records become per-batch session demands, a placement
//! strategy fits them into a lab x day x slot grid, and the result is
//! reported per lab alongside whatever could not be placed.

pub mod assemble;
pub mod config;
pub mod conflict;
pub mod data;
pub mod demand;
pub mod error;
pub mod generator;
pub mod grid;
pub mod server;
pub mod solver;
pub mod store;
pub mod validation;

pub use config::{FacultyMatch, GeneratorConfig, GroupingMode, Strategy};
pub use error::{GenerationError, Result};
pub use generator::Generator;
pub use store::{MemoryTimetableStore, ReferenceData, TimetableSink};
