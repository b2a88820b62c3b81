use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

/// Placement strategy for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    /// Single deterministic sweep over day, slot and group priority.
    #[default]
    Greedy,
    /// Depth-first search over individual batches; complete but exponential.
    Backtracking,
    /// Integer program solved with HiGHS. Needs the `exact` feature.
    Exact,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Greedy => "greedy",
            Strategy::Backtracking => "backtracking",
            Strategy::Exact => "exact",
        };
        f.write_str(name)
    }
}

/// How batches of one (year, division, subject) are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupingMode {
    /// All batches land in the same slot, each in its own lab, or none do.
    #[default]
    Atomic,
    /// Every batch is an independent demand.
    PerBatch,
}

/// Which faculty attribute identifies a person for conflict checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FacultyMatch {
    #[default]
    Identifier,
    /// Compare display names. Two people sharing a name collide.
    DisplayName,
}

/// Tuning knobs for a generation run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub strategy: Strategy,
    pub grouping: GroupingMode,
    /// A division attends practicals in at most one slot per day.
    pub one_practical_per_day: bool,
    pub faculty_match: FacultyMatch,
    /// Workloads below this many weekly practical hours are lecture-only.
    pub min_practical_hours: u32,
    /// Shuffles demand order when set; recorded in the output summary.
    pub shuffle_seed: Option<u64>,
    /// Candidate checks before the backtracking search gives up.
    pub max_attempts: u64,
    pub timeout_ms: Option<u64>,
}

pub const MIN_PRACTICAL_HOURS: u32 = 2;
pub const DEFAULT_MAX_ATTEMPTS: u64 = 2_000_000;

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            grouping: GroupingMode::default(),
            one_practical_per_day: true,
            faculty_match: FacultyMatch::default(),
            min_practical_hours: MIN_PRACTICAL_HOURS,
            shuffle_seed: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_ms: None,
        }
    }
}

impl GeneratorConfig {
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingMode) -> Self {
        self.grouping = grouping;
        self
    }

    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    pub fn with_faculty_match(mut self, faculty_match: FacultyMatch) -> Self {
        self.faculty_match = faculty_match;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

pub const ADDR_ENV: &str = "LAB_TIMETABLE_ADDR";
const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8080);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
}

impl ServerConfig {
    /// Reads the bind address from `LAB_TIMETABLE_ADDR`, falling back to
    /// the default when unset or unparsable.
    pub fn from_env() -> Self {
        let raw = std::env::var(ADDR_ENV).ok();
        Self::from_addr(raw.as_deref())
    }

    fn from_addr(raw: Option<&str>) -> Self {
        let fallback = SocketAddr::from(DEFAULT_ADDR);
        let addr = match raw {
            Some(s) => s.parse().unwrap_or_else(|e| {
                log::warn!("Ignoring {ADDR_ENV}={s:?}: {e}; using {fallback}");
                fallback
            }),
            None => fallback,
        };
        Self { addr }
    }
}
