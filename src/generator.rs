//! One generation run, end to end.

use crate::assemble::{RunMeta, assemble};
use crate::config::{GeneratorConfig, Strategy};
use crate::conflict::Rules;
use crate::data::GenerationOutput;
use crate::demand::{Qualifications, build_demands};
use crate::error::{GenerationError, MissingInput, Result};
use crate::grid::Grid;
use crate::solver::{BacktrackingScheduler, CancelToken, GreedyScheduler, Scheduler};
use crate::store::{ReferenceData, TimetableSink};
use crate::validation::audit;
use chrono::Utc;
use log::{error, info, warn};
use std::time::Instant;

/// Runs the scheduler against injected collaborators.
pub struct Generator<'a, R: ReferenceData + ?Sized> {
    source: &'a R,
    config: GeneratorConfig,
    cancel: Option<CancelToken>,
}

impl<'a, R: ReferenceData + ?Sized> Generator<'a, R> {
    pub fn new(source: &'a R, config: GeneratorConfig) -> Self {
        Self {
            source,
            config,
            cancel: None,
        }
    }

    /// Lets another thread stop a backtracking search.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Generates and hands the lab timetables to `sink`, replacing the
    /// previous master timetable. Nothing is persisted on failure.
    pub fn generate(&self, sink: &mut dyn TimetableSink) -> Result<GenerationOutput> {
        let output = self.run()?;
        sink.replace_all(&output.timetables)?;
        Ok(output)
    }

    /// Generates without persisting.
    pub fn run(&self) -> Result<GenerationOutput> {
        let start = Instant::now();
        let input = self.source.snapshot()?;

        if input.labs.is_empty() {
            error!("No labs found. Aborting.");
            return Err(GenerationError::MissingInput(MissingInput::Labs));
        }
        if input.faculties.is_empty() {
            error!("No faculty found. Aborting.");
            return Err(GenerationError::MissingInput(MissingInput::Faculties));
        }
        if input.workloads.is_empty() {
            error!("No workload found. Aborting.");
            return Err(GenerationError::MissingInput(MissingInput::Workloads));
        }

        let demands = build_demands(&input, &self.config);
        if demands.is_empty() {
            error!("No workload yields a practical session. Aborting.");
            return Err(GenerationError::MissingInput(MissingInput::Demands));
        }
        let total = demands.len();
        info!(
            "Generating with {} strategy: {} sessions, {} labs, {} faculty",
            self.config.strategy,
            total,
            input.labs.len(),
            input.faculties.len()
        );

        let scheduler = self.scheduler(Qualifications::from_input(&input))?;
        let outcome = scheduler.schedule(Grid::new(&input.labs), demands)?;

        if outcome.grid.len() + outcome.leftovers.len() != total {
            return Err(GenerationError::Internal(format!(
                "{} placed + {} leftover does not account for {} sessions",
                outcome.grid.len(),
                outcome.leftovers.len(),
                total
            )));
        }
        let violations = audit(&outcome.grid, Rules::from(&self.config));
        if !violations.is_empty() {
            for v in &violations {
                error!("{v}");
            }
            return Err(GenerationError::Internal(format!(
                "{} constraint violations in generated grid",
                violations.len()
            )));
        }

        let output = assemble(
            &outcome.grid,
            outcome.leftovers,
            RunMeta {
                strategy: self.config.strategy,
                seed: self.config.shuffle_seed,
                attempts: outcome.attempts,
                generated_at: Utc::now(),
            },
        );

        if output.summary.leftover > 0 {
            for (year, divisions) in &output.leftovers {
                let count: usize = divisions
                    .values()
                    .flat_map(|subjects| subjects.values())
                    .map(Vec::len)
                    .sum();
                warn!("{year}: {count} sessions left unscheduled");
            }
        }
        info!(
            "Placed {}/{} sessions in {:.2?}",
            output.summary.placed,
            total,
            start.elapsed()
        );
        Ok(output)
    }

    fn scheduler(&self, qualifications: Qualifications) -> Result<Box<dyn Scheduler>> {
        match self.config.strategy {
            Strategy::Greedy => Ok(Box::new(GreedyScheduler::new(&self.config))),
            Strategy::Backtracking => {
                let mut bt = BacktrackingScheduler::new(&self.config, qualifications);
                if let Some(token) = &self.cancel {
                    bt = bt.with_cancel_token(token.clone());
                }
                Ok(Box::new(bt))
            }
            #[cfg(feature = "exact")]
            Strategy::Exact => Ok(Box::new(crate::solver::exact::ExactScheduler::new(
                &self.config,
            ))),
            #[cfg(not(feature = "exact"))]
            Strategy::Exact => Err(GenerationError::StrategyUnavailable(Strategy::Exact)),
        }
    }
}
