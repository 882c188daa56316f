//! Per-run ceilings on search calls and wall-clock time.

use shared::research::ResearchError;
use shared::settings::ResearchSettings;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct ResearchBudget {
    max_search_calls: Option<usize>,
    deadline: Option<Instant>,
    searches: AtomicUsize,
    exhausted: AtomicBool,
}

impl ResearchBudget {
    pub fn new(max_search_calls: Option<usize>, max_runtime: Option<Duration>) -> Self {
        Self {
            max_search_calls,
            deadline: max_runtime.and_then(|d| Instant::now().checked_add(d)),
            searches: AtomicUsize::new(0),
            exhausted: AtomicBool::new(false),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    pub fn from_settings(settings: &ResearchSettings) -> Self {
        Self::new(
            settings.max_search_calls,
            settings.max_runtime_secs.map(Duration::from_secs),
        )
    }

    /// Fails once the deadline has passed or every search call is spent.
    pub fn check(&self) -> Result<(), ResearchError> {
        self.check_deadline()?;
        if let Some(max) = self.max_search_calls {
            if self.searches.load(Ordering::SeqCst) >= max {
                return Err(ResearchError::BudgetExhausted(format!(
                    "all {} search calls used",
                    max
                )));
            }
        }
        Ok(())
    }

    /// Reserve one search call.
    pub fn try_acquire_search(&self) -> Result<(), ResearchError> {
        self.check_deadline()?;
        let max = self.max_search_calls;
        self.searches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| match max {
                Some(max) if used >= max => None,
                _ => Some(used + 1),
            })
            .map(|_| ())
            .map_err(|used| {
                ResearchError::BudgetExhausted(format!("all {} search calls used", used))
            })
    }

    pub fn searches_issued(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    /// Record exhaustion; true only for the first caller.
    pub fn mark_exhausted(&self) -> bool {
        !self.exhausted.swap(true, Ordering::SeqCst)
    }

    pub fn was_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }

    fn check_deadline(&self) -> Result<(), ResearchError> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(ResearchError::BudgetExhausted(
                "wall-clock limit reached".to_string(),
            )),
            _ => Ok(()),
        }
    }
}
