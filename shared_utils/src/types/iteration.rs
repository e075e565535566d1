//! Iteration budget for search loops.
//!
//! A guard hands out numbered iterations until its budget is spent. Callers
//! validate user-supplied budgets against [`HARD_ITERATION_CAP`]; the guard
//! clamps to it regardless.

use thiserror::Error;

pub const HARD_ITERATION_CAP: u32 = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{context}: iteration budget of {budget} exhausted")]
pub struct IterationError {
    pub budget: u32,
    pub context: String,
}

#[derive(Debug, Clone)]
pub struct IterationGuard {
    used: u32,
    budget: u32,
    context: String,
}

impl IterationGuard {
    pub fn new(budget: u32, context: impl Into<String>) -> Self {
        Self {
            used: 0,
            budget: budget.min(HARD_ITERATION_CAP),
            context: context.into(),
        }
    }

    /// Claims the next iteration and returns its 1-based number. Once the
    /// budget is spent every call fails and `used` stops growing.
    pub fn increment(&mut self) -> Result<u32, IterationError> {
        if self.used >= self.budget {
            return Err(IterationError {
                budget: self.budget,
                context: self.context.clone(),
            });
        }
        self.used += 1;
        Ok(self.used)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_handed_out_in_order() {
        let mut guard = IterationGuard::new(3, "quality search");
        assert_eq!(guard.increment(), Ok(1));
        assert_eq!(guard.increment(), Ok(2));
        assert_eq!(guard.increment(), Ok(3));
        assert_eq!(guard.used(), guard.budget());
        assert!(guard.increment().is_err());
    }

    #[test]
    fn test_spent_guard_keeps_failing_without_counting() {
        let mut guard = IterationGuard::new(1, "quality search");
        guard.increment().unwrap();

        let err = guard.increment().unwrap_err();
        assert!(guard.increment().is_err());
        assert_eq!(guard.used(), 1);
        assert_eq!(err.to_string(), "quality search: iteration budget of 1 exhausted");
    }

    #[test]
    fn test_budget_is_capped() {
        let guard = IterationGuard::new(1000, "runaway");
        assert_eq!(guard.budget(), HARD_ITERATION_CAP);
    }

    #[test]
    fn test_zero_budget_is_exhausted_immediately() {
        let mut guard = IterationGuard::new(0, "empty");
        assert_eq!(guard.increment().unwrap_err().context, "empty");
        assert_eq!(guard.used(), 0);
    }
}
