//! Per-routine state machine enforcing the resume contract.

use super::routine::{Checkpoint, Routine, RoutineId, Step};
use crate::error::{Error, Result};
use crate::executor::{PanicHandler, PanicStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Waiting to be resumed with the checkpoint of yield number `seq`.
    Yielded { seq: u64 },
    Completed,
    /// Faulted or misused; never invoked again.
    Failed,
}

/// A submitted routine together with its identity and progress.
///
/// It is owned by exactly one place at a time (the new-work queue, the
/// pending table or the thread running its step), which is what keeps a
/// routine from ever running concurrently with itself.
pub struct RoutineTask<T> {
    id: RoutineId,
    routine: Box<dyn Routine<Output = T>>,
    phase: Phase,
    steps: u64,
}

impl<T: Send + 'static> RoutineTask<T> {
    pub fn new<R>(routine: R) -> Self
    where
        R: Routine<Output = T>,
    {
        Self {
            id: RoutineId::next(),
            routine: Box::new(routine),
            phase: Phase::NotStarted,
            steps: 0,
        }
    }

    pub fn id(&self) -> RoutineId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Steps invoked so far, including a faulting one.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, Phase::Completed | Phase::Failed)
    }

    /// Advance by one step, catching panics silently.
    pub fn step(&mut self, resume: Option<Checkpoint>) -> Result<Step<T>> {
        let panics = PanicHandler::new(PanicStrategy::Isolate);
        self.step_with(resume, &panics)
    }

    pub(crate) fn step_with(
        &mut self,
        resume: Option<Checkpoint>,
        panics: &PanicHandler,
    ) -> Result<Step<T>> {
        if let Err(e) = self.check_resume(resume.as_ref()) {
            self.phase = Phase::Failed;
            return Err(e);
        }

        self.steps += 1;
        let step = self.steps;
        let id = self.id;
        let routine = &mut self.routine;

        let outcome = match panics.execute(&id, || routine.step(resume)) {
            Ok(Ok(step)) => Ok(step),
            Ok(Err(source)) => Err(Error::fault(id, step, source)),
            Err(panic) => Err(Error::fault(id, step, Box::new(panic))),
        };

        match outcome {
            Ok(Step::Yield(mut checkpoint)) => {
                checkpoint.owner = Some(id);
                checkpoint.seq = step;
                self.phase = Phase::Yielded { seq: step };
                Ok(Step::Yield(checkpoint))
            }
            Ok(Step::Complete(value)) => {
                self.phase = Phase::Completed;
                Ok(Step::Complete(value))
            }
            Err(e) => {
                self.phase = Phase::Failed;
                Err(e)
            }
        }
    }

    fn check_resume(&self, resume: Option<&Checkpoint>) -> Result<()> {
        match (self.phase, resume) {
            (Phase::NotStarted, None) => Ok(()),
            (Phase::NotStarted, Some(_)) => Err(Error::violation(format!(
                "{} resumed with a checkpoint before its first step",
                self.id
            ))),
            (Phase::Yielded { .. }, None) => Err(Error::violation(format!(
                "{} restarted without its checkpoint",
                self.id
            ))),
            (Phase::Yielded { seq }, Some(cp)) => {
                if cp.owner != Some(self.id) {
                    Err(Error::violation(format!(
                        "{} resumed with a checkpoint it never produced",
                        self.id
                    )))
                } else if cp.seq != seq {
                    Err(Error::violation(format!(
                        "{} resumed with stale checkpoint from step {} (expected step {})",
                        self.id, cp.seq, seq
                    )))
                } else {
                    Ok(())
                }
            }
            (Phase::Completed, _) => Err(Error::violation(format!(
                "{} invoked after completion",
                self.id
            ))),
            (Phase::Failed, _) => Err(Error::violation(format!(
                "{} invoked after failing",
                self.id
            ))),
        }
    }
}

impl<T> std::fmt::Debug for RoutineTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutineTask")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coop::routine::{from_fn, StepResult};

    fn counting(limit: u64) -> RoutineTask<u64> {
        RoutineTask::new(from_fn(move |resume: Option<Checkpoint>| -> StepResult<u64> {
            let at = resume.map_or(0, |c| c.position()) + 1;
            if at < limit {
                Ok(Step::yield_at(at))
            } else {
                Ok(Step::Complete(at))
            }
        }))
    }

    fn expect_yield(step: Result<Step<u64>>) -> Checkpoint {
        match step {
            Ok(Step::Yield(cp)) => cp,
            other => panic!("expected yield, got {:?}", other),
        }
    }

    #[test]
    fn test_resume_with_own_checkpoint() {
        let mut task = counting(3);

        let cp = expect_yield(task.step(None));
        assert_eq!(cp.owner(), Some(task.id()));
        let cp = expect_yield(task.step(Some(cp)));
        assert!(matches!(task.step(Some(cp)), Ok(Step::Complete(3))));
        assert_eq!(task.phase(), Phase::Completed);
        assert_eq!(task.steps(), 3);
    }

    #[test]
    fn test_rejects_foreign_checkpoint() {
        let mut a = counting(5);
        let mut b = counting(5);

        expect_yield(a.step(None));
        let b_cp = expect_yield(b.step(None));

        let err = a.step(Some(b_cp)).unwrap_err();
        assert!(err.is_violation());
        assert_eq!(a.phase(), Phase::Failed);
    }

    #[test]
    fn test_rejects_hand_made_checkpoint() {
        let mut task = counting(5);
        expect_yield(task.step(None));

        assert!(task.step(Some(Checkpoint::at(1))).unwrap_err().is_violation());
    }

    #[test]
    fn test_rejects_stale_checkpoint() {
        let mut task = counting(5);
        let first = expect_yield(task.step(None));
        expect_yield(task.step(Some(first.clone())));

        assert!(task.step(Some(first)).unwrap_err().is_violation());
    }

    #[test]
    fn test_rejects_invocation_after_completion() {
        let mut task = counting(1);
        assert!(matches!(task.step(None), Ok(Step::Complete(1))));

        assert!(task.step(None).unwrap_err().is_violation());
        assert_eq!(task.steps(), 1);
    }

    #[test]
    fn test_rejects_checkpoint_on_first_step() {
        let mut task = counting(2);
        assert!(task.step(Some(Checkpoint::at(0))).unwrap_err().is_violation());
    }

    #[test]
    fn test_error_becomes_fault() {
        let mut task: RoutineTask<()> =
            RoutineTask::new(from_fn(|_: Option<Checkpoint>| -> StepResult<()> {
                Err("no more coffee".into())
            }));

        let err = task.step(None).unwrap_err();
        assert!(err.is_fault());
        assert_eq!(err.routine(), Some(task.id()));
        assert!(task.is_finished());
    }

    #[test]
    fn test_panic_becomes_fault() {
        let mut task: RoutineTask<()> =
            RoutineTask::new(from_fn(|_: Option<Checkpoint>| -> StepResult<()> {
                panic!("step exploded")
            }));

        match task.step(None) {
            Err(Error::RoutineFault { step, source, .. }) => {
                assert_eq!(step, 1);
                assert!(source.to_string().contains("step exploded"));
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }
}
