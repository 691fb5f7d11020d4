use crate::coop::RoutineId;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure a routine step may hand back instead of a [`Step`](crate::coop::Step).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{id} faulted at step {step}: {source}")]
    RoutineFault {
        id: RoutineId,
        step: u64,
        #[source]
        source: BoxError,
    },

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("{0} has shut down")]
    ShutDown(&'static str),

    #[error("config error: {0}")]
    Config(String),

    #[error("executor error: {0}")]
    Executor(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn executor<S: Into<String>>(msg: S) -> Self {
        Error::Executor(msg.into())
    }

    pub fn violation<S: Into<String>>(msg: S) -> Self {
        Error::ContractViolation(msg.into())
    }

    pub(crate) fn fault(id: RoutineId, step: u64, source: BoxError) -> Self {
        Error::RoutineFault { id, step, source }
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, Error::RoutineFault { .. })
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }

    /// Routine this error is attributed to, if any.
    pub fn routine(&self) -> Option<RoutineId> {
        match self {
            Error::RoutineFault { id, .. } => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_attribution() {
        let id = RoutineId::from_raw(7);
        let err = Error::fault(id, 2, "disk on fire".into());

        assert!(err.is_fault());
        assert_eq!(err.routine(), Some(id));
        assert_eq!(err.to_string(), "routine-7 faulted at step 2: disk on fire");
    }

    #[test]
    fn test_violation_has_no_routine() {
        let err = Error::violation("resumed twice");
        assert!(err.is_violation());
        assert_eq!(err.routine(), None);
    }
}
