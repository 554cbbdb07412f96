use std::future::Future;

#[derive(Debug, thiserror::Error)]
pub enum MutationError<E> {
    #[error("remote write failed, local state rolled back: {0}")]
    RolledBack(E),
}

impl<E> MutationError<E> {
    pub fn into_inner(self) -> E {
        match self {
            MutationError::RolledBack(e) => e,
        }
    }
}

/// Optimistic update with rollback.
///
/// `optimistic` is applied to local state before the remote write is awaited.
/// If `remote` fails, `rollback` restores the prior local state and the remote
/// error is returned. There is no retry; the caller decides whether to try
/// again. Futures are lazy, so `rollback` only runs on the failure path.
pub async fn attempt_mutation<T, E, O, R, RB>(
    optimistic: O,
    remote: R,
    rollback: RB,
) -> Result<T, MutationError<E>>
where
    O: Future<Output = ()>,
    R: Future<Output = Result<T, E>>,
    RB: Future<Output = ()>,
{
    optimistic.await;
    match remote.await {
        Ok(value) => Ok(value),
        Err(e) => {
            rollback.await;
            Err(MutationError::RolledBack(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn test_success_keeps_optimistic_state() {
        let state = Arc::new(Mutex::new(false));
        let result: Result<u8, MutationError<String>> = attempt_mutation(
            async { *state.lock().unwrap() = true },
            async { Ok(7) },
            async { *state.lock().unwrap() = false },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert!(*state.lock().unwrap());
    }

    #[tokio::test]
    async fn test_failure_rolls_back() {
        let state = Arc::new(Mutex::new(false));
        let result: Result<(), MutationError<String>> = attempt_mutation(
            async { *state.lock().unwrap() = true },
            async { Err("write rejected".to_string()) },
            async { *state.lock().unwrap() = false },
        )
        .await;

        assert_eq!(result.unwrap_err().into_inner(), "write rejected");
        assert!(!*state.lock().unwrap());
    }
}
