//! Bounded parallel execution with first-error-wins semantics.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use chronicle_core::ExportError;

/// Runs one task per input with at most `concurrency` tasks in flight.
///
/// Every dispatched task finishes before [`BoundedExecutor::run`] returns.
/// Results are placed by input index, so output order never depends on
/// completion order.
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    concurrency: usize,
}

impl BoundedExecutor {
    /// A concurrency of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Run `task(index, input)` for every input.
    ///
    /// The first error reported by any task is returned once all tasks have
    /// finished; later errors are logged and dropped. A task that panics
    /// releases its slot like any other and fails the batch.
    pub async fn run<T, R, F, Fut>(&self, inputs: Vec<T>, task: F) -> Result<Vec<R>, ExportError>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(usize, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ExportError>> + Send + 'static,
    {
        let total = inputs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (error_tx, mut error_rx) = mpsc::channel::<ExportError>(1);
        let task = Arc::new(task);
        let mut set = JoinSet::new();

        for (index, input) in inputs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let task = Arc::clone(&task);
            let error_tx = error_tx.clone();

            set.spawn(async move {
                // Held until this future completes or unwinds.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, None);
                };

                match task(index, input).await {
                    Ok(result) => (index, Some(result)),
                    Err(e) => {
                        if let Err(TrySendError::Full(dropped)) = error_tx.try_send(e) {
                            tracing::warn!(
                                part_index = index + 1,
                                error = %dropped,
                                "Additional part failure in already failed batch"
                            );
                        }
                        (index, None)
                    }
                }
            });
        }
        drop(error_tx);

        let mut slots: Vec<Option<R>> = std::iter::repeat_with(|| None).take(total).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => slots[index] = result,
                Err(e) => tracing::error!(error = %e, "Part task aborted"),
            }
        }

        if let Ok(first) = error_rx.try_recv() {
            return Err(first);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| ExportError::Render {
                    part: index + 1,
                    message: "render task did not complete".to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Tracks the number of tasks inside the gate and the peak observed.
    #[derive(Default)]
    struct InFlight {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    impl InFlight {
        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_never_exceeds_concurrency() {
        for concurrency in 1..=4 {
            let gauge = Arc::new(InFlight::default());
            let tracked = Arc::clone(&gauge);

            let results = BoundedExecutor::new(concurrency)
                .run((0..12).collect::<Vec<u64>>(), move |_, n| {
                    let gauge = Arc::clone(&tracked);
                    async move {
                        gauge.enter();
                        tokio::time::sleep(Duration::from_millis(5 + n % 3)).await;
                        gauge.leave();
                        Ok::<_, ExportError>(n)
                    }
                })
                .await
                .unwrap();

            assert_eq!(results.len(), 12);
            let peak = gauge.peak.load(Ordering::SeqCst);
            assert!(peak <= concurrency, "peak {} > {}", peak, concurrency);
            assert!(peak >= 1);
        }
    }

    #[tokio::test]
    async fn test_results_follow_input_order() {
        // Earlier inputs sleep longer so they finish last.
        let results = BoundedExecutor::new(4)
            .run((0..8).collect::<Vec<u64>>(), |index, n| async move {
                tokio::time::sleep(Duration::from_millis((8 - n) * 5)).await;
                Ok::<_, ExportError>(index)
            })
            .await
            .unwrap();

        assert_eq!(results, (0..8).collect::<Vec<usize>>());
    }

    #[tokio::test]
    async fn test_first_error_wins_and_all_tasks_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);

        let err = BoundedExecutor::new(2)
            .run((0..6).collect::<Vec<u64>>(), move |index, _| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    if index == 1 || index == 4 {
                        return Err(ExportError::Render {
                            part: index + 1,
                            message: "boom".to_string(),
                        });
                    }
                    Ok(index)
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Render { part: 2 | 5, .. }));
        assert_eq!(finished.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_panicking_task_releases_slot() {
        let err = BoundedExecutor::new(1)
            .run(vec![0u8, 1, 2], |index, _| async move {
                if index == 0 {
                    panic!("renderer crashed");
                }
                Ok::<_, ExportError>(index)
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Render { part: 1, .. }));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = BoundedExecutor::new(3)
            .run(Vec::<u8>::new(), |_, n| async move { Ok::<_, ExportError>(n) })
            .await
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_zero_concurrency_is_one() {
        assert_eq!(BoundedExecutor::new(0).concurrency(), 1);
    }
}
