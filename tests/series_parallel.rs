// tests/series_parallel.rs

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use taskmill::{Orchestrator, Settings, TaskError, TaskFn, TaskRef, TaskValue};
use taskmill_test_utils::fixtures::{Counter, counting, delayed, failing};
use taskmill_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn orchestrator() -> Orchestrator {
    Orchestrator::with_settings(Settings::default())
}

fn ints(values: &[i64]) -> Vec<Option<TaskValue>> {
    values.iter().map(|v| Some(TaskValue::Int(*v))).collect()
}

#[tokio::test]
async fn series_runs_every_task_in_order() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();

        let out = orch
            .series([TaskFn::value(1), delayed(2, 10), TaskFn::value(3)])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(out.error, None);
        assert_eq!(out.results, ints(&[1, 2, 3]));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn series_failure_skips_the_rest() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let after = Counter::new();

        let out = orch
            .series([
                TaskFn::value(1),
                failing("broken"),
                counting(&after, 3),
            ])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(out.error, Some(TaskError::msg("broken")));
        assert_eq!(out.results, vec![Some(TaskValue::Int(1)), None, None]);
        assert_eq!(after.get(), 0);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn parallel_places_results_by_index() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();

        let out = orch
            .parallel([TaskFn::value(1), delayed(2, 30), TaskFn::value(3)])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(out.error, None);
        assert_eq!(out.results, ints(&[1, 2, 3]));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn parallel_failure_does_not_cancel_siblings() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let finished = Arc::new(AtomicUsize::new(0));
        let slow = {
            let finished = Arc::clone(&finished);
            TaskFn::future(move || {
                let finished = Arc::clone(&finished);
                async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(())
                }
            })
        };

        let out = orch
            .parallel([slow, failing("fast")])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(out.error, Some(TaskError::msg("fast")));
        assert_eq!(out.results, vec![None, None]);
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        // The orphaned slot keeps running after the composition returned.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn parallel_failure_keeps_slots_completed_before_it() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let late_failure = TaskFn::future(|| async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Err::<(), _>(TaskError::msg("late fail"))
        });

        let out = orch
            .parallel([TaskFn::value(1), late_failure, delayed(3, 200)])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(out.error, Some(TaskError::msg("late fail")));
        assert_eq!(out.results, vec![Some(TaskValue::Int(1)), None, None]);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn nested_compositions_resolve_as_lists() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();

        let inner = orch.parallel([TaskFn::value(2), TaskFn::value(3)])?;
        let out = orch
            .series(vec![TaskRef::from(TaskFn::value(1)), TaskRef::from(inner)])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(
            out.results,
            vec![
                Some(TaskValue::Int(1)),
                Some(TaskValue::List(vec![TaskValue::Int(2), TaskValue::Int(3)])),
            ]
        );
        Ok(())
    })
    .await
}

#[tokio::test]
async fn nested_failure_surfaces_in_parent() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();

        let inner = orch.series([failing("deep")])?;
        let out = orch.series([inner])?.run().await;

        assert!(!out.is_success());
        assert_eq!(out.into_task_result(), Err(TaskError::msg("deep")));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn every_body_shape_runs() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();

        let callback = TaskFn::callback(|done| done.call(None, 4));
        let stream = TaskFn::stream(|| futures::stream::iter(vec![Ok::<_, TaskError>(0); 3]));
        let out = orch
            .series([TaskFn::value(1), delayed(2, 1), callback, stream])?
            .run()
            .await
            .strict()
            .ok_or("expected strict output")?;

        assert_eq!(
            out.results,
            vec![
                Some(TaskValue::Int(1)),
                Some(TaskValue::Int(2)),
                Some(TaskValue::Int(4)),
                Some(TaskValue::Unit),
            ]
        );
        Ok(())
    })
    .await
}
