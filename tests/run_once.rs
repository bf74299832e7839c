// tests/run_once.rs

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use taskmill::{Orchestrator, Settings, TaskError, TaskFn, TaskOptions, TaskValue};
use taskmill_test_utils::fixtures::{Counter, counting};
use taskmill_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn orchestrator() -> Orchestrator {
    Orchestrator::with_settings(Settings::default())
}

#[tokio::test]
async fn run_once_task_runs_once_across_compositions() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let calls = Counter::new();
        orch.declare_task_with("setup", counting(&calls, 7), TaskOptions::run_once())?;

        let first = orch.series(["setup"])?;
        let second = orch.parallel(["setup", "setup"])?;
        orch.declare_task("again", orch.series(["setup"])?)?;

        let a = first.run().await.into_task_result()?;
        let b = second.run().await.into_task_result()?;
        let c = orch.series(["again"])?.run().await.into_task_result()?;

        assert_eq!(calls.get(), 1);
        assert_eq!(a, TaskValue::List(vec![TaskValue::Int(7)]));
        assert_eq!(b, TaskValue::List(vec![TaskValue::Int(7), TaskValue::Int(7)]));
        assert_eq!(c, TaskValue::List(vec![TaskValue::List(vec![TaskValue::Int(7)])]));
        assert!(orch.engine().cache().contains(orch.task("setup")?.id()));
        Ok(())
    })
    .await
}

#[tokio::test]
async fn unflagged_task_runs_every_time() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let calls = Counter::new();
        orch.declare_task("lint", counting(&calls, 1))?;

        orch.series(["lint", "lint"])?.run().await.into_task_result()?;
        orch.parallel(["lint"])?.run().await.into_task_result()?;

        assert_eq!(calls.get(), 3);
        assert!(orch.engine().cache().is_empty());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn failures_are_not_cached() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let attempts = Arc::new(AtomicUsize::new(0));
        let flaky = {
            let attempts = Arc::clone(&attempts);
            TaskFn::sync(move || {
                if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(TaskError::msg("not yet"))
                } else {
                    Ok("ready")
                }
            })
        };
        orch.declare_task_with("fetch", flaky, TaskOptions::run_once())?;

        let first = orch.series(["fetch"])?.run().await;
        assert!(!first.is_success());

        let second = orch.series(["fetch"])?.run().await.into_task_result()?;
        let third = orch.series(["fetch"])?.run().await.into_task_result()?;

        assert_eq!(second, TaskValue::List(vec![TaskValue::Text("ready".into())]));
        assert_eq!(third, second);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        Ok(())
    })
    .await
}

#[tokio::test]
async fn run_once_identity_is_per_declaration() -> TestResult {
    with_timeout(async {
        init_tracing();
        let orch = orchestrator();
        let calls = Counter::new();
        orch.declare_task_with("a", counting(&calls, 1), TaskOptions::run_once())?;
        orch.declare_task_with("b", counting(&calls, 2), TaskOptions::run_once())?;

        orch.series(["a", "b", "a", "b"])?.run().await.into_task_result()?;

        assert_eq!(calls.get(), 2);
        assert_eq!(orch.engine().cache().len(), 2);
        Ok(())
    })
    .await
}
