//! Stress tests for the pool and the scheduler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tandem_rs::prelude::*;

#[test]
#[ignore] // Run with --ignored flag
fn stress_test_many_small_items() {
    let config = Config::builder().num_workers(8).build().unwrap();
    let pool = WorkerPool::new(&config).unwrap();
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..100_000 {
        let counter = counter.clone();
        pool.execute(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }

    pool.wait_idle();
    assert_eq!(counter.load(Ordering::Relaxed), 100_000);
}

#[test]
#[ignore]
fn stress_test_many_routines_many_threads() {
    let config = Config::builder().scheduler_threads(8).build().unwrap();
    let scheduler = CooperativeScheduler::new(&config).unwrap();

    for n in 0..10_000u64 {
        scheduler
            .submit_fn(move |resume: Option<Checkpoint>| {
                let at = resume.map_or(0, |c| c.position()) + 1;
                if at < 10 {
                    Ok(Step::yield_at(at))
                } else {
                    Ok(Step::Complete(n))
                }
            })
            .unwrap();
    }

    assert!(scheduler.wait_idle_timeout(Duration::from_secs(60)));
    let total: u64 = scheduler.reports().try_iter().filter_map(Report::into_value).sum();
    assert_eq!(total, (0..10_000u64).sum::<u64>());
}

#[test]
#[ignore]
fn stress_test_starvation_under_new_work() {
    let config = Config::builder().build().unwrap();
    let scheduler = CooperativeScheduler::manual(&config).unwrap();

    let yields = |n: u64| {
        move |resume: Option<Checkpoint>| -> StepResult<u64> {
            let at = resume.map_or(0, |c| c.position()) + 1;
            if at < n {
                Ok(Step::yield_at(at))
            } else {
                Ok(Step::Complete(at))
            }
        }
    };

    scheduler.submit_fn(yields(100)).unwrap();
    scheduler.turn();
    for _ in 0..1_000 {
        scheduler.submit_fn(yields(1)).unwrap();
        scheduler.turn();
    }

    // the long routine was passed over on every turn
    assert_eq!(scheduler.pending_len(), 1);
    #[cfg(feature = "telemetry")]
    {
        let snapshot = scheduler.metrics().snapshot();
        assert_eq!(snapshot.deferred_resumes, 1_000);
        assert!(snapshot.starvation_ratio() > 0.99);
    }

    scheduler.drain();
    assert_eq!(scheduler.live_len(), 0);
}

#[test]
#[ignore]
fn stress_test_repeated_start_shutdown() {
    for i in 0..50 {
        let config = Config::builder().num_workers(2).scheduler_threads(2).build().unwrap();
        let mut pool = WorkerPool::new(&config).unwrap();
        let mut scheduler = CooperativeScheduler::new(&config).unwrap();

        pool.execute(|| {}).unwrap();
        scheduler
            .submit_fn(|_: Option<Checkpoint>| Ok(Step::Complete(())))
            .unwrap();

        pool.shutdown();
        scheduler.shutdown();
        assert_eq!(pool.stats().executed, 1, "iteration {}", i);
        assert_eq!(scheduler.live_len(), 0, "iteration {}", i);
    }
}
