//! Ten routines sharing one scheduler thread, each pausing between steps

use rand::Rng;
use std::thread;
use std::time::Duration;
use tandem_rs::prelude::*;

const STEPS: u64 = 4;

/// Works in four steps. Between steps it yields with a delay instead of
/// sleeping, so the scheduler thread stays free for the other routines.
struct PretendWork {
    number: u32,
    work_ms: u64,
}

impl Routine for PretendWork {
    type Output = u64;

    fn step(&mut self, resume: Option<Checkpoint>) -> StepResult<u64> {
        let name = thread::current().name().unwrap_or("unnamed").to_string();
        let step_ms = self.work_ms / STEPS;

        let working_on = match resume {
            None => {
                println!("{}, routine-{}: will work for {} millis", name, self.number, self.work_ms);
                0
            }
            Some(cp) => {
                let done = cp.position();
                println!(
                    "{}, routine-{}: step {} completed, waited {} millis",
                    name, self.number, done, step_ms
                );
                done
            }
        };

        if working_on < STEPS {
            Ok(Step::yield_after(working_on + 1, Duration::from_millis(step_ms)))
        } else {
            println!("{}, routine-{}: finished working for {} millis", name, self.number, self.work_ms);
            Ok(Step::Complete(self.work_ms))
        }
    }
}

fn main() {
    println!("=== Cooperative Routines Example ===\n");

    let config = Config::builder()
        .scheduler_threads(1)
        .thread_name_prefix("demo")
        .record_trace(true)
        .build()
        .expect("valid config");
    let scheduler = CooperativeScheduler::new(&config).expect("Failed to start scheduler");

    let mut rng = rand::thread_rng();
    for number in 1..=10 {
        let work_ms = rng.gen_range(200..400);
        scheduler
            .submit_routine(PretendWork { number, work_ms })
            .expect("scheduler accepts routines");
    }

    scheduler.wait_idle();

    let total_ms: u64 = scheduler.reports().try_iter().filter_map(Report::into_value).sum();
    println!("\nAll routines finished; {} millis of work interleaved on one thread", total_ms);

    if let Some(trace) = scheduler.trace() {
        println!("{} steps were scheduled", trace.step_order().len());
    }

    #[cfg(feature = "telemetry")]
    {
        let snapshot = scheduler.metrics().snapshot();
        println!(
            "steps: {}, pending high water: {}, starvation ratio: {:.2}",
            snapshot.steps_executed,
            snapshot.pending_high_water,
            snapshot.starvation_ratio()
        );
    }
}
