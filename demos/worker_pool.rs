//! Recycling a couple of threads for many routines

use rand::Rng;
use std::thread;
use std::time::Duration;
use tandem_rs::prelude::*;

fn main() {
    println!("=== Worker Pool Example ===\n");
    println!("This machine runs {} threads concurrently.", num_cpus::get());
    println!("Instead of one thread per routine, two workers take turns on a shared queue.\n");

    let config = Config::builder()
        .num_workers(2)
        .thread_name_prefix("demo")
        .build()
        .expect("valid config");
    let pool = WorkerPool::new(&config).expect("Failed to start pool");

    for number in 1..=20 {
        let work_ms = rand::thread_rng().gen_range(50..200);
        pool.execute(move || {
            let name = thread::current().name().unwrap_or("unnamed").to_string();
            println!("{}, routine-{}: will work for {} millis", name, number, work_ms);
            thread::sleep(Duration::from_millis(work_ms));
            println!("{}, routine-{}: finished working for {} millis", name, number, work_ms);
        })
        .expect("pool accepts work");
    }

    pool.wait_idle();

    let stats = pool.stats();
    println!(
        "\nExecuted {} routines, never more than {} at once",
        stats.executed, stats.peak_active
    );
    for worker in pool.worker_stats() {
        println!(
            "worker {}: {} routines, {:.0}% busy",
            worker.id,
            worker.items_executed,
            worker.utilization() * 100.0
        );
    }
}
