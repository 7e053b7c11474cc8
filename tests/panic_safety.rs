use dynpool::{StopMode, TaskError, ThreadPool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_worker_survives_task_panic() {
    let pool = ThreadPool::new(1, 8);
    pool.start();

    pool.post(|| panic!("boom"));

    // The single worker must still be alive to run the next task.
    let success = Arc::new(AtomicBool::new(false));
    let success_clone = Arc::clone(&success);
    pool.post(move || {
        success_clone.store(true, Ordering::SeqCst);
    });

    let start = Instant::now();
    while !success.load(Ordering::SeqCst) {
        if start.elapsed() > Duration::from_secs(1) {
            panic!("worker did not process subsequent task");
        }
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(pool.current_threads(), 1);

    pool.stop(StopMode::Graceful);
    let stats = pool.statistics();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 1);
}

#[test]
fn test_panic_payload_variants() {
    let pool = ThreadPool::new(1, 8);
    pool.start();

    let str_panic = pool.submit(|| -> u32 { panic!("static message") });
    let string_panic = pool.submit(|| -> u32 { panic!("formatted {}", 42) });

    assert_eq!(
        str_panic.join(),
        Err(TaskError::Panicked("static message".into()))
    );
    assert_eq!(
        string_panic.join(),
        Err(TaskError::Panicked("formatted 42".into()))
    );

    pool.stop(StopMode::Graceful);
    assert_eq!(pool.statistics().failed, 2);
}

#[test]
fn test_exec_time_accumulates_for_failures_too() {
    let pool = ThreadPool::new(1, 8);
    pool.start();

    pool.submit(|| thread::sleep(Duration::from_millis(20)))
        .join()
        .unwrap();
    let _ = pool
        .submit(|| -> () {
            thread::sleep(Duration::from_millis(20));
            panic!("late failure");
        })
        .join();

    pool.stop(StopMode::Graceful);
    let stats = pool.statistics();
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.failed, 1);
    assert!(stats.total_exec_time >= Duration::from_millis(40));
    // The running mean divides by completions only.
    assert!(stats.avg_exec_time >= Duration::from_millis(40));
}
