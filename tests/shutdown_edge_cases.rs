use dynpool::{PoolState, StopMode, TaskError, ThreadPool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        if start.elapsed() > limit {
            panic!("condition not reached within {:?}", limit);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_pause_then_force_stop_cancels_parked_submission() {
    let pool = Arc::new(ThreadPool::new(1, 8));
    pool.start();
    pool.pause();

    let submitter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.submit(|| 7).join())
    };
    wait_until(Duration::from_secs(1), || pool.paused_wait() == 1);

    pool.stop(StopMode::Force);
    assert_eq!(submitter.join().unwrap(), Err(TaskError::Cancelled));
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn test_stop_is_idempotent() {
    let pool = ThreadPool::new(2, 16);
    pool.start();
    pool.post(|| {});
    pool.stop(StopMode::Graceful);
    assert_eq!(pool.state(), PoolState::Stopped);
    pool.stop(StopMode::Graceful);
    pool.stop(StopMode::Force);
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn test_submit_after_stop_is_rejected() {
    let pool = ThreadPool::new(1, 8);
    pool.start();
    pool.stop(StopMode::Graceful);

    let handle = pool.submit(|| 3);
    assert_eq!(handle.join(), Err(TaskError::Stopped));
    assert_eq!(pool.statistics().rejected, 1);
}

#[test]
fn test_force_stop_cancels_pending_tasks() {
    let pool = Arc::new(ThreadPool::new(1, 8));
    pool.start();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    let blocker = pool.submit(move || {
        gate_rx.recv().ok();
        1
    });
    wait_until(Duration::from_secs(1), || pool.active_tasks() == 1);

    let fillers: Vec<_> = (0..4).map(|i| pool.submit(move || i)).collect();
    wait_until(Duration::from_secs(1), || pool.pending() == 4);

    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.stop(StopMode::Force))
    };
    // The queue is cleared before workers are joined.
    wait_until(Duration::from_secs(1), || pool.pending() == 0);
    gate_tx.send(()).unwrap();
    stopper.join().unwrap();

    assert_eq!(pool.state(), PoolState::Stopped);
    // The running task completed; the queued ones were cancelled.
    assert_eq!(blocker.join().unwrap(), 1);
    for filler in fillers {
        assert_eq!(filler.join(), Err(TaskError::Cancelled));
    }
    assert!(pool.statistics().cancelled >= 4);
}

#[test]
fn test_graceful_stop_drains_backlog() {
    let pool = ThreadPool::new(2, 32);
    pool.start();

    for _ in 0..30 {
        pool.post(|| thread::sleep(Duration::from_millis(2)));
    }
    pool.stop(StopMode::Graceful);

    let stats = pool.statistics();
    assert_eq!(stats.completed, 30);
    assert_eq!(stats.pending_tasks, 0);
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn test_drop_stops_gracefully() {
    let done = Arc::new(AtomicBool::new(false));
    {
        let pool = ThreadPool::new(1, 8);
        pool.start();
        let done = Arc::clone(&done);
        pool.post(move || {
            thread::sleep(Duration::from_millis(50));
            done.store(true, Ordering::Release);
        });
        // Dropping the pool must wait for the task.
    }
    assert!(done.load(Ordering::Acquire));
}

#[test]
fn test_shutdown_within_finishes_gracefully_under_deadline() {
    let pool = ThreadPool::new(2, 16);
    pool.start();
    for _ in 0..10 {
        pool.post(|| thread::sleep(Duration::from_millis(1)));
    }
    pool.shutdown_within(Duration::from_secs(5));
    let stats = pool.statistics();
    assert_eq!(stats.completed, 10);
    assert_eq!(stats.cancelled, 0);
    assert_eq!(pool.state(), PoolState::Stopped);
}

#[test]
fn test_shutdown_within_escalates_on_deadline() {
    let pool = Arc::new(ThreadPool::new(1, 8));
    pool.start();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    pool.post(move || {
        gate_rx.recv().ok();
    });
    wait_until(Duration::from_secs(1), || pool.active_tasks() == 1);

    let fillers: Vec<_> = (0..2).map(|i| pool.submit(move || i)).collect();
    wait_until(Duration::from_secs(1), || pool.pending() == 2);

    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.shutdown_within(Duration::from_millis(100)))
    };
    // Escalation clears the queue once the deadline passes.
    wait_until(Duration::from_secs(2), || pool.pending() == 0);
    gate_tx.send(()).unwrap();
    stopper.join().unwrap();

    assert_eq!(pool.state(), PoolState::Stopped);
    for filler in fillers {
        assert_eq!(filler.join(), Err(TaskError::Cancelled));
    }
}

#[test]
fn test_stop_wakes_producer_parked_on_full_queue() {
    let pool = Arc::new(ThreadPool::new(1, 4));
    pool.start();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    pool.post(move || {
        gate_rx.recv().ok();
    });
    wait_until(Duration::from_secs(1), || pool.active_tasks() == 1);
    for _ in 0..4 {
        pool.post(|| {});
    }
    wait_until(Duration::from_secs(1), || pool.pending() == 4);

    // This submitter parks in the Block policy on a full queue.
    let parked = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.submit(|| 9).join())
    };
    thread::sleep(Duration::from_millis(50));

    let stopper = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.stop(StopMode::Force))
    };
    wait_until(Duration::from_secs(1), || pool.pending() == 0);
    gate_tx.send(()).unwrap();
    stopper.join().unwrap();

    // Closing the queue released the parked producer with a rejection.
    let outcome = parked.join().unwrap();
    assert!(matches!(
        outcome,
        Err(TaskError::Stopped) | Err(TaskError::Cancelled)
    ));
    assert_eq!(pool.state(), PoolState::Stopped);
}
