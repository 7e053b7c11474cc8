use dynpool::{PoolConfig, QueuePolicy, StopMode, ThreadPool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn wait_until(limit: Duration, mut cond: impl FnMut() -> bool) {
    let start = Instant::now();
    while !cond() {
        if start.elapsed() > limit {
            panic!("condition not reached within {:?}", limit);
        }
        thread::sleep(Duration::from_millis(5));
    }
}

fn scaling_config() -> PoolConfig {
    PoolConfig {
        queue_cap: 64,
        core_threads: 1,
        max_threads: 4,
        load_check_interval: Duration::from_millis(10),
        keep_alive: Duration::from_millis(50),
        scale_up_threshold: 0.75,
        scale_down_threshold: 0.25,
        pending_hi: 2,
        pending_low: 1,
        debounce_hits: 1,
        cooldown: Duration::from_millis(10),
        queue_policy: QueuePolicy::Block,
    }
}

#[test]
fn test_scale_up_under_backlog_and_fall_back_when_idle() {
    init_logging();
    let pool = ThreadPool::with_config(scaling_config());
    pool.start();
    assert_eq!(pool.current_threads(), 1);

    // Park every worker the controller gives us until released.
    let release = Arc::new(AtomicBool::new(false));
    for _ in 0..12 {
        let release = Arc::clone(&release);
        pool.post(move || {
            while !release.load(Ordering::Acquire) {
                thread::sleep(Duration::from_millis(1));
            }
        });
    }

    wait_until(Duration::from_secs(2), || pool.current_threads() > 1);
    // The worker set never exceeds the configured maximum.
    wait_until(Duration::from_secs(2), || pool.current_threads() == 4);
    assert!(pool.statistics().peak_threads == 4);

    release.store(true, Ordering::Release);
    // After the drain the pool falls back to its core size within a few
    // keep-alive intervals.
    wait_until(Duration::from_secs(5), || {
        assert!(pool.current_threads() <= 4);
        pool.current_threads() == 1 && pool.pending() == 0
    });

    pool.stop(StopMode::Graceful);
    let stats = pool.statistics();
    assert_eq!(stats.completed, 12);
    assert!(stats.threads_created >= 4);
}

#[test]
fn test_trigger_load_check_bypasses_interval() {
    init_logging();
    let cfg = PoolConfig {
        // An interval far longer than the test: growth can only come from
        // the manual kick.
        load_check_interval: Duration::from_secs(30),
        cooldown: Duration::from_secs(30),
        core_threads: 1,
        max_threads: 2,
        pending_hi: 1,
        debounce_hits: 1,
        queue_cap: 16,
        ..scaling_config()
    };
    let pool = ThreadPool::with_config(cfg);
    pool.start();

    let (gate_tx, gate_rx) = mpsc::channel::<()>();
    pool.post(move || {
        gate_rx.recv().ok();
    });
    wait_until(Duration::from_secs(1), || pool.active_tasks() == 1);
    pool.post(|| {});
    pool.post(|| {});
    wait_until(Duration::from_secs(1), || pool.pending() == 2);

    assert_eq!(pool.current_threads(), 1);
    pool.trigger_load_check();
    wait_until(Duration::from_secs(1), || pool.current_threads() == 2);

    gate_tx.send(()).unwrap();
    pool.stop(StopMode::Graceful);
}

#[test]
fn test_worker_count_stays_within_bounds() {
    init_logging();
    let pool = ThreadPool::with_config(scaling_config());
    pool.start();

    // Bursty load while the gauge is sampled between submissions.
    for burst in 0..5u64 {
        for _ in 0..20 {
            pool.post(move || {
                thread::sleep(Duration::from_millis(1 + burst % 3));
            });
        }
        for _ in 0..20 {
            let current = pool.current_threads();
            assert!(
                (1..=4).contains(&current),
                "worker count {} out of bounds",
                current
            );
            thread::sleep(Duration::from_millis(2));
        }
    }

    pool.stop(StopMode::Graceful);
    assert_eq!(pool.statistics().completed, 100);
}
