//! Integration tests for the execution bridge.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use pageflow_bridge::{
    AsyncBridge, BridgeConfig, CachePolicy, CacheStatus, ManualClock, TaskError,
};

const IDLE: Duration = Duration::from_secs(10);

fn bridge() -> AsyncBridge {
    AsyncBridge::new(BridgeConfig::default()).expect("start bridge")
}

fn bridge_with_clock() -> (AsyncBridge, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let bridge = AsyncBridge::with_clock(BridgeConfig::default(), clock.clone()).expect("bridge");
    (bridge, clock)
}

type Deliveries<T> = Rc<RefCell<Vec<T>>>;

fn collect<T: 'static>(log: &Deliveries<T>) -> impl FnMut(T) + 'static {
    let log = Rc::clone(log);
    move |value| log.borrow_mut().push(value)
}

fn counted<T: Send + 'static>(
    counter: &Arc<AtomicUsize>,
    value: T,
) -> impl FnOnce() -> anyhow::Result<T> + Send + 'static {
    let counter = Arc::clone(counter);
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }
}

fn fail_on_error(error: TaskError) {
    panic!("unexpected task error: {error}");
}

#[test]
fn run_async_delivers_on_ui_thread_only_when_drained() {
    let bridge = bridge();
    let ui_thread = thread::current().id();
    let delivered: Deliveries<(i32, thread::ThreadId)> = Rc::default();
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);

    let sink = Rc::clone(&delivered);
    bridge.run_async(
        move || {
            done_tx.send(thread::current().id()).ok();
            Ok(21 * 2)
        },
        move |value| sink.borrow_mut().push((value, thread::current().id())),
        fail_on_error,
    );

    let worker_thread = done_rx.recv_timeout(IDLE).expect("task ran");
    assert_ne!(worker_thread, ui_thread);
    thread::sleep(Duration::from_millis(20));
    assert!(delivered.borrow().is_empty(), "never delivered inline");

    assert!(bridge.run_until_idle(IDLE));
    assert_eq!(*delivered.borrow(), vec![(42, ui_thread)]);
}

#[test]
fn run_async_error_goes_to_on_error_only() {
    let bridge = bridge();
    let successes: Deliveries<u8> = Rc::default();
    let errors: Deliveries<String> = Rc::default();

    let sink = Rc::clone(&errors);
    bridge.run_async(
        || -> anyhow::Result<u8> { anyhow::bail!("server unavailable") },
        collect(&successes),
        move |error| sink.borrow_mut().push(error.to_string()),
    );

    assert!(bridge.run_until_idle(IDLE));
    assert!(successes.borrow().is_empty());
    assert_eq!(
        *errors.borrow(),
        vec!["task failed: server unavailable".to_string()]
    );
}

#[test]
fn panicking_task_is_reported_as_error() {
    let bridge = bridge();
    let errors: Deliveries<TaskError> = Rc::default();

    bridge.run_async(
        || -> anyhow::Result<()> { panic!("worker exploded") },
        |()| panic!("no success expected"),
        collect(&errors),
    );

    assert!(bridge.run_until_idle(IDLE));
    assert!(matches!(
        errors.borrow().as_slice(),
        [TaskError::Panicked(message)] if message == "worker exploded"
    ));
}

#[test]
fn cancelled_request_is_not_delivered() {
    let bridge = bridge();
    let delivered: Deliveries<i32> = Rc::default();

    let handle = bridge.run_async(|| Ok(1), collect(&delivered), fail_on_error);
    handle.cancel();

    assert!(handle.is_cancelled());
    assert!(bridge.run_until_idle(IDLE));
    assert!(delivered.borrow().is_empty());
    assert_eq!(bridge.outstanding(), 0);
}

#[test]
fn zero_ttl_runs_task_every_time() {
    let bridge = bridge();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<&'static str> = Rc::default();

    for _ in 0..2 {
        bridge.run_async_cached(
            "k",
            CachePolicy::seconds(0),
            counted(&runs, "v"),
            collect(&delivered),
            fail_on_error,
        );
    }

    assert!(bridge.run_until_idle(IDLE));
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(delivered.borrow().len(), 2);
    assert_eq!(bridge.cache_status("k"), Some(CacheStatus::Stale));
}

#[test]
fn zero_ttl_call_serves_fresh_entry() {
    let bridge = bridge();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<&'static str> = Rc::default();

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(300),
        counted(&runs, "A"),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(0),
        counted(&runs, "B"),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(*delivered.borrow(), ["A", "A"]);
    assert_eq!(bridge.cache_status("k"), Some(CacheStatus::Fresh));
}

#[test]
fn zero_ttl_result_feeds_revalidation() {
    let (bridge, clock) = bridge_with_clock();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<&'static str> = Rc::default();

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(0),
        counted(&runs, "A"),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));
    assert_eq!(bridge.cache_status("k"), Some(CacheStatus::Stale));
    assert_eq!(bridge.get_cached::<&'static str>("k"), None);

    clock.advance(Duration::from_secs(1));
    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(60).revalidate(),
        counted(&runs, "B"),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(*delivered.borrow(), ["A", "A", "B"]);
    assert_eq!(bridge.get_cached::<&'static str>("k"), Some("B"));
}

#[test]
fn concurrent_requests_share_one_fetch() {
    let bridge = bridge();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<String> = Rc::default();
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

    const CALLERS: usize = 5;
    for _ in 0..CALLERS {
        let runs = Arc::clone(&runs);
        let release = release_rx.clone();
        bridge.run_async_cached(
            "users",
            CachePolicy::seconds(60),
            move || {
                runs.fetch_add(1, Ordering::SeqCst);
                release.recv().ok();
                Ok("user list".to_string())
            },
            collect(&delivered),
            fail_on_error,
        );
    }
    assert_eq!(bridge.cache_status("users"), Some(CacheStatus::Fetching));

    release_tx.send(()).expect("release fetch");
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(delivered.borrow().len(), CALLERS);
    assert!(delivered.borrow().iter().all(|v| v == "user list"));
    assert_eq!(bridge.cache_status("users"), Some(CacheStatus::Fresh));
}

#[test]
fn fresh_entry_is_served_without_running_task() {
    let (bridge, _clock) = bridge_with_clock();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<u32> = Rc::default();

    bridge.run_async_cached(
        "n",
        CachePolicy::seconds(30),
        counted(&runs, 1),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));

    bridge.run_async_cached(
        "n",
        CachePolicy::seconds(30),
        counted(&runs, 2),
        collect(&delivered),
        fail_on_error,
    );
    assert_eq!(bridge.process_pending(), 1, "hit is queued, not inline");

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(*delivered.borrow(), vec![1, 1]);
    assert_eq!(bridge.get_cached::<u32>("n"), Some(1));
}

#[test]
fn stale_entry_without_revalidate_is_refetched_once() {
    let (bridge, clock) = bridge_with_clock();
    let delivered: Deliveries<&'static str> = Rc::default();
    let runs = Arc::new(AtomicUsize::new(0));

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(10),
        counted(&runs, "old"),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));
    clock.advance(Duration::from_secs(11));
    assert_eq!(bridge.cache_status("k"), Some(CacheStatus::Stale));
    assert_eq!(bridge.get_cached::<&'static str>("k"), None);

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(10),
        counted(&runs, "new"),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(*delivered.borrow(), vec!["old", "new"]);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(bridge.cache_status("k"), Some(CacheStatus::Fresh));
}

#[test]
fn revalidate_delivers_stale_then_fresh() {
    let (bridge, clock) = bridge_with_clock();
    let delivered: Deliveries<String> = Rc::default();

    bridge.run_async_cached(
        "u1",
        CachePolicy::seconds(300),
        || Ok("A".to_string()),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));
    delivered.borrow_mut().clear();

    clock.advance(Duration::from_secs(301));
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);
    bridge.run_async_cached(
        "u1",
        CachePolicy::seconds(300).revalidate(),
        move || {
            release_rx.recv().ok();
            Ok("B".to_string())
        },
        collect(&delivered),
        fail_on_error,
    );

    // The stale value is available before the refresh finishes.
    assert_eq!(bridge.process_pending(), 1);
    assert_eq!(*delivered.borrow(), vec!["A".to_string()]);

    release_tx.send(()).expect("release fetch");
    assert!(bridge.run_until_idle(IDLE));
    assert_eq!(*delivered.borrow(), vec!["A".to_string(), "B".to_string()]);
    assert_eq!(bridge.get_cached::<String>("u1").as_deref(), Some("B"));
}

#[test]
fn failed_revalidation_keeps_stale_entry() {
    let (bridge, clock) = bridge_with_clock();
    let delivered: Deliveries<i32> = Rc::default();
    let errors: Deliveries<TaskError> = Rc::default();

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(5),
        || Ok(7),
        collect(&delivered),
        fail_on_error,
    );
    assert!(bridge.run_until_idle(IDLE));
    let stored_at = bridge.cache_entry("k").expect("entry").created_at;

    clock.advance(Duration::from_secs(6));
    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(5).revalidate(),
        || -> anyhow::Result<i32> { anyhow::bail!("offline") },
        collect(&delivered),
        collect(&errors),
    );
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(*delivered.borrow(), vec![7, 7]);
    assert_eq!(errors.borrow().len(), 1);
    assert_eq!(bridge.cache_status("k"), Some(CacheStatus::Stale));
    let entry = bridge.cache_entry("k").expect("stale entry kept");
    assert_eq!(entry.created_at, stored_at);
    assert_eq!(entry.value::<i32>(), Some(&7));
}

#[test]
fn failed_cold_fetch_leaves_key_empty() {
    let bridge = bridge();
    let errors: Deliveries<TaskError> = Rc::default();

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(60),
        || -> anyhow::Result<i32> { anyhow::bail!("offline") },
        |_| panic!("no success expected"),
        collect(&errors),
    );
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(errors.borrow().len(), 1);
    assert_eq!(bridge.cache_status("k"), None);
    assert_eq!(bridge.cached_len(), 0);
}

#[test]
fn invalidate_forces_refetch() {
    let bridge = bridge();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<u8> = Rc::default();

    for _ in 0..2 {
        bridge.run_async_cached(
            "k",
            CachePolicy::seconds(60),
            counted(&runs, 1),
            collect(&delivered),
            fail_on_error,
        );
        assert!(bridge.run_until_idle(IDLE));
        bridge.invalidate("k");
        assert_eq!(bridge.cache_status("k"), None);
    }

    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn invalidate_all_clears_every_key() {
    let bridge = bridge();
    for key in ["a", "b", "c"] {
        bridge.run_async_cached(
            key,
            CachePolicy::seconds(60),
            || Ok(0_u8),
            |_| {},
            fail_on_error,
        );
    }
    assert!(bridge.run_until_idle(IDLE));
    assert_eq!(bridge.cached_len(), 3);

    bridge.invalidate_all();
    assert_eq!(bridge.cached_len(), 0);
}

#[test]
fn mismatched_type_on_shared_key_reports_error() {
    let bridge = bridge();
    let errors: Deliveries<TaskError> = Rc::default();
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(60),
        move || {
            release_rx.recv().ok();
            Ok(1_u32)
        },
        |_| {},
        fail_on_error,
    );
    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(60),
        || Ok("never runs".to_string()),
        |_| panic!("no success expected"),
        collect(&errors),
    );

    release_tx.send(()).expect("release fetch");
    assert!(bridge.run_until_idle(IDLE));
    assert!(matches!(
        errors.borrow().as_slice(),
        [TaskError::TypeMismatch { key, .. }] if key == "k"
    ));
}

#[test]
fn ui_handle_posts_from_other_threads() {
    let bridge = bridge();
    let ui = bridge.ui_handle();
    let ran = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let ui = ui.clone();
            let ran = Arc::clone(&ran);
            thread::spawn(move || {
                ui.post(move || {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
            })
        })
        .collect();
    for worker in workers {
        assert!(worker.join().expect("poster thread"));
    }

    assert_eq!(ran.load(Ordering::SeqCst), 0);
    assert_eq!(bridge.process_pending(), 4);
    assert_eq!(ran.load(Ordering::SeqCst), 4);
}

#[test]
fn worker_pool_is_bounded() {
    let bridge = AsyncBridge::new(BridgeConfig::default().with_max_workers(2)).expect("bridge");
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for _ in 0..6 {
        let running = Arc::clone(&running);
        let peak = Arc::clone(&peak);
        bridge.run_async(
            move || {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(30));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            },
            |()| {},
            fail_on_error,
        );
    }

    assert!(bridge.run_until_idle(IDLE));
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[test]
fn submissions_after_shutdown_fail() {
    let bridge = bridge();
    bridge.shutdown();
    assert!(bridge.is_shut_down());

    let errors: Deliveries<TaskError> = Rc::default();
    bridge.run_async(|| Ok(()), |()| {}, collect(&errors));
    bridge.run_async_cached(
        "k",
        CachePolicy::seconds(60),
        || Ok(()),
        |()| {},
        collect(&errors),
    );

    assert!(bridge.run_until_idle(IDLE));
    assert!(
        errors
            .borrow()
            .iter()
            .all(|error| matches!(error, TaskError::Shutdown))
    );
    assert_eq!(errors.borrow().len(), 2);
}

#[test]
fn shutdown_fails_tasks_that_never_started() {
    let bridge = AsyncBridge::new(BridgeConfig::default().with_max_workers(1)).expect("bridge");
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let values: Deliveries<u32> = Rc::default();
    let errors: Deliveries<TaskError> = Rc::default();

    bridge.run_async(
        move || {
            started_tx.send(()).ok();
            thread::sleep(Duration::from_millis(50));
            Ok(1)
        },
        collect(&values),
        collect(&errors),
    );
    started_rx.recv_timeout(IDLE).expect("first task started");
    bridge.run_async(|| Ok(2), collect(&values), collect(&errors));

    bridge.shutdown();
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(*values.borrow(), [1]);
    assert_eq!(errors.borrow().len(), 1);
    assert!(matches!(errors.borrow()[0], TaskError::Shutdown));
}

#[test]
fn request_after_invalidate_starts_new_fetch() {
    let bridge = bridge();
    let runs = Arc::new(AtomicUsize::new(0));
    let delivered: Deliveries<&'static str> = Rc::default();
    let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

    let first_runs = Arc::clone(&runs);
    bridge.run_async_cached(
        "u",
        CachePolicy::seconds(60),
        move || {
            first_runs.fetch_add(1, Ordering::SeqCst);
            release_rx.recv().ok();
            Ok("before-write")
        },
        collect(&delivered),
        fail_on_error,
    );
    assert_eq!(bridge.cache_status("u"), Some(CacheStatus::Fetching));

    bridge.invalidate("u");
    assert_eq!(bridge.cache_status("u"), None);

    bridge.run_async_cached(
        "u",
        CachePolicy::seconds(60),
        counted(&runs, "after-write"),
        collect(&delivered),
        fail_on_error,
    );
    release_tx.send(()).expect("release first fetch");
    assert!(bridge.run_until_idle(IDLE));

    assert_eq!(runs.load(Ordering::SeqCst), 2);
    let mut values = delivered.borrow().clone();
    values.sort_unstable();
    assert_eq!(values, ["after-write", "before-write"]);
    assert_eq!(bridge.get_cached::<&'static str>("u"), Some("after-write"));
}
