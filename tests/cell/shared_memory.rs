//! Shared Memory Tests
//!
//! The concurrency scenarios again, with forked child processes operating on
//! a cell in shared memory. Fewer repetitions than the thread suite, since
//! every job costs a fork.

use crate::*;
use syncnum::SharedMemoryBacking;

type SharedCell<T> = SynchronizedCell<T, SharedMemoryBacking<T>>;

fn shared<T: Numeric>(initial: T) -> Arc<SharedCell<T>> {
    Arc::new(SynchronizedCell::shared(initial, LockMode::Blocking).expect("mmap failed"))
}

fn run_processes<T, F>(cell: &Arc<SharedCell<T>>, operands: &[T], op: F)
where
    T: Numeric,
    F: Fn(&SharedCell<T>, T) + Copy + Send + 'static,
{
    run_all(&ProcessLauncher::new(), jobs_for(cell, operands, op));
}

fn in_window(x: f64) -> bool {
    50.0 < x && x < 100.0
}

#[test]
fn test_shared_cell_reports_scope() {
    let cell = shared(0i32);
    assert_eq!(cell.sharing(), Sharing::CrossProcess);
    assert_eq!(cell.lock_mode(), LockMode::Blocking);
}

#[test]
fn test_processes_increment() {
    for _ in 0..PROCESS_TRIALS {
        let cell = shared(0.0f64);
        run_processes(&cell, &[50.0, 100.0], |c, d| {
            c.increment(d).unwrap();
        });
        assert_eq!(*cell, 150.0);
    }
}

#[test]
fn test_processes_decrement() {
    for _ in 0..PROCESS_TRIALS {
        let cell = shared(150.0f64);
        run_processes(&cell, &[50.0, 100.0], |c, d| {
            c.decrement(d).unwrap();
        });
        assert_eq!(*cell, 0.0);
    }
}

#[test]
fn test_processes_thresholds() {
    for _ in 0..PROCESS_TRIALS {
        let strict = shared(0.0f64);
        run_processes(&strict, &[100.0, 100.0], |c, d| {
            c.increment_if_less_than(d, 100.0, false).unwrap();
        });
        assert_eq!(*strict, 100.0);

        let inclusive = shared(0.0f64);
        run_processes(&inclusive, &[100.0, 100.0], |c, d| {
            c.increment_if_less_than(d, 100.0, true).unwrap();
        });
        assert_eq!(*inclusive, 200.0);

        let floor = shared(200.0f64);
        run_processes(&floor, &[100.0, 100.0], |c, d| {
            c.decrement_if_greater_than(d, 100.0, false).unwrap();
        });
        assert_eq!(*floor, 100.0);
    }
}

#[test]
fn test_processes_predicate_window() {
    for _ in 0..PROCESS_TRIALS {
        let up = shared(51.0f64);
        run_processes(&up, &[40.0; 3], |c, d| {
            c.increment_if(d, in_window).unwrap();
        });
        assert_eq!(*up, 131.0);

        let down = shared(99.0f64);
        run_processes(&down, &[40.0; 3], |c, d| {
            c.decrement_if(d, in_window).unwrap();
        });
        assert_eq!(*down, 19.0);

        let grow = shared(51.0f64);
        run_processes(&grow, &[1.5; 3], |c, f| {
            c.multiply_if(f, in_window).unwrap();
        });
        assert_eq!(*grow, 114.75);

        let shrink = shared(99.0f64);
        run_processes(&shrink, &[1.5; 3], |c, f| {
            c.divide_if(f, in_window).unwrap();
        });
        assert_eq!(*shrink, 44.0);
    }
}

#[test]
fn test_processes_multiply_divide() {
    for _ in 0..PROCESS_TRIALS {
        let product = shared(1.0f64);
        run_processes(&product, &[5.0, 10.0], |c, f| {
            c.multiply(f).unwrap();
        });
        assert_eq!(*product, 50.0);

        let quotient = shared(50.0f64);
        run_processes(&quotient, &[7.0, 10.0], |c, f| {
            c.divide(f).unwrap();
        });
        assert!((quotient.get() - 0.714_285_714).abs() < 1e-6);
    }
}

#[test]
fn test_threads_and_processes_agree() {
    let scenarios: [(f64, f64); 4] = [(51.0, 40.0), (99.0, -40.0), (0.0, 100.0), (150.0, 25.0)];

    for (initial, delta) in scenarios {
        let threaded = Arc::new(SynchronizedCell::new(initial));
        run_all(
            &ThreadLauncher::new(),
            jobs_for(&threaded, &[delta; 3], |c: &SynchronizedCell<f64>, d| {
                c.increment_if(d, in_window).unwrap();
            }),
        );

        let forked = shared(initial);
        run_processes(&forked, &[delta; 3], |c, d| {
            c.increment_if(d, in_window).unwrap();
        });

        assert!(*threaded == *forked, "{threaded} != {forked} from {initial}");
    }
}

#[test]
fn test_processes_exact_sum() {
    const CHILDREN: usize = 4;
    const PER_CHILD: u64 = 2000;

    let cell = shared(0u64);
    let jobs = jobs_for(&cell, &[PER_CHILD; CHILDREN], |c: &SharedCell<u64>, n| {
        for _ in 0..n {
            c.increment(1).unwrap();
        }
    });
    run_all(&ProcessLauncher::new(), jobs);
    assert_eq!(*cell, CHILDREN as u64 * PER_CHILD);
}

#[test]
fn test_threads_and_processes_on_one_cell() {
    let cell = shared(0i64);
    let forked = jobs_for(&cell, &[500i64; 2], |c: &SharedCell<i64>, n| {
        for _ in 0..n {
            c.increment(1).unwrap();
        }
    });
    let children: Vec<_> = forked
        .into_iter()
        .map(|job| spawn_process(job).unwrap())
        .collect();
    run_all(
        &ThreadLauncher::new(),
        jobs_for(&cell, &[500i64; 2], |c: &SharedCell<i64>, n| {
            for _ in 0..n {
                c.increment(1).unwrap();
            }
        }),
    );
    for child in children {
        child.join().unwrap();
    }
    assert_eq!(*cell, 2000);
}

#[test]
fn test_child_sees_lock_held_by_parent() {
    let cell = Arc::new(SynchronizedCell::shared(10.0f64, LockMode::NonBlocking).unwrap());
    let guard = cell.backing().lock();

    let child = {
        let cell = Arc::clone(&cell);
        spawn_process(move || {
            assert!(matches!(cell.increment(1.0), Err(CellError::LockAcquisition)));
            assert!(matches!(cell.try_get(), Err(CellError::LockAcquisition)));
        })
        .unwrap()
    };
    child.join().unwrap();

    drop(guard);
    assert_eq!(*cell, 10.0);
}

#[test]
fn test_predicate_error_in_child_releases_lock() {
    let cell = shared(99.0f64);
    let child = {
        let cell = Arc::clone(&cell);
        spawn_process(move || {
            let err = cell
                .try_decrement_if(40.0, |_| Err::<bool, _>("unreadable threshold"))
                .unwrap_err();
            assert!(err.is_predicate());
        })
        .unwrap()
    };
    child.join().unwrap();

    assert!(!cell.is_locked());
    assert!(cell.decrement(40.0).unwrap());
    assert_eq!(*cell, 59.0);
}

#[test]
fn test_child_panic_with_lock_released() {
    let cell = shared(1i32);
    let child = {
        let cell = Arc::clone(&cell);
        spawn_process(move || {
            let _ = cell.increment_if(1, |_| panic!("predicate bug"));
        })
        .unwrap()
    };
    assert!(matches!(
        child.join(),
        Err(LaunchError::ChildFailed { exit: syncnum::ChildExit::Code(code), .. })
            if code == syncnum::CHILD_PANIC_EXIT_CODE
    ));
    assert!(!cell.is_locked());
    assert_eq!(*cell, 1);
}

#[test]
fn test_in_process_cell_does_not_follow_child() {
    let cell = Arc::new(SynchronizedCell::new(0.0f64));
    let child = {
        let cell = Arc::clone(&cell);
        spawn_process(move || {
            cell.increment(50.0).unwrap();
            assert_eq!(*cell, 50.0);
        })
        .unwrap()
    };
    child.join().unwrap();
    assert_eq!(*cell, 0.0);
}

#[test]
fn test_builder_shared_cell_across_processes() {
    let cell = Arc::new(CellBuilder::new().shared().build(0.0f64).unwrap());
    assert!(cell.sharing().is_shared());
    let jobs = jobs_for(&cell, &[50.0, 100.0], |c: &ConfiguredCell<f64>, d| {
        c.increment(d).unwrap();
    });
    run_all(&ProcessLauncher::new(), jobs);
    assert_eq!(*cell, 150.0);
}

fn observed_failures<B>(cell: SynchronizedCell<u64, B>) -> usize
where
    B: Backing<u64> + 'static,
{
    use std::sync::atomic::{AtomicBool, Ordering};

    const OPS: usize = 50_000;

    let cell = Arc::new(cell);
    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let cell = Arc::clone(&cell);
        let done = Arc::clone(&done);
        spawn_thread(move || {
            while !done.load(Ordering::Relaxed) {
                std::hint::black_box(cell.is_locked());
            }
        })
        .unwrap()
    };

    let failures = (0..OPS).filter(|_| cell.increment(1).is_err()).count();
    done.store(true, Ordering::Relaxed);
    observer.join().unwrap();

    assert_eq!(*cell, (OPS - failures) as u64);
    failures
}

#[test]
fn test_is_locked_never_contends_with_operations() {
    let shared = SynchronizedCell::shared(0u64, LockMode::NonBlocking).unwrap();
    let in_process = SynchronizedCell::with_mode(0u64, LockMode::NonBlocking);
    assert_eq!(observed_failures(shared), 0);
    assert_eq!(observed_failures(in_process), 0);
}
