// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use sweepq::{DispatchError, DispatcherConfig};

// Only test in this binary: the global dispatcher lives for the whole process.
#[test]
fn test_global_dispatcher_lifecycle() {
    assert_eq!(sweepq::global().unwrap_err(), DispatchError::NotInitialized);

    let dispatcher =
        sweepq::init_global(DispatcherConfig::default().with_concurrency_limit(2)).unwrap();
    assert_eq!(dispatcher.concurrency_limit(), 2);

    assert_eq!(
        sweepq::init_global(DispatcherConfig::default()).unwrap_err(),
        DispatchError::AlreadyInitialized
    );

    let c = Arc::new(AtomicUsize::new(0));
    for _ in 0..5 {
        let c = c.clone();
        sweepq::global().unwrap().submit(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
    }
    let report = sweepq::global().unwrap().wait_for_completion();
    assert_eq!(report.finished, 5);
    assert_eq!(c.load(Ordering::SeqCst), 5);
}
