//! Supervisor thread: polls the two workers' finished flags every 10ms
//! (the same interval as `mimiioAsynchronousCallbackAPIMonitor`), and as
//! soon as either worker records an error, requests shutdown and forces
//! the socket closed so the other worker unblocks promptly.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::SharedState;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Blocks until both workers have finished, forcing shutdown as soon as
/// the first error appears. Returns the first recorded error code, or 0
/// if both workers finished cleanly.
pub fn run_monitor(shared: Arc<SharedState>) -> i32 {
    let mut shutdown_issued = false;
    loop {
        let tx_done = shared.tx_finished.load(Ordering::SeqCst);
        let rx_done = shared.rx_finished.load(Ordering::SeqCst);
        let error = shared.first_error.load(Ordering::SeqCst);

        if error != 0 && !shutdown_issued {
            shared.shutdown_requested.store(true, Ordering::SeqCst);
            shared.socket.shutdown();
            shutdown_issued = true;
        }

        if tx_done && rx_done {
            return shared.first_error.load(Ordering::SeqCst);
        }

        thread::sleep(POLL_INTERVAL);
    }
}
