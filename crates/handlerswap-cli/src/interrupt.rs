use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Turns SIGINT and SIGTERM into a stop request for as long as it lives.
/// Batches poll the flag between domains; outside a batch the default
/// signal action applies.
pub(crate) struct InterruptGuard {
    _armed: (),
}

impl InterruptGuard {
    pub(crate) fn arm() -> Self {
        INTERRUPTED.store(false, Ordering::SeqCst);
        install_stop_handlers();
        Self { _armed: () }
    }

    pub(crate) fn flag(&self) -> &'static AtomicBool {
        &INTERRUPTED
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        restore_default_handlers();
    }
}

#[cfg(unix)]
fn install_stop_handlers() {
    unsafe extern "C" fn handler(signal: i32) {
        if matches!(signal, libc::SIGINT | libc::SIGTERM) {
            INTERRUPTED.store(true, Ordering::SeqCst);
        }
    }

    unsafe {
        let handler_ptr = handler as *const () as libc::sighandler_t;
        libc::signal(libc::SIGINT, handler_ptr);
        libc::signal(libc::SIGTERM, handler_ptr);
    }
}

#[cfg(unix)]
fn restore_default_handlers() {
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
        libc::signal(libc::SIGTERM, libc::SIG_DFL);
    }
}

#[cfg(not(unix))]
fn install_stop_handlers() {}

#[cfg(not(unix))]
fn restore_default_handlers() {}
