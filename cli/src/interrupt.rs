use std::sync::atomic::AtomicBool;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Makes SIGINT set the returned flag instead of killing the harness.
///
/// The engine shares the terminal process group so it gets the signal too and the
/// suite runner sees it stop.
#[cfg(unix)]
#[expect(unsafe_code)]
pub fn install() -> &'static AtomicBool {
    use std::sync::atomic::Ordering;

    extern "C" fn on_interrupt(_: libc::c_int) {
        INTERRUPTED.store(true, Ordering::SeqCst);
    }

    // SAFETY: the handler only stores into an atomic, which is async-signal-safe
    let previous = unsafe { libc::signal(libc::SIGINT, on_interrupt as libc::sighandler_t) };
    if previous == libc::SIG_ERR {
        tracing::warn!("failed to install the SIGINT handler");
    }
    &INTERRUPTED
}

#[cfg(not(unix))]
pub fn install() -> &'static AtomicBool {
    &INTERRUPTED
}
