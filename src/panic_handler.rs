use log::{error, warn};
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};

/// Boxed panic hook, as returned by [`panic::take_hook`]
pub type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

thread_local! {
    static CONTAINED: Cell<bool> = const { Cell::new(false) };
}

/// Install panic hooks. Debug builds print readable backtraces, release
/// builds write a crash report; both also log the panic.
///
/// Panics raised inside [`catch_contained`] are recovered by the caller, so
/// they are only logged and never reach the crash reporters.
pub fn initialize_panic_handler() {
    if cfg!(debug_assertions) {
        better_panic::install();
    } else {
        human_panic::setup_panic!();
    }

    panic::set_hook(logging_hook(panic::take_hook()));
}

/// Wrap `next` with logging; contained panics stop at the log line
#[must_use]
pub fn logging_hook(next: PanicHook) -> PanicHook {
    Box::new(move |panic_info| {
        let thread = std::thread::current();
        let name = thread.name().unwrap_or("<unnamed>");
        if panic_is_contained() {
            warn!("recovered panic on thread {name}: {panic_info}");
            return;
        }
        error!("panic on thread {name}: {panic_info}");
        next(panic_info);
    })
}

/// Run `f`, turning a panic into `Err` without treating it as a crash
pub fn catch_contained<R>(f: impl FnOnce() -> R) -> std::thread::Result<R> {
    let outer = CONTAINED.with(|flag| flag.replace(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    CONTAINED.with(|flag| flag.set(outer));
    result
}

/// Whether the current thread is inside [`catch_contained`]
#[must_use]
pub fn panic_is_contained() -> bool {
    CONTAINED.with(Cell::get)
}
