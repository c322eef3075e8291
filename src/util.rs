use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use futures::Future;
use futures::FutureExt;

use crate::{
    error::{panic_payload, take_panic_crash_id, CrashId},
    AppError, AppResult,
};

fn app_error_from_panic(payload: Box<dyn Any + Send>) -> AppError {
    let message = panic_payload(payload.as_ref());
    let crash_id = take_panic_crash_id().unwrap_or_default();

    let mut error = AppError::new("RUNTIME/PANIC", message);
    error.set_crash_id(crash_id);
    error.log_with_event("panic_caught");
    error
}

#[allow(clippy::result_large_err)]
fn dispatch_with_fence<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> T,
{
    catch_unwind(AssertUnwindSafe(f)).map_err(app_error_from_panic)
}

/// Run a bridge handler so that a panic, whether building the future or polling it,
/// comes back as a `RUNTIME/PANIC` error instead of unwinding into the IPC layer.
#[allow(clippy::result_large_err)]
pub async fn dispatch_async_app_result<F, Fut, T>(f: F) -> AppResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let fut = dispatch_with_fence(|| AssertUnwindSafe(f()).catch_unwind())?;
    match fut.await {
        Ok(result) => result,
        Err(payload) => Err(app_error_from_panic(payload)),
    }
}
