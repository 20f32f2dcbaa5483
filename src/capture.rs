//! Captured execution context for in-process tool calls.
//!
//! In-process backends run library code inside this process instead of
//! spawning a child. Each call goes through an [`InProcessContext`], which
//!
//! - serializes calls behind one process-wide lock,
//! - refuses to be entered again from a thread that already holds it
//!   (returning [`VcsError::Reentrant`] instead of deadlocking),
//! - swaps the global panic hook for a silent one while the call runs and
//!   restores the previous hook before returning, and
//! - records the call's output buffers and an exit code: 0 on success,
//!   1 when the call returns an error, 101 when it panics.
//!
//! The context is consumed by [`InProcessContext::run`], so it is used
//! exactly once. It is not safe for concurrent re-entry: the panic hook is
//! process-global, so a panic on an unrelated thread while a call is running
//! loses its default message.

use crate::error::{Result, VcsError};
use log::debug;
use std::any::Any;
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

static IN_PROCESS_LOCK: Mutex<()> = Mutex::new(());

thread_local! {
    static ACTIVE: Cell<bool> = const { Cell::new(false) };
}

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_PANIC: i32 = 101;

/// Output buffers an in-process call may write to
#[derive(Debug, Default)]
pub struct Streams {
    pub stdout: String,
    pub stderr: String,
}

/// Outcome of one in-process call
#[derive(Debug)]
pub struct Captured<T> {
    pub command: String,
    pub value: Option<T>,
    pub stdout: String,
    pub stderr: String,
    pub code: i32,
}

impl<T> Captured<T> {
    pub fn succeeded(&self) -> bool {
        self.code == EXIT_SUCCESS
    }

    /// Turn the capture into the call's value, or an error carrying the
    /// captured diagnostic (stderr, falling back to stdout)
    pub fn into_result(self) -> Result<T> {
        match self.value {
            Some(value) if self.code == EXIT_SUCCESS => Ok(value),
            _ => {
                let message = if self.stderr.trim().is_empty() {
                    self.stdout.trim().to_string()
                } else {
                    self.stderr.trim().to_string()
                };
                Err(VcsError::InProcess {
                    command: self.command,
                    code: self.code,
                    message,
                })
            }
        }
    }
}

/// Scoped guard around one in-process call
pub struct InProcessContext {
    command: String,
    _guard: MutexGuard<'static, ()>,
}

impl InProcessContext {
    /// Acquire the in-process lock for `command`
    pub fn enter(command: impl Into<String>) -> Result<Self> {
        let command = command.into();
        if ACTIVE.with(Cell::get) {
            return Err(VcsError::Reentrant(command));
        }

        let guard = IN_PROCESS_LOCK
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ACTIVE.with(|active| active.set(true));
        debug!("entering in-process call `{}`", command);

        Ok(InProcessContext {
            command,
            _guard: guard,
        })
    }

    /// Run the call, capturing its result, output and exit code
    pub fn run<T, E, F>(self, call: F) -> Captured<T>
    where
        F: FnOnce(&mut Streams) -> std::result::Result<T, E>,
        E: fmt::Display,
    {
        let mut streams = Streams::default();

        let previous_hook = panic::take_hook();
        panic::set_hook(Box::new(|_| {}));
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| call(&mut streams)));
        panic::set_hook(previous_hook);

        let (value, code) = match outcome {
            Ok(Ok(value)) => (Some(value), EXIT_SUCCESS),
            Ok(Err(e)) => {
                if streams.stderr.is_empty() {
                    streams.stderr = e.to_string();
                }
                (None, EXIT_FAILURE)
            }
            Err(payload) => {
                streams.stderr.push_str(&panic_message(payload.as_ref()));
                (None, EXIT_PANIC)
            }
        };
        debug!("in-process call `{}` finished with code {}", self.command, code);

        Captured {
            command: self.command.clone(),
            value,
            stdout: streams.stdout,
            stderr: streams.stderr,
            code,
        }
    }
}

impl Drop for InProcessContext {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(false));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "in-process call panicked".to_string()
    }
}

/// Enter a context for `command`, run `call` in it and convert the capture
/// into a plain result
pub fn in_process<T, E, F>(command: impl Into<String>, call: F) -> Result<T>
where
    F: FnOnce(&mut Streams) -> std::result::Result<T, E>,
    E: fmt::Display,
{
    InProcessContext::enter(command)?.run(call).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fmt::Write;

    #[test]
    #[serial]
    fn test_hello_world() {
        let captured = InProcessContext::enter("hello-world")
            .unwrap()
            .run(|streams| writeln!(streams.stdout, "hello world"));
        assert!(captured.succeeded());
        assert_eq!(captured.code, EXIT_SUCCESS);
        assert_eq!(captured.stdout, "hello world\n");
    }

    #[test]
    #[serial]
    fn test_error_exit_one() {
        let captured = InProcessContext::enter("exit-one")
            .unwrap()
            .run(|_| Err::<(), _>("who does this?"));
        assert_eq!(captured.code, EXIT_FAILURE);
        assert_eq!(captured.stderr, "who does this?");
        assert!(captured.value.is_none());
    }

    #[test]
    #[serial]
    fn test_error_keeps_written_stderr() {
        let captured = InProcessContext::enter("noisy").unwrap().run(|streams| {
            streams.stderr.push_str("detailed diagnostic");
            Err::<(), _>("short")
        });
        assert_eq!(captured.stderr, "detailed diagnostic");
    }

    #[test]
    #[serial]
    fn test_panic_is_captured() {
        let captured = InProcessContext::enter("panics")
            .unwrap()
            .run(|_| -> std::result::Result<(), String> {
                panic!("name 'not_present' is not defined")
            });
        assert_eq!(captured.code, EXIT_PANIC);
        assert!(captured.stderr.ends_with("name 'not_present' is not defined"));
    }

    #[test]
    #[serial]
    fn test_lock_released_after_panic() {
        let _ = InProcessContext::enter("first")
            .unwrap()
            .run(|_| -> std::result::Result<(), String> { panic!("boom") });
        let captured = InProcessContext::enter("second")
            .unwrap()
            .run(|_| Ok::<_, String>(42));
        assert_eq!(captured.into_result().unwrap(), 42);
    }

    #[test]
    #[serial]
    fn test_reentry_is_rejected() {
        let captured = InProcessContext::enter("outer")
            .unwrap()
            .run(|_| InProcessContext::enter("inner").map(|_| ()));
        assert_eq!(captured.code, EXIT_FAILURE);
        assert!(captured.stderr.contains("Re-entrant"));
        assert!(captured.stderr.contains("inner"));
    }

    #[test]
    #[serial]
    fn test_into_result_error_falls_back_to_stdout() {
        let err = InProcessContext::enter("quiet")
            .unwrap()
            .run(|streams| {
                streams.stdout.push_str("only stdout");
                streams.stderr.push_str("   ");
                Ok::<_, String>(())
            });
        assert!(err.succeeded());

        let captured = Captured::<()> {
            command: "quiet".to_string(),
            value: None,
            stdout: "only stdout".to_string(),
            stderr: String::new(),
            code: EXIT_FAILURE,
        };
        match captured.into_result().unwrap_err() {
            VcsError::InProcess { message, code, .. } => {
                assert_eq!(message, "only stdout");
                assert_eq!(code, EXIT_FAILURE);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    #[serial]
    fn test_in_process_helper() {
        assert_eq!(in_process("add", |_| Ok::<_, String>(1 + 1)).unwrap(), 2);
        assert!(in_process("fail", |_| Err::<(), _>("nope")).is_err());
    }
}
