// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Signal coordination.
//!
//! Two optional collaborators convert OS signals into engine-visible
//! events:
//!
//! - [`ReloadHandler`] listens for SIGHUP and invokes a callback with a
//!   handler-owned context. Start is idempotent; Stop cancels the context
//!   and detaches, and is safe to call without Start or repeatedly.
//! - [`InterruptHandler`] implements two-stage exit: the first interrupt
//!   cancels its context and fires a one-shot `first_press` channel; a
//!   second interrupt within the window invokes the injectable exit
//!   function. The press counter resets after the window.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

#[cfg(feature = "telemetry")]
use tracing::{debug, warn};

use crate::context::Context;

/// Callback invoked on each reload signal.
pub type ReloadFn = dyn Fn(&Context) + Send + Sync;

/// Listens for a reload signal (SIGHUP) and invokes a callback.
pub struct ReloadHandler {
    ctx: Context,
    callback: Arc<ReloadFn>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReloadHandler {
    pub fn new(callback: impl Fn(&Context) + Send + Sync + 'static) -> Self {
        Self {
            ctx: Context::background(),
            callback: Arc::new(callback),
            task: Mutex::new(None),
        }
    }

    /// The handler-owned context passed to the callback.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Begin listening. Calling start again while listening is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock().expect("reload task lock poisoned");
        if task.is_some() {
            return;
        }

        let ctx = self.ctx.clone();
        let callback = Arc::clone(&self.callback);
        *task = Some(tokio::spawn(async move {
            #[cfg(unix)]
            {
                use tokio::signal::unix::{signal, SignalKind};
                let mut hangup = match signal(SignalKind::hangup()) {
                    Ok(stream) => stream,
                    Err(_e) => {
                        #[cfg(feature = "telemetry")]
                        warn!(error = %_e, "Failed to install SIGHUP handler");
                        return;
                    }
                };
                loop {
                    tokio::select! {
                        _ = ctx.cancellation_token().cancelled() => break,
                        received = hangup.recv() => {
                            if received.is_none() {
                                break;
                            }
                            #[cfg(feature = "telemetry")]
                            debug!("Reload signal received");
                            callback(&ctx);
                        }
                    }
                }
            }

            #[cfg(not(unix))]
            ctx.cancellation_token().cancelled().await;
        }));
    }

    /// Cancel the context and detach from the signal source. Safe to call
    /// without start and safe to call multiple times.
    pub fn stop(&self) {
        self.ctx.cancel();
        let mut task = self.task.lock().expect("reload task lock poisoned");
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }

    /// Invoke the callback directly, as the signal loop would.
    pub fn trigger(&self) {
        (self.callback)(&self.ctx);
    }
}

/// Exit function invoked on the second interrupt.
pub type ExitFn = dyn Fn(i32) + Send + Sync;

/// Two-stage interrupt handling.
pub struct InterruptHandler {
    ctx: Context,
    window: Duration,
    exit: Arc<ExitFn>,
    last_press: Mutex<Option<Instant>>,
    first_press_tx: Mutex<Option<oneshot::Sender<()>>>,
    first_press_rx: Mutex<Option<oneshot::Receiver<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InterruptHandler {
    /// `window` is how long a second press keeps triggering the exit
    /// function; `exit` is injectable for testing.
    pub fn new(window: Duration, exit: impl Fn(i32) + Send + Sync + 'static) -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            ctx: Context::background(),
            window,
            exit: Arc::new(exit),
            last_press: Mutex::new(None),
            first_press_tx: Mutex::new(Some(tx)),
            first_press_rx: Mutex::new(Some(rx)),
            task: Mutex::new(None),
        }
    }

    /// The context cancelled by the first interrupt. Cooperative
    /// subsystems derive from this to begin shutdown.
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Take the one-shot receiver fired by the first press. Returns `None`
    /// once taken.
    pub fn first_press(&self) -> Option<oneshot::Receiver<()>> {
        self.first_press_rx
            .lock()
            .expect("first press lock poisoned")
            .take()
    }

    /// Register one interrupt press.
    ///
    /// Called by the signal loop, and directly by tests.
    pub fn press(&self) {
        let mut last = self.last_press.lock().expect("press lock poisoned");
        let now = Instant::now();

        if let Some(previous) = *last {
            if now.duration_since(previous) <= self.window {
                #[cfg(feature = "telemetry")]
                debug!("Second interrupt within window, exiting");
                (self.exit)(130);
                return;
            }
        }

        // First press (or the counter reset after the window): cancel the
        // context and fire the one-shot channel
        *last = Some(now);
        self.ctx.cancel();
        if let Some(tx) = self
            .first_press_tx
            .lock()
            .expect("first press lock poisoned")
            .take()
        {
            let _ = tx.send(());
        }

        #[cfg(feature = "telemetry")]
        debug!("First interrupt, cooperative shutdown started");
    }

    /// Begin listening for interrupts. Calling start again is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().expect("interrupt task lock poisoned");
        if task.is_some() {
            return;
        }

        let handler = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            loop {
                if tokio::signal::ctrl_c().await.is_err() {
                    #[cfg(feature = "telemetry")]
                    warn!("Failed to listen for interrupt signal");
                    return;
                }
                handler.press();
            }
        }));
    }

    /// Detach from the signal source.
    pub fn stop(&self) {
        let mut task = self.task.lock().expect("interrupt task lock poisoned");
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_reload_trigger_invokes_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler = ReloadHandler::new(move |_ctx| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        handler.trigger();
        handler.trigger();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_reload_start_idempotent_stop_safe() {
        let handler = ReloadHandler::new(|_ctx| {});

        // Stop without start is a no-op
        handler.stop();

        handler.start();
        handler.start();
        handler.stop();
        handler.stop();

        assert!(handler.context().is_cancelled());
    }

    #[tokio::test]
    async fn test_interrupt_first_press_cancels_and_fires() {
        let handler = Arc::new(InterruptHandler::new(Duration::from_secs(2), |_code| {
            panic!("exit must not fire on the first press");
        }));

        let mut first_press = handler.first_press().unwrap();
        assert!(handler.first_press().is_none());

        handler.press();
        assert!(handler.context().is_cancelled());
        assert!(first_press.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_interrupt_second_press_exits() {
        let code = Arc::new(AtomicI32::new(0));
        let seen = Arc::clone(&code);
        let handler = InterruptHandler::new(Duration::from_secs(2), move |c| {
            seen.store(c, Ordering::SeqCst);
        });

        handler.press();
        handler.press();
        assert_eq!(code.load(Ordering::SeqCst), 130);
    }

    #[tokio::test]
    async fn test_interrupt_counter_resets_after_window() {
        let exits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&exits);
        let handler = InterruptHandler::new(Duration::from_millis(20), move |_c| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        handler.press();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Outside the window: treated as a fresh first press
        handler.press();
        assert_eq!(exits.load(Ordering::SeqCst), 0);

        // And a quick follow-up exits
        handler.press();
        assert_eq!(exits.load(Ordering::SeqCst), 1);
    }
}
