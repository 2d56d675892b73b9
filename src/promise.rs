//! One-shot future bridging capability callbacks into suspending blocks.
//!
//! A [`Promise`] / [`Resolver`] pair carries exactly one value. The resolver
//! side is handed to a capability callback (or armed in the legacy report
//! slot); the promise side is awaited by the block scheduler. Resolution is
//! single-shot: later `resolve` calls on the same pair are ignored.
//!
//! There is no timeout and no cancellation here. If the resolver is dropped
//! or replaced unresolved, the promise pends forever - that mirrors the
//! transport contract of the source system, where a silently dropped link
//! hangs the suspended block.
//!
//! This keeps `blocklink` free of any specific async runtime.

// MIT License

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

struct Shared<T> {
    value: Option<T>,
    waker: Option<Waker>,
    resolved: bool,
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> std::sync::MutexGuard<'_, Shared<T>> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a connected promise/resolver pair.
pub fn promise<T>() -> (Promise<T>, Resolver<T>) {
    let shared = Arc::new(Mutex::new(Shared {
        value: None,
        waker: None,
        resolved: false,
    }));
    (
        Promise {
            shared: Arc::clone(&shared),
        },
        Resolver { shared },
    )
}

/// Awaitable side of a one-shot pair.
pub struct Promise<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

/// Resolving side of a one-shot pair. Cloneable so it can be captured by a
/// capability callback; only the first resolution counts.
pub struct Resolver<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Resolver<T> {
    /// Resolve the paired promise. A second call is a no-op.
    pub fn resolve(&self, value: T) {
        let waker = {
            let mut shared = lock(&self.shared);
            if shared.resolved {
                return;
            }
            shared.resolved = true;
            shared.value = Some(value);
            shared.waker.take()
        };
        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Promise<T> {
    /// Whether the paired resolver has fired.
    pub fn is_resolved(&self) -> bool {
        lock(&self.shared).resolved
    }
}

impl<T> Future for Promise<T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        let mut shared = lock(&self.shared);
        if let Some(value) = shared.value.take() {
            Poll::Ready(value)
        } else {
            shared.waker = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}
