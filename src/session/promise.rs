//! Single-assignment promise/future pair.
//!
//! A [`Promise`] resolves its [`ResponseFuture`] at most once; later
//! resolution attempts return `false` and change nothing. The future side
//! can be awaited, blocked on, or given a continuation, and every path
//! observes the same value.

use crate::base::neterror::NetError;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

type Continuation<T> = Box<dyn FnOnce(Result<T, NetError>) + Send>;
type CancelHook = Box<dyn FnOnce() + Send>;

enum State<T> {
    Pending {
        continuation: Option<Continuation<T>>,
        waker: Option<Waker>,
    },
    /// `None` once the value has been handed to the consumer.
    Resolved(Option<Result<T, NetError>>),
}

struct Shared<T> {
    state: Mutex<State<T>>,
    cancel_hook: Mutex<Option<CancelHook>>,
}

fn lock<S>(mutex: &Mutex<S>) -> MutexGuard<'_, S> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T> Shared<T> {
    fn resolve(&self, result: Result<T, NetError>) -> bool {
        let mut state = lock(&self.state);
        let (continuation, waker) = match &mut *state {
            State::Resolved(_) => return false,
            State::Pending {
                continuation,
                waker,
            } => (continuation.take(), waker.take()),
        };

        let delivered = match continuation {
            Some(continuation) => {
                *state = State::Resolved(None);
                Some((continuation, result))
            }
            None => {
                *state = State::Resolved(Some(result));
                None
            }
        };
        drop(state);

        // A resolved call has nothing left to abort.
        let hook = lock(&self.cancel_hook).take();
        drop(hook);

        if let Some((continuation, result)) = delivered {
            continuation(result);
        }
        if let Some(waker) = waker {
            waker.wake();
        }
        true
    }

    fn cancel(&self) -> bool {
        let hook = lock(&self.cancel_hook).take();
        if !self.resolve(Err(NetError::Cancelled)) {
            return false;
        }
        if let Some(hook) = hook {
            hook();
        }
        true
    }

    fn is_completed(&self) -> bool {
        matches!(*lock(&self.state), State::Resolved(_))
    }
}

/// Resolver side of a call.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Promise<T> {
    /// Resolve with `result`. Returns `false` if already resolved.
    pub fn resolve(&self, result: Result<T, NetError>) -> bool {
        self.shared.resolve(result)
    }

    pub fn fulfill(&self, value: T) -> bool {
        self.resolve(Ok(value))
    }

    pub fn fail(&self, error: NetError) -> bool {
        self.resolve(Err(error))
    }

    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }

    /// Install the action run when the consumer cancels.
    ///
    /// The hook is dropped without running once the promise resolves.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_completed() {
            return;
        }
        *lock(&self.shared.cancel_hook) = Some(Box::new(hook));
        // Resolution may have raced the install.
        if self.is_completed() {
            lock(&self.shared.cancel_hook).take();
        }
    }
}

/// Consumer side of a call.
#[must_use = "futures do nothing unless awaited, waited on or given a continuation"]
pub struct ResponseFuture<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected promise/future pair.
pub fn pair<T>() -> (Promise<T>, ResponseFuture<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State::Pending {
            continuation: None,
            waker: None,
        }),
        cancel_hook: Mutex::new(None),
    });
    (
        Promise {
            shared: Arc::clone(&shared),
        },
        ResponseFuture { shared },
    )
}

impl<T> ResponseFuture<T> {
    /// Already-fulfilled future.
    pub fn ready(value: T) -> Self {
        let (promise, future) = pair();
        promise.fulfill(value);
        future
    }

    /// Already-failed future.
    pub fn failed(error: NetError) -> Self {
        let (promise, future) = pair();
        promise.fail(error);
        future
    }

    pub fn is_completed(&self) -> bool {
        self.shared.is_completed()
    }

    /// Resolve with [`NetError::Cancelled`] and abort the underlying work.
    ///
    /// Returns `false` if the future was already resolved.
    pub fn cancel(&self) -> bool {
        self.shared.cancel()
    }

    /// Block the current thread until resolution.
    ///
    /// Must not be called from a thread that drives the transport's callbacks.
    pub fn wait(self) -> Result<T, NetError> {
        futures::executor::block_on(self)
    }

    /// Run `f` with the result, immediately if already resolved, otherwise on
    /// the thread that resolves the promise.
    pub fn on_complete<F>(self, f: F)
    where
        F: FnOnce(Result<T, NetError>) + Send + 'static,
    {
        let mut state = lock(&self.shared.state);
        match &mut *state {
            State::Pending { continuation, .. } => {
                *continuation = Some(Box::new(f));
            }
            State::Resolved(result) => {
                let result = result.take();
                drop(state);
                if let Some(result) = result {
                    f(result);
                }
            }
        }
    }
}

impl<T: Send + 'static> ResponseFuture<T> {
    /// Translate the value with a fallible function.
    ///
    /// Cancelling the mapped future cancels this one.
    pub fn map<U, F>(self, f: F) -> ResponseFuture<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U, NetError> + Send + 'static,
    {
        let (promise, mapped) = pair();
        let source = Arc::clone(&self.shared);
        promise.on_cancel(move || {
            source.cancel();
        });
        self.on_complete(move |result| {
            promise.resolve(result.and_then(f));
        });
        mapped
    }
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T, NetError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = lock(&self.shared.state);
        match &mut *state {
            State::Pending { waker, .. } => {
                *waker = Some(cx.waker().clone());
                Poll::Pending
            }
            State::Resolved(result) => Poll::Ready(result.take().unwrap_or_else(|| {
                Err(NetError::Runtime("response future polled after completion".into()))
            })),
        }
    }
}
