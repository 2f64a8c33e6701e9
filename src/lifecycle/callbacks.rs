use std::fmt;

use crate::errors::LifecycleError;

type SuccessFn<T> = Box<dyn FnOnce(T) + Send>;
type ErrorFn = Box<dyn FnOnce(LifecycleError) + Send>;
type CancelFn = Box<dyn FnOnce() + Send>;

/// Optional continuations of a lifecycle operation
///
/// A set settles at most once: the first of `succeed`, `fail` or `cancel` runs its
/// continuation (if one was given) and every later call is ignored.
pub struct Callbacks<T> {
    on_success: Option<SuccessFn<T>>,
    on_error: Option<ErrorFn>,
    on_cancel: Option<CancelFn>,
    settled: bool,
}

impl<T> Default for Callbacks<T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
            on_cancel: None,
            settled: false,
        }
    }
}

impl<T> fmt::Debug for Callbacks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_cancel", &self.on_cancel.is_some())
            .field("settled", &self.settled)
            .finish()
    }
}

impl<T> Callbacks<T> {
    /// An empty set; the operation still runs all its side effects
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(LifecycleError) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_cancel(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_cancel = Some(Box::new(f));
        self
    }

    /// Whether an outcome was already delivered
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub(crate) fn succeed(&mut self, value: T) {
        if self.settle() {
            if let Some(f) = self.on_success.take() {
                f(value);
            }
        }
    }

    pub(crate) fn fail(&mut self, error: LifecycleError) {
        if self.settle() {
            if let Some(f) = self.on_error.take() {
                f(error);
            }
        } else {
            log::debug!("Error after the operation settled, continuation skipped: {}", error);
        }
    }

    pub(crate) fn cancel(&mut self) {
        if self.settle() {
            if let Some(f) = self.on_cancel.take() {
                f();
            }
        }
    }

    // True for the first caller only.
    fn settle(&mut self) -> bool {
        if self.settled {
            return false;
        }
        self.settled = true;
        true
    }
}
