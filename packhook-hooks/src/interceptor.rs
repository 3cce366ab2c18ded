use std::sync::Arc;

use crate::{HookError, TapOptions};

type CallFn<A> = Arc<dyn Fn(&A) + Send + Sync>;
type TapFn = Arc<dyn Fn(&TapOptions) + Send + Sync>;
type DoneFn = Arc<dyn Fn() + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&HookError) + Send + Sync>;
type RegisterFn = Arc<dyn Fn(TapOptions) -> TapOptions + Send + Sync>;

/// Observes a hook's dispatch.
///
/// `call` runs once per dispatch with the arguments, `tap` before each
/// listener, `done` after a dispatch completes and `error` when it fails.
/// `register` may rewrite the options of every tap, including taps added
/// before the interceptor.
///
/// # Example
///
/// ```ignore
/// hook.intercept(
///     Interceptor::new()
///         .on_tap(|tap| tracing::trace!(tap = %tap.name, "running"))
///         .on_done(|| tracing::trace!("done")),
/// );
/// ```
pub struct Interceptor<A> {
    pub(crate) call: Option<CallFn<A>>,
    pub(crate) tap: Option<TapFn>,
    pub(crate) done: Option<DoneFn>,
    pub(crate) error: Option<ErrorFn>,
    pub(crate) register: Option<RegisterFn>,
}

impl<A> Interceptor<A> {
    pub fn new() -> Self {
        Self {
            call: None,
            tap: None,
            done: None,
            error: None,
            register: None,
        }
    }

    pub fn on_call(mut self, f: impl Fn(&A) + Send + Sync + 'static) -> Self {
        self.call = Some(Arc::new(f));
        self
    }

    pub fn on_tap(mut self, f: impl Fn(&TapOptions) + Send + Sync + 'static) -> Self {
        self.tap = Some(Arc::new(f));
        self
    }

    pub fn on_done(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.done = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&HookError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    pub fn on_register(
        mut self,
        f: impl Fn(TapOptions) -> TapOptions + Send + Sync + 'static,
    ) -> Self {
        self.register = Some(Arc::new(f));
        self
    }
}

impl<A> Default for Interceptor<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> Clone for Interceptor<A> {
    fn clone(&self) -> Self {
        Self {
            call: self.call.clone(),
            tap: self.tap.clone(),
            done: self.done.clone(),
            error: self.error.clone(),
            register: self.register.clone(),
        }
    }
}
