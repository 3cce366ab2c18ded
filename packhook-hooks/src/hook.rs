//! The hook type and its dispatch disciplines.

use std::{any::Any, collections::HashSet, future::Future, sync::Arc};

use futures::future::{BoxFuture, FutureExt, try_join_all};
use parking_lot::RwLock;

use crate::{
    Discipline, ErasedHook, ErrorAction, HookError, HookResult, Interceptor, ListenerError,
    StageRange, TapOptions, WaterfallValue,
};

type SyncListener<A, R> = Arc<dyn Fn(A) -> eyre::Result<R> + Send + Sync>;
type AsyncListener<A, R> = Arc<dyn Fn(A) -> BoxFuture<'static, eyre::Result<R>> + Send + Sync>;
type ErrorHandler = Arc<dyn Fn(&HookError) -> ErrorAction + Send + Sync>;

enum Listener<A, R> {
    Sync(SyncListener<A, R>),
    Async(AsyncListener<A, R>),
}

impl<A, R> Clone for Listener<A, R> {
    fn clone(&self) -> Self {
        match self {
            Listener::Sync(f) => Listener::Sync(f.clone()),
            Listener::Async(f) => Listener::Async(f.clone()),
        }
    }
}

struct Tap<A, R> {
    options: TapOptions,
    listener: Listener<A, R>,
}

impl<A, R> Clone for Tap<A, R> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            listener: self.listener.clone(),
        }
    }
}

/// The result type of a hook.
///
/// A listener result that is not "set" does not count as a result: it
/// neither replaces the previous result nor stops a bail hook.
pub trait HookOutput: Send + 'static {
    fn unset() -> Self;
    fn is_set(&self) -> bool;
}

impl HookOutput for () {
    fn unset() -> Self {}

    fn is_set(&self) -> bool {
        false
    }
}

impl<T: Send + 'static> HookOutput for Option<T> {
    fn unset() -> Self {
        None
    }

    fn is_set(&self) -> bool {
        self.is_some()
    }
}

struct HookInner<A, R> {
    name: String,
    discipline: Discipline,
    taps: RwLock<Vec<Tap<A, R>>>,
    interceptors: RwLock<Vec<Interceptor<A>>>,
    error_handler: RwLock<Option<ErrorHandler>>,
}

/// A named extension point.
///
/// `A` is the argument handed to every listener (cloned per listener, so
/// shared state travels as `Arc` handles) and `R` the listener result.
/// Cloning a `Hook` yields another handle to the same tap list.
pub struct Hook<A, R = ()> {
    inner: Arc<HookInner<A, R>>,
}

impl<A, R> Clone for Hook<A, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A, R> std::fmt::Debug for Hook<A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook")
            .field("name", &self.inner.name)
            .field("discipline", &self.inner.discipline)
            .field("taps", &self.inner.taps.read().len())
            .finish()
    }
}

impl<A, R> Hook<A, R>
where
    A: Clone + Send + 'static,
    R: HookOutput,
{
    pub fn new(name: impl Into<String>, discipline: Discipline) -> Self {
        Self {
            inner: Arc::new(HookInner {
                name: name.into(),
                discipline,
                taps: RwLock::new(Vec::new()),
                interceptors: RwLock::new(Vec::new()),
                error_handler: RwLock::new(None),
            }),
        }
    }

    pub fn sync(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::Sync)
    }

    pub fn sync_bail(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::SyncBail)
    }

    pub fn async_series(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::AsyncSeries)
    }

    pub fn async_series_bail(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::AsyncSeriesBail)
    }

    pub fn async_parallel(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::AsyncParallel)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn discipline(&self) -> Discipline {
        self.inner.discipline
    }

    /// Register a synchronous listener.
    ///
    /// The tap is visible to the next dispatch.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::MissingName`] when the tap has an empty name.
    pub fn tap<F>(&self, options: impl Into<TapOptions>, f: F) -> HookResult<()>
    where
        F: Fn(A) -> eyre::Result<R> + Send + Sync + 'static,
    {
        self.insert(options.into(), Listener::Sync(Arc::new(f)))
    }

    /// Register an asynchronous listener.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::AsyncTapOnSyncHook`] when this hook is synchronous.
    pub fn tap_async<F, Fut>(&self, options: impl Into<TapOptions>, f: F) -> HookResult<()>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<R>> + Send + 'static,
    {
        let options = options.into();
        if !self.inner.discipline.is_async() {
            return Err(HookError::AsyncTapOnSyncHook {
                hook: self.inner.name.clone(),
                tap: options.name,
            });
        }
        let listener: AsyncListener<A, R> = Arc::new(move |args| f(args).boxed());
        self.insert(options, Listener::Async(listener))
    }

    fn insert(&self, options: TapOptions, listener: Listener<A, R>) -> HookResult<()> {
        if options.name.is_empty() {
            return Err(HookError::MissingName {
                hook: self.inner.name.clone(),
            });
        }
        let options = self
            .inner
            .interceptors
            .read()
            .iter()
            .filter_map(|i| i.register.clone())
            .fold(options, |options, register| register(options));

        let mut taps = self.inner.taps.write();
        let mut before: HashSet<String> = options.before.iter().cloned().collect();
        let mut index = taps.len();
        while index > 0 {
            let existing = &taps[index - 1].options;
            if !before.is_empty() {
                before.remove(&existing.name);
                index -= 1;
                continue;
            }
            if existing.stage > options.stage {
                index -= 1;
                continue;
            }
            break;
        }
        taps.insert(index, Tap { options, listener });
        Ok(())
    }

    /// Add an interceptor. Its `register` callback is applied to existing taps.
    pub fn intercept(&self, interceptor: Interceptor<A>) {
        if let Some(register) = &interceptor.register {
            for tap in self.inner.taps.write().iter_mut() {
                tap.options = register(tap.options.clone());
            }
        }
        self.inner.interceptors.write().push(interceptor);
    }

    /// Whether any interceptor is installed.
    pub fn is_intercepted(&self) -> bool {
        !self.inner.interceptors.read().is_empty()
    }

    /// Log every tap invocation and failure at trace level.
    pub fn trace(&self) {
        let hook = self.inner.name.clone();
        let on_tap = hook.clone();
        self.intercept(
            Interceptor::new()
                .on_tap(move |tap| {
                    tracing::trace!(hook = %on_tap, tap = %tap.name, stage = tap.stage, "invoking tap")
                })
                .on_error(move |err| tracing::trace!(hook = %hook, error = %err, "hook failed")),
        );
    }

    /// Set the handler deciding what happens when an async listener fails.
    ///
    /// Without a handler every failure is rethrown.
    pub fn on_error(&self, handler: impl Fn(&HookError) -> ErrorAction + Send + Sync + 'static) {
        *self.inner.error_handler.write() = Some(Arc::new(handler));
    }

    /// Whether dispatching this hook can have any effect.
    pub fn is_used(&self) -> bool {
        self.is_used_in(StageRange::ALL)
    }

    /// Whether dispatching the taps in `range` can have any effect.
    pub fn is_used_in(&self, range: StageRange) -> bool {
        if self
            .inner
            .taps
            .read()
            .iter()
            .any(|tap| range.contains(tap.options.stage))
        {
            return true;
        }
        let interceptors = self.inner.interceptors.read();
        (range.is_first() && interceptors.iter().any(|i| i.call.is_some()))
            || (range.is_last() && interceptors.iter().any(|i| i.done.is_some()))
    }

    pub fn tap_names(&self) -> Vec<String> {
        self.inner
            .taps
            .read()
            .iter()
            .map(|tap| tap.options.name.clone())
            .collect()
    }

    pub fn tap_count(&self) -> usize {
        self.inner.taps.read().len()
    }

    /// Replace this hook's taps with a copy of `other`'s.
    pub fn inherit_taps(&self, other: &Hook<A, R>) {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return;
        }
        let taps = other.inner.taps.read().clone();
        *self.inner.taps.write() = taps;
    }

    /// Dispatch a synchronous hook.
    ///
    /// # Errors
    ///
    /// The first listener error is returned immediately and later listeners
    /// do not run. Calling an async hook returns [`HookError::SyncCallOnAsyncHook`].
    pub fn call(&self, args: A) -> HookResult<R> {
        let taps = self.taps_in(StageRange::ALL);
        self.dispatch_sync(&taps, args, StageRange::ALL)
    }

    /// Dispatch only the taps whose stage falls in `range`.
    pub fn call_stage_range(&self, range: StageRange, args: A) -> HookResult<R> {
        let taps = self.taps_in(range);
        self.dispatch_sync(&taps, args, range)
    }

    /// Dispatch the hook, awaiting async listeners.
    ///
    /// Synchronous hooks are dispatched as with [`Hook::call`].
    ///
    /// # Errors
    ///
    /// A listener error is passed to the error handler; unless it is
    /// ignored, the remaining chain is skipped and the error returned.
    pub async fn call_async(&self, args: A) -> HookResult<R> {
        self.call_async_stage_range(StageRange::ALL, args).await
    }

    pub async fn call_async_stage_range(&self, range: StageRange, args: A) -> HookResult<R> {
        let taps = self.taps_in(range);
        match self.inner.discipline {
            Discipline::Sync | Discipline::SyncBail | Discipline::SyncWaterfall => {
                self.dispatch_sync(&taps, args, range)
            }
            Discipline::AsyncParallel => self.dispatch_parallel(&taps, args, range).await,
            _ => self.dispatch_series(&taps, args, range).await,
        }
    }

    fn taps_in(&self, range: StageRange) -> Vec<Tap<A, R>> {
        self.inner
            .taps
            .read()
            .iter()
            .filter(|tap| range.contains(tap.options.stage))
            .cloned()
            .collect()
    }

    fn interceptors(&self) -> Vec<Interceptor<A>> {
        self.inner.interceptors.read().clone()
    }

    fn dispatch_sync(&self, taps: &[Tap<A, R>], args: A, range: StageRange) -> HookResult<R> {
        if self.inner.discipline.is_async() {
            return Err(HookError::SyncCallOnAsyncHook {
                hook: self.inner.name.clone(),
            });
        }
        let interceptors = self.interceptors();
        if range.is_first() {
            notify_call(&interceptors, &args);
        }
        let bail = self.inner.discipline.is_bail();
        let mut result = R::unset();
        for tap in taps {
            notify_tap(&interceptors, &tap.options);
            let outcome = match &tap.listener {
                Listener::Sync(f) => f(args.clone()).map_err(|e| self.listener_error(tap, e)),
                Listener::Async(_) => Err(HookError::SyncCallOnAsyncHook {
                    hook: self.inner.name.clone(),
                }),
            };
            match outcome {
                Ok(value) if value.is_set() => {
                    result = value;
                    if bail {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    notify_error(&interceptors, &err);
                    return Err(err);
                }
            }
        }
        if range.is_last() {
            notify_done(&interceptors);
        }
        Ok(result)
    }

    async fn dispatch_series(&self, taps: &[Tap<A, R>], args: A, range: StageRange) -> HookResult<R> {
        let interceptors = self.interceptors();
        if range.is_first() {
            notify_call(&interceptors, &args);
        }
        let bail = self.inner.discipline.is_bail();
        let mut result = R::unset();
        for tap in taps {
            notify_tap(&interceptors, &tap.options);
            match self.invoke(tap, args.clone()).await {
                Ok(value) if value.is_set() => {
                    result = value;
                    if bail {
                        break;
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    if self.handle_error(&err) == ErrorAction::Ignore {
                        tracing::debug!(hook = %self.inner.name, error = %err, "ignoring listener error");
                        continue;
                    }
                    notify_error(&interceptors, &err);
                    return Err(err);
                }
            }
        }
        if range.is_last() {
            notify_done(&interceptors);
        }
        Ok(result)
    }

    async fn dispatch_parallel(
        &self,
        taps: &[Tap<A, R>],
        args: A,
        range: StageRange,
    ) -> HookResult<R> {
        let interceptors = self.interceptors();
        if range.is_first() {
            notify_call(&interceptors, &args);
        }
        let pending: Vec<_> = taps
            .iter()
            .map(|tap| {
                notify_tap(&interceptors, &tap.options);
                let args = args.clone();
                async move {
                    match self.invoke(tap, args).await {
                        Ok(_) => Ok(()),
                        Err(err) if self.handle_error(&err) == ErrorAction::Ignore => Ok(()),
                        Err(err) => Err(err),
                    }
                }
            })
            .collect();
        if let Err(err) = try_join_all(pending).await {
            notify_error(&interceptors, &err);
            return Err(err);
        }
        if range.is_last() {
            notify_done(&interceptors);
        }
        Ok(R::unset())
    }

    async fn invoke(&self, tap: &Tap<A, R>, args: A) -> HookResult<R> {
        let outcome = match &tap.listener {
            Listener::Sync(f) => f(args),
            Listener::Async(f) => f(args).await,
        };
        outcome.map_err(|e| self.listener_error(tap, e))
    }

    fn listener_error(&self, tap: &Tap<A, R>, report: eyre::Report) -> HookError {
        HookError::Listener {
            hook: self.inner.name.clone(),
            tap: tap.options.name.clone(),
            error: ListenerError::new(report),
        }
    }

    fn handle_error(&self, err: &HookError) -> ErrorAction {
        let handler = self.inner.error_handler.read().clone();
        handler.map_or(ErrorAction::Rethrow, |handler| handler(err))
    }

    fn discard_incompatible(&self, tap: &Tap<A, R>) {
        let err = HookError::IncompatibleShape {
            hook: self.inner.name.clone(),
            tap: tap.options.name.clone(),
        };
        self.handle_error(&err);
        tracing::warn!(hook = %self.inner.name, tap = %tap.options.name, "{err}; keeping previous value");
    }
}

impl<A> Hook<A, Option<A>>
where
    A: WaterfallValue + Clone + Send + 'static,
{
    pub fn sync_waterfall(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::SyncWaterfall)
    }

    pub fn async_series_waterfall(name: impl Into<String>) -> Self {
        Self::new(name, Discipline::AsyncSeriesWaterfall)
    }

    /// Thread `value` through every listener and return the final value.
    ///
    /// A listener returning `None` passes the value on unchanged. A value
    /// whose shape is incompatible with its input is reported to the error
    /// handler, logged and discarded.
    ///
    /// # Errors
    ///
    /// A listener error is returned immediately.
    pub fn call_waterfall(&self, value: A) -> HookResult<A> {
        if self.inner.discipline.is_async() {
            return Err(HookError::SyncCallOnAsyncHook {
                hook: self.inner.name.clone(),
            });
        }
        let taps = self.taps_in(StageRange::ALL);
        let interceptors = self.interceptors();
        notify_call(&interceptors, &value);
        let mut current = value;
        for tap in &taps {
            notify_tap(&interceptors, &tap.options);
            let outcome = match &tap.listener {
                Listener::Sync(f) => f(current.clone()).map_err(|e| self.listener_error(tap, e)),
                Listener::Async(_) => Err(HookError::SyncCallOnAsyncHook {
                    hook: self.inner.name.clone(),
                }),
            };
            match outcome {
                Ok(Some(next)) if current.is_compatible(&next) => current = next,
                Ok(Some(_)) => self.discard_incompatible(tap),
                Ok(None) => {}
                Err(err) => {
                    notify_error(&interceptors, &err);
                    return Err(err);
                }
            }
        }
        notify_done(&interceptors);
        Ok(current)
    }

    /// Thread `value` through every listener, awaiting async ones.
    ///
    /// Listener failures never abort the chain: they are reported to the
    /// error handler, logged, and the last good value is kept.
    pub async fn call_waterfall_async(&self, value: A) -> A {
        let taps = self.taps_in(StageRange::ALL);
        let interceptors = self.interceptors();
        notify_call(&interceptors, &value);
        let mut current = value;
        for tap in &taps {
            notify_tap(&interceptors, &tap.options);
            match self.invoke(tap, current.clone()).await {
                Ok(Some(next)) if current.is_compatible(&next) => current = next,
                Ok(Some(_)) => self.discard_incompatible(tap),
                Ok(None) => {}
                Err(err) => {
                    self.handle_error(&err);
                    notify_error(&interceptors, &err);
                    tracing::warn!(hook = %self.inner.name, error = %err, "waterfall listener failed; keeping previous value");
                }
            }
        }
        notify_done(&interceptors);
        current
    }
}

fn notify_call<A>(interceptors: &[Interceptor<A>], args: &A) {
    for call in interceptors.iter().filter_map(|i| i.call.as_ref()) {
        call(args);
    }
}

fn notify_tap<A>(interceptors: &[Interceptor<A>], tap: &TapOptions) {
    for on_tap in interceptors.iter().filter_map(|i| i.tap.as_ref()) {
        on_tap(tap);
    }
}

fn notify_done<A>(interceptors: &[Interceptor<A>]) {
    for done in interceptors.iter().filter_map(|i| i.done.as_ref()) {
        done();
    }
}

fn notify_error<A>(interceptors: &[Interceptor<A>], err: &HookError) {
    for on_error in interceptors.iter().filter_map(|i| i.error.as_ref()) {
        on_error(err);
    }
}

impl<A, R> ErasedHook for Hook<A, R>
where
    A: Clone + Send + 'static,
    R: HookOutput,
{
    fn name(&self) -> &str {
        Hook::name(self)
    }

    fn discipline(&self) -> Discipline {
        Hook::discipline(self)
    }

    fn is_used(&self) -> bool {
        Hook::is_used(self)
    }

    fn tap_names(&self) -> Vec<String> {
        Hook::tap_names(self)
    }

    fn is_intercepted(&self) -> bool {
        Hook::is_intercepted(self)
    }

    fn trace(&self) {
        Hook::trace(self)
    }

    fn inherit_taps_from(&self, other: &dyn ErasedHook) -> bool {
        match other.as_any().downcast_ref::<Hook<A, R>>() {
            Some(other) => {
                self.inherit_taps(other);
                true
            }
            None => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
