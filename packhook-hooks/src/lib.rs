//! Typed hooks for plugin-driven build pipelines.
//!
//! A [`Hook`] is a named extension point holding an ordered list of taps.
//! How the taps are dispatched is decided by its [`Discipline`]:
//!
//! | discipline             | listeners                | result                         |
//! |------------------------|--------------------------|--------------------------------|
//! | `Sync`                 | sync, in order           | last set result                |
//! | `SyncBail`             | sync, in order           | first set result, stops        |
//! | `SyncWaterfall`        | sync, threads a value    | final value                    |
//! | `AsyncSeries`          | sync or async, in order  | last set result                |
//! | `AsyncSeriesBail`      | sync or async, in order  | first set result, stops        |
//! | `AsyncSeriesWaterfall` | sync or async, threads   | final value                    |
//! | `AsyncParallel`        | sync or async, concurrent| nothing                        |
//!
//! # Example
//!
//! ```ignore
//! let done: Hook<Stats> = Hook::async_series("done");
//! done.tap("LogPlugin", |stats| {
//!     println!("built in {:?}", stats.time());
//!     Ok(())
//! });
//! done.call_async(stats).await?;
//! ```

mod error;
mod hook;
mod interceptor;
mod registry;
mod stage;
mod tap;
mod waterfall;

pub use error::{ErrorAction, HookError, HookResult, ListenerError};
pub use hook::{Hook, HookOutput};
pub use interceptor::Interceptor;
pub use registry::{ErasedHook, HookRegistry};
pub use stage::StageRange;
pub use tap::{Discipline, TapOptions};
pub use waterfall::WaterfallValue;
