/// How a hook dispatches its taps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    Sync,
    SyncBail,
    SyncWaterfall,
    AsyncSeries,
    AsyncSeriesBail,
    AsyncSeriesWaterfall,
    AsyncParallel,
}

impl Discipline {
    /// Whether async listeners may be tapped.
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            Discipline::AsyncSeries
                | Discipline::AsyncSeriesBail
                | Discipline::AsyncSeriesWaterfall
                | Discipline::AsyncParallel
        )
    }

    /// Whether the first set result stops the chain.
    pub fn is_bail(&self) -> bool {
        matches!(self, Discipline::SyncBail | Discipline::AsyncSeriesBail)
    }

    pub fn is_waterfall(&self) -> bool {
        matches!(
            self,
            Discipline::SyncWaterfall | Discipline::AsyncSeriesWaterfall
        )
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Discipline::Sync => "sync",
            Discipline::SyncBail => "sync-bail",
            Discipline::SyncWaterfall => "sync-waterfall",
            Discipline::AsyncSeries => "async-series",
            Discipline::AsyncSeriesBail => "async-series-bail",
            Discipline::AsyncSeriesWaterfall => "async-series-waterfall",
            Discipline::AsyncParallel => "async-parallel",
        };
        f.write_str(name)
    }
}

/// Options for a single tap.
///
/// A plain name converts into options with stage `0`:
///
/// ```ignore
/// hook.tap("MyPlugin", |_| Ok(()));
/// hook.tap(TapOptions::new("Minify").stage(100), |_| Ok(()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TapOptions {
    /// Name of the plugin that owns this tap.
    pub name: String,
    /// Lower stages run first.
    pub stage: i32,
    /// Run before the taps with these names.
    pub before: Vec<String>,
}

impl TapOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stage: 0,
            before: Vec::new(),
        }
    }

    pub fn stage(mut self, stage: i32) -> Self {
        self.stage = stage;
        self
    }

    pub fn before(mut self, name: impl Into<String>) -> Self {
        self.before.push(name.into());
        self
    }
}

impl From<&str> for TapOptions {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TapOptions {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&String> for TapOptions {
    fn from(name: &String) -> Self {
        Self::new(name.as_str())
    }
}
