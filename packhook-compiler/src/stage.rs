//! Asset processing stages.

use packhook_core::to_pascal_case;
use packhook_hooks::StageRange;

/// A numbered stage of `processAssets`.
///
/// Stages fire in ascending order, each at most once per build. Tap the
/// `processAssets` hook with a stage value to run in that stage:
///
/// ```ignore
/// compilation.hooks.process_assets.tap(
///     TapOptions::new("Minify").stage(ProcessAssetsStage::OPTIMIZE_SIZE.value()),
///     |assets| { /* ... */ Ok(()) },
/// )?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProcessAssetsStage(i32);

impl ProcessAssetsStage {
    /// Add additional assets to the compilation.
    pub const ADDITIONAL: Self = Self(-2000);
    /// Basic preprocessing of assets.
    pub const PRE_PROCESS: Self = Self(-1000);
    /// Derive new assets from existing assets.
    pub const DERIVED: Self = Self(-200);
    /// Add additional sections to existing assets, like a banner.
    pub const ADDITIONS: Self = Self(-100);
    pub const NONE: Self = Self(0);
    /// Optimize existing assets in a general way.
    pub const OPTIMIZE: Self = Self(100);
    /// Optimize the count of existing assets, e.g. by merging them.
    pub const OPTIMIZE_COUNT: Self = Self(200);
    /// Optimize the compatibility of existing assets, e.g. add polyfills.
    pub const OPTIMIZE_COMPATIBILITY: Self = Self(300);
    /// Optimize the size of existing assets, e.g. by minimizing.
    pub const OPTIMIZE_SIZE: Self = Self(400);
    /// Add development tooling to assets, e.g. extracting a source map.
    pub const DEV_TOOLING: Self = Self(500);
    /// Inline assets into other assets.
    pub const OPTIMIZE_INLINE: Self = Self(700);
    /// Summarize the list of existing assets.
    pub const SUMMARIZE: Self = Self(1000);
    /// Optimize the hashes of the assets.
    pub const OPTIMIZE_HASH: Self = Self(2500);
    /// Optimize the transfer of existing assets, e.g. by compressing.
    pub const OPTIMIZE_TRANSFER: Self = Self(3000);
    /// Analyse existing assets.
    pub const ANALYSE: Self = Self(4000);
    /// Create assets for reporting purposes.
    pub const REPORT: Self = Self(5000);

    /// Every stage, in firing order.
    pub const ALL: [Self; 16] = [
        Self::ADDITIONAL,
        Self::PRE_PROCESS,
        Self::DERIVED,
        Self::ADDITIONS,
        Self::NONE,
        Self::OPTIMIZE,
        Self::OPTIMIZE_COUNT,
        Self::OPTIMIZE_COMPATIBILITY,
        Self::OPTIMIZE_SIZE,
        Self::DEV_TOOLING,
        Self::OPTIMIZE_INLINE,
        Self::SUMMARIZE,
        Self::OPTIMIZE_HASH,
        Self::OPTIMIZE_TRANSFER,
        Self::ANALYSE,
        Self::REPORT,
    ];

    pub const fn value(self) -> i32 {
        self.0
    }

    pub fn name(self) -> &'static str {
        match self.0 {
            -2000 => "ADDITIONAL",
            -1000 => "PRE_PROCESS",
            -200 => "DERIVED",
            -100 => "ADDITIONS",
            0 => "NONE",
            100 => "OPTIMIZE",
            200 => "OPTIMIZE_COUNT",
            300 => "OPTIMIZE_COMPATIBILITY",
            400 => "OPTIMIZE_SIZE",
            500 => "DEV_TOOLING",
            700 => "OPTIMIZE_INLINE",
            1000 => "SUMMARIZE",
            2500 => "OPTIMIZE_HASH",
            3000 => "OPTIMIZE_TRANSFER",
            4000 => "ANALYSE",
            _ => "REPORT",
        }
    }

    /// The callback name a build core uses for this stage, e.g.
    /// `processAssetsStageOptimizeInline`.
    pub fn callback_name(self) -> String {
        format!("processAssetsStage{}", to_pascal_case(self.name()))
    }

    /// The taps this stage runs: everything above the previous stage up to
    /// and including this one. The first stage also takes every lower tap
    /// and the last every higher one.
    pub fn range(self) -> StageRange {
        let index = Self::ALL
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or(Self::ALL.len() - 1);
        let from = index.checked_sub(1).map(|prev| Self::ALL[prev].0);
        let to = (index + 1 < Self::ALL.len()).then_some(self.0);
        StageRange::new(from, to)
    }
}

impl From<ProcessAssetsStage> for i32 {
    fn from(stage: ProcessAssetsStage) -> Self {
        stage.0
    }
}

impl std::fmt::Display for ProcessAssetsStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_strictly_ascending() {
        for pair in ProcessAssetsStage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_callback_names() {
        assert_eq!(
            ProcessAssetsStage::OPTIMIZE_INLINE.callback_name(),
            "processAssetsStageOptimizeInline"
        );
        assert_eq!(
            ProcessAssetsStage::ADDITIONAL.callback_name(),
            "processAssetsStageAdditional"
        );
    }

    #[test]
    fn test_ranges_partition_all_stages() {
        let first = ProcessAssetsStage::ADDITIONAL.range();
        assert!(first.contains(i32::MIN));
        assert!(first.contains(-2000));

        let optimize = ProcessAssetsStage::OPTIMIZE.range();
        assert!(!optimize.contains(0));
        assert!(optimize.contains(50));
        assert!(optimize.contains(100));

        let last = ProcessAssetsStage::REPORT.range();
        assert!(last.contains(5000));
        assert!(last.contains(i32::MAX));

        for stage in [i32::MIN, -1500, 0, 101, 2600, 9999] {
            let owners = ProcessAssetsStage::ALL
                .iter()
                .filter(|s| s.range().contains(stage))
                .count();
            assert_eq!(owners, 1, "stage {stage} should belong to exactly one range");
        }
    }
}
