//! Build command report data structures.

use std::time::Duration;

use packhook_compiler::Stats;
use packhook_core::Diagnostic;

use super::output::{Output, Report};

/// Summary of one finished build.
#[derive(Debug)]
pub struct BuildReport {
    pub name: Option<String>,
    pub hash: Option<String>,
    pub duration: Option<Duration>,
    /// Emitted assets with their size in bytes, sorted by name.
    pub assets: Vec<(String, usize)>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub children: Vec<BuildReport>,
}

impl BuildReport {
    pub fn from_stats(stats: &Stats) -> Self {
        let compilation = stats.compilation();
        let mut assets: Vec<(String, usize)> = compilation
            .get_assets()
            .into_iter()
            .map(|asset| (asset.name, asset.source.size()))
            .collect();
        assets.sort();
        Self {
            name: compilation.name().map(str::to_string),
            hash: compilation.hash(),
            duration: stats
                .end_time()
                .and_then(|end| end.duration_since(stats.start_time()).ok()),
            assets,
            errors: compilation.get_errors(),
            warnings: compilation.get_warnings(),
            children: compilation
                .children()
                .into_iter()
                .map(|child| BuildReport::from_stats(&Stats::new(child)))
                .collect(),
        }
    }

    fn headline(&self) -> String {
        let name = self.name.as_deref().unwrap_or("packhook");
        let outcome = if self.errors.is_empty() {
            "built"
        } else {
            "failed"
        };
        let mut line = format!("{} {}", name, outcome);
        if let Some(hash) = &self.hash {
            line.push_str(&format!(" ({})", hash));
        }
        if let Some(duration) = self.duration {
            line.push_str(&format!(" in {}ms", duration.as_millis()));
        }
        line
    }
}

impl Report for BuildReport {
    fn render(&self, out: &mut dyn Output) {
        for error in &self.errors {
            out.error(&format!("{}: {}", error.title, error.message));
        }
        for warning in &self.warnings {
            out.warning(&format!("{}: {}", warning.title, warning.message));
        }

        out.preformatted(&self.headline());
        for (name, size) in &self.assets {
            out.key_value_indented(name, &format!("{} bytes", size));
        }
        for child in &self.children {
            out.newline();
            child.render(out);
        }
    }
}
