//! Check command report data structures.

use std::path::{Path, PathBuf};

use packhook_config::{CompilerOptions, EntryDescription};

use super::output::{Output, Report};

/// Summary of a valid configuration.
#[derive(Debug)]
pub struct CheckReport {
    pub config_path: PathBuf,
    pub context: PathBuf,
    pub output_path: PathBuf,
    pub filename: String,
    /// Entry names with their imports.
    pub entries: Vec<(String, Vec<String>)>,
    pub includes: Vec<(String, Vec<String>)>,
}

fn imports<'a>(
    entries: impl IntoIterator<Item = (&'a String, &'a EntryDescription)>,
) -> Vec<(String, Vec<String>)> {
    entries
        .into_iter()
        .map(|(name, entry)| (name.clone(), entry.import.clone()))
        .collect()
}

impl CheckReport {
    pub fn new(config_path: &Path, options: &CompilerOptions) -> Self {
        Self {
            config_path: config_path.to_path_buf(),
            context: options.context.clone(),
            output_path: options.output.path.clone(),
            filename: options.output.filename.clone(),
            entries: imports(&options.entry),
            includes: imports(&options.includes),
        }
    }
}

impl Report for CheckReport {
    fn render(&self, out: &mut dyn Output) {
        out.preformatted(&format!("✓ {} is valid", self.config_path.display()));
        out.newline();
        out.key_value_indented("context", &self.context.display().to_string());
        out.key_value_indented(
            "output",
            &self.output_path.join(&self.filename).display().to_string(),
        );

        let groups = [
            ("entry", "entries", &self.entries),
            ("include", "includes", &self.includes),
        ];
        for (singular, plural, entries) in groups {
            if entries.is_empty() {
                continue;
            }
            out.newline();
            let label = if entries.len() == 1 { singular } else { plural };
            out.section(&format!("  {} {}", entries.len(), label));
            for (name, imports) in entries {
                out.list_item(&format!("{} <- {}", name, imports.join(", ")));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use packhook_config::parse_str;

    use super::*;
    use crate::reports::output::tests::RecordingOutput;

    #[test]
    fn test_render_lists_entries() {
        let options = parse_str(
            r#"
[entry]
main = "./src/index.js"
admin = ["./src/polyfills.js", "./src/admin.js"]
"#,
        )
        .unwrap()
        .normalize(Path::new("/app"));
        let mut out = RecordingOutput::default();
        CheckReport::new(Path::new("packhook.toml"), &options).render(&mut out);
        assert_eq!(
            out.lines,
            vec![
                "✓ packhook.toml is valid",
                "",
                "  context: /app",
                "  output: /app/dist/[name].js",
                "",
                "  2 entries:",
                "  - main <- ./src/index.js",
                "  - admin <- ./src/polyfills.js, ./src/admin.js",
            ]
        );
    }
}
