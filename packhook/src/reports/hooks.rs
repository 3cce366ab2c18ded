//! Hooks command report data structures.

use packhook_hooks::HookRegistry;

use super::output::{Output, Report};

/// One hook and the names of its taps.
#[derive(Debug)]
pub struct HookInfo {
    pub name: String,
    pub discipline: String,
    pub taps: Vec<String>,
}

/// The hooks of one or more registries, grouped by owner.
#[derive(Debug)]
pub struct HooksReport {
    only_used: bool,
    pub groups: Vec<(String, Vec<HookInfo>)>,
}

impl HooksReport {
    pub fn new(only_used: bool) -> Self {
        Self {
            only_used,
            groups: Vec::new(),
        }
    }

    pub fn add_registry(&mut self, owner: &str, registry: &HookRegistry) {
        let hooks = registry
            .hooks()
            .into_iter()
            .filter(|hook| !self.only_used || hook.is_used())
            .map(|hook| HookInfo {
                name: hook.name().to_string(),
                discipline: hook.discipline().to_string(),
                taps: hook.tap_names(),
            })
            .collect();
        self.groups.push((owner.to_string(), hooks));
    }
}

impl Report for HooksReport {
    fn render(&self, out: &mut dyn Output) {
        for (index, (owner, hooks)) in self.groups.iter().enumerate() {
            if index > 0 {
                out.newline();
            }
            out.title(owner);
            if hooks.is_empty() {
                out.preformatted("  (no hooks with taps)");
                continue;
            }
            for hook in hooks {
                let taps = if hook.taps.is_empty() {
                    String::new()
                } else {
                    format!(" <- {}", hook.taps.join(", "))
                };
                out.list_item(&format!("{} [{}]{}", hook.name, hook.discipline, taps));
            }
        }
    }
}
