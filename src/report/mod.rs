//! Build log rendering
//!
//! The report is a pure function of the plan, the declared options, the
//! per-layer decisions and the collected tool output. Option keys are
//! rendered in lexicographic order so the same inputs always produce
//! byte-identical text.

use crate::cache::{CacheDecision, LayerDecision};
use crate::config::options::{BuildOptions, LogLevel};
use crate::config::schema::BuildpackConfig;
use crate::execute::ExecutionOutput;
use crate::plan::BuildPlan;

/// Tool output lines per slice
pub const SLICE_LINES: usize = 40;

const TOOL_INDENT: &str = "      ";

/// Renders the build log
#[derive(Debug, Clone)]
pub struct BuildReporter {
    name: String,
    version: String,
}

impl BuildReporter {
    pub fn new(buildpack: &BuildpackConfig) -> Self {
        Self {
            name: buildpack.name.clone(),
            version: buildpack.version.clone(),
        }
    }

    /// Render the full build log
    pub fn report(
        &self,
        plan: &BuildPlan,
        options: &BuildOptions,
        decisions: &[LayerDecision],
        tool_output: &[ExecutionOutput],
    ) -> String {
        let mut lines = vec![format!("{} {}", self.name, self.version)];

        lines.push("  Build configuration:".to_string());
        for (key, value) in options.declared() {
            lines.push(format!("    {}: {}", key, value));
        }
        lines.push(String::new());

        lines.push(format!(
            "  Selected .NET SDK version: {} (target {})",
            plan.sdk_version, plan.target_framework
        ));
        lines.push(format!("  Configuration: {}", plan.configuration));
        lines.push(String::new());

        for decision in decisions {
            self.layer_block(&mut lines, decision, options.log_level);
        }

        if !tool_output.is_empty() {
            lines.push("  Executing build process".to_string());
            for output in tool_output {
                lines.push(format!("    Running '{}'", output.command));
                if options.disable_output_slicing {
                    lines.extend(output.lines.iter().map(|l| format!("{}{}", TOOL_INDENT, l)));
                } else {
                    sliced(&mut lines, &output.lines);
                }
            }
            lines.push(String::new());
        }

        if options.disable_output_slicing {
            lines.push("  Skipping output slicing".to_string());
            lines.push(String::new());
        }

        let mut text = lines.join("\n");
        text.push('\n');
        text
    }

    fn layer_block(&self, lines: &mut Vec<String>, decision: &LayerDecision, level: LogLevel) {
        let flags = decision.binding.flags;
        lines.push(format!("  Setting up layer '{}'", decision.name()));
        lines.push(format!("    Available at launch: {}", flags.launch));
        lines.push(format!("    Available to other buildpacks: {}", flags.build));
        lines.push(format!("    Cached for rebuilds: {}", flags.cache));
        lines.push(String::new());

        // Decision lines sit outside the flag block, which stays four lines plus a blank
        lines.push(match decision.decision {
            CacheDecision::Reuse => format!("  Reusing cached layer '{}'", decision.name()),
            CacheDecision::Rebuild => format!("  Rebuilding layer '{}'", decision.name()),
        });
        if level == LogLevel::Debug {
            lines.push(format!(
                "    Fingerprint ({}): {}",
                decision.binding.kind, decision.fingerprint
            ));
        }
        lines.push(String::new());
    }
}

fn sliced(lines: &mut Vec<String>, output: &[String]) {
    let total = output.len().div_ceil(SLICE_LINES);
    for (i, chunk) in output.chunks(SLICE_LINES).enumerate() {
        lines.push(format!("{}--- output slice {}/{} ---", TOOL_INDENT, i + 1, total));
        lines.extend(chunk.iter().map(|l| format!("{}{}", TOOL_INDENT, l)));
    }
}
