//! Report formatting
//!
//! Renders an [`AnalysisReport`] as a sectioned human listing, a count summary,
//! or the serialized model.

use std::fmt::Write as _;
use std::time::Duration;

use crate::analyzer::{AnalysisReport, PerformanceMetrics};
use crate::cli::{OutputFormat, VerbosityLevel};
use crate::model::{ApiModel, InvocationChain};

/// Output formatter for analysis reports
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_report(&self, report: &AnalysisReport) -> serde_json::Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&report.model),
            OutputFormat::Summary => Ok(self.format_summary(report)),
            OutputFormat::Human => Ok(self.format_human(report)),
        }
    }

    fn format_summary(&self, report: &AnalysisReport) -> String {
        let model = &report.model;
        let ctx = model.context();

        if self.verbosity == VerbosityLevel::Quiet {
            return format!(
                "{} commands, {} structures, {} extension structures\n",
                ctx.functions.len(),
                ctx.structures.len(),
                ctx.extension_structs.len()
            );
        }

        let mut out = String::new();
        let _ = writeln!(out, "{}", self.colorize("Registry Summary:", "1"));
        let _ = writeln!(out, "  Source: {}", report.source);
        let _ = writeln!(out, "  Extension tags: {}", ctx.extension_tags.len());
        let _ = writeln!(out, "  Platforms: {}", ctx.platforms.len());
        let _ = writeln!(
            out,
            "  Extensions: {} ({} disabled)",
            ctx.extensions.len(),
            ctx.disabled_extensions.len()
        );
        let _ = writeln!(out, "  Commands: {}", ctx.functions.len());
        for chain in [
            InvocationChain::Instance,
            InvocationChain::Device,
            InvocationChain::Unchained,
        ] {
            let _ = writeln!(out, "    {}: {}", chain, model.chain(chain).len());
        }
        let _ = writeln!(out, "  Query-twice commands: {}", ctx.query_twice.len());
        let _ = writeln!(out, "  Creators: {}", ctx.creators.len());
        let _ = writeln!(out, "  Destroyers: {}", ctx.destroyers.len());
        let _ = writeln!(
            out,
            "  Externally synchronized: {}",
            ctx.externally_synchronized.len()
        );
        let _ = writeln!(out, "  Structures: {}", ctx.structures.len());
        let _ = writeln!(out, "  Handles: {}", ctx.handles.len());
        let _ = writeln!(out, "  Type mappings: {}", ctx.type_mappings.len());
        let _ = writeln!(
            out,
            "  {} {}",
            self.colorize("Extension structures:", "32"),
            ctx.extension_structs.len()
        );
        let _ = writeln!(
            out,
            "  Feature detection: {} structures, {} commands",
            ctx.feature_detection_structs.len(),
            ctx.feature_detection_funcs.len()
        );

        let conflicts = ctx.diagnostics.guard_conflicts.len();
        if conflicts > 0 {
            let _ = writeln!(
                out,
                "  {} {}",
                self.colorize("Guard conflicts:", "33"),
                conflicts
            );
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            out.push_str(&format_metrics(&report.metrics));
        }
        out
    }

    fn format_human(&self, report: &AnalysisReport) -> String {
        let model = &report.model;
        let mut out = self.format_summary(report);
        if self.verbosity == VerbosityLevel::Quiet {
            return out;
        }

        for chain in [
            InvocationChain::Instance,
            InvocationChain::Device,
            InvocationChain::Unchained,
        ] {
            self.section(&mut out, &format!("{} chain", chain));
            for name in model.chain(chain) {
                let _ = writeln!(out, "  {}", name);
            }
        }

        self.section(&mut out, "Query-twice commands");
        for (name, query) in &model.context().query_twice {
            let outputs: Vec<String> = query
                .outputs
                .iter()
                .map(|o| format!("{}: {}", o.name, o.ty))
                .collect();
            let _ = writeln!(
                out,
                "  {} [{}: {}] -> {}",
                name,
                query.count_name,
                query.count_type,
                outputs.join(", ")
            );
        }

        self.section(&mut out, "Handle lifecycles");
        for (label, table) in [
            ("create", &model.context().creators),
            ("destroy", &model.context().destroyers),
        ] {
            for (name, lifecycle) in table {
                let _ = writeln!(
                    out,
                    "  {} {} {} x{} ({})",
                    label, name, lifecycle.handle_type, lifecycle.count, lifecycle.handle_name
                );
            }
        }

        self.section(&mut out, "Externally synchronized");
        for sync in model.externally_synchronized() {
            let _ = writeln!(out, "  {}::{}", sync.owner, sync.member);
        }

        self.section(&mut out, "Extension structures");
        for name in model.extension_structs() {
            let stype = model.structure_type(name).unwrap_or("?");
            let _ = writeln!(out, "  {} ({})", name, stype);
        }

        if self.verbosity >= VerbosityLevel::Verbose {
            self.format_diagnostics(&mut out, model);
        }
        out
    }

    fn format_diagnostics(&self, out: &mut String, model: &ApiModel) {
        let diagnostics = model.diagnostics();
        self.section(out, "Diagnostics");
        for conflict in &diagnostics.guard_conflicts {
            let _ = writeln!(
                out,
                "  {} {}: {} then {}",
                self.colorize("guard conflict", "33"),
                conflict.name,
                conflict.previous,
                conflict.current
            );
        }
        if !diagnostics.guarded_structs.is_empty() {
            let _ = writeln!(
                out,
                "  platform-guarded structures: {}",
                diagnostics.guarded_structs.join(", ")
            );
        }
        if !diagnostics.opaque_basetypes.is_empty() {
            let _ = writeln!(
                out,
                "  opaque basetypes: {}",
                diagnostics.opaque_basetypes.join(", ")
            );
        }
        let _ = writeln!(
            out,
            "  skipped: {} alias handles, {} alias bitmasks, {} vendor handles, {} vendor aliases, {} disabled commands",
            diagnostics.skipped_alias_handles,
            diagnostics.skipped_alias_bitmasks,
            diagnostics.skipped_vendor_handles,
            diagnostics.skipped_vendor_aliases,
            diagnostics.skipped_disabled_commands
        );
    }

    fn section(&self, out: &mut String, title: &str) {
        let _ = writeln!(out, "\n{}", self.colorize(&format!("{}:", title), "1"));
    }
}

fn format_metrics(metrics: &PerformanceMetrics) -> String {
    let mut out = String::from("\nTimings:\n");
    for (phase, duration) in &metrics.phases {
        let _ = writeln!(out, "  {:?}: {}", phase, format_duration(*duration));
    }
    let _ = writeln!(out, "  Total: {}", format_duration(metrics.total_duration));
    out
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else {
        format!("{:.2}s", total_secs)
    }
}
