//! Rendering of compile reports.

use std::time::Duration;

use crate::annotate::AnnotationStats;
use crate::cli::{OutputFormat, VerbosityLevel};
use crate::compiler::{CompileReport, CompileStatus, PostProcessing};

/// Formats a [`CompileReport`] for the terminal or as JSON
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Disable ANSI colors regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_report(&self, report: &CompileReport) -> Result<String, serde_json::Error> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report),
            OutputFormat::Human => Ok(self.format_human(report)),
        }
    }

    fn format_human(&self, report: &CompileReport) -> String {
        let mut output = String::new();

        if self.verbosity == VerbosityLevel::Quiet {
            if report.post_processing.is_failed() {
                output.push_str(&self.format_post_processing(&report.post_processing));
                output.push('\n');
            }
            return output;
        }

        match report.status {
            CompileStatus::Skipped => {
                output.push_str(&format!(
                    "{}  no schemas to compile\n",
                    self.colorize("- SKIPPED", "36")
                ));
                return output;
            }
            CompileStatus::Succeeded => {
                output.push_str(&format!(
                    "{}  {} schema{}, {} binding{} ({})\n",
                    self.colorize("✓ GENERATED", "32"),
                    report.schemas,
                    plural(report.schemas),
                    report.bindings,
                    plural(report.bindings),
                    format_duration(report.duration)
                ));
            }
        }

        if let Some(dest_dir) = &report.dest_dir {
            output.push_str(&format!("  Output: {}\n", dest_dir.display()));
        }
        output.push_str(&format!(
            "  Post-processing: {}\n",
            self.format_post_processing(&report.post_processing)
        ));

        if self.verbosity >= VerbosityLevel::Verbose {
            if let Some(tool) = &report.tool {
                output.push_str(&format!("  Tool output lines: {}\n", tool.output_lines));
            }
            output.push_str(&format!(
                "  Temporary files removed: {}\n",
                report.temp_files_removed
            ));
        }

        if self.verbosity == VerbosityLevel::Debug {
            output.push_str(&format!(
                "  Finished at: {}\n",
                report.finished_at.format("%Y-%m-%d %H:%M:%S UTC")
            ));
        }

        output
    }

    fn format_post_processing(&self, post_processing: &PostProcessing) -> String {
        match post_processing {
            PostProcessing::Disabled => "disabled".to_string(),
            PostProcessing::Completed(stats) => format_stats(stats),
            PostProcessing::Failed { message } => {
                format!("{} {}", self.colorize("⚠ FAILED", "33"), message)
            }
        }
    }
}

fn format_stats(stats: &AnnotationStats) -> String {
    format!(
        "{} of {} source{} annotated",
        stats.inserted,
        stats.files_scanned,
        plural(stats.files_scanned)
    )
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
