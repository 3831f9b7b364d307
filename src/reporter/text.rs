//! Plain text summary generator.

use crate::config::Config;
use crate::error::Result;
use crate::reporter::ReportGenerator;
use crate::types::{ChunkRunResult, RepoChunks};
use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use std::collections::BTreeMap;

/// Text summary generator for CLI output.
pub struct TextReporter {
    /// Whether to use colors
    use_colors: bool,
}

impl TextReporter {
    /// Create a new text reporter.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            use_colors: config.output.colored,
        }
    }
}

impl ReportGenerator for TextReporter {
    fn generate(&self, result: &ChunkRunResult) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header());
        output.push('\n');

        output.push_str(&self.format_repositories(result));
        output.push('\n');

        if result.total_chunks() > 0 {
            output.push_str(&self.format_types(result));
            output.push('\n');
        }

        let skipped: Vec<_> = result
            .repositories
            .iter()
            .filter(|r| !r.skipped.is_empty())
            .collect();
        if !skipped.is_empty() || !result.failures.is_empty() {
            output.push_str(&self.format_problems(&skipped, result));
            output.push('\n');
        }

        output.push_str(&self.format_footer(result));
        Ok(output)
    }
}

impl TextReporter {
    fn section(&self, title: &str) -> String {
        let title = if self.use_colors {
            title.bright_cyan().bold().to_string()
        } else {
            title.to_string()
        };
        format!("\n{title}\n{}\n", "-".repeat(80))
    }

    fn format_header(&self) -> String {
        let title = "IaCDrift Chunking";
        let version = format!("v{}", env!("CARGO_PKG_VERSION"));
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");

        if self.use_colors {
            format!(
                "\n{} {} {}\n{}\n",
                title.bright_white().bold(),
                version.dimmed(),
                format!("({timestamp})").dimmed(),
                "=".repeat(80).bright_blue(),
            )
        } else {
            format!("\n{title} {version} ({timestamp})\n{}\n", "=".repeat(80))
        }
    }

    fn format_repositories(&self, result: &ChunkRunResult) -> String {
        let mut output = self.section("Repositories");

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Repository", "Commit", "Owner", "Files", "Fallback", "Chunks"]);

        for repo in &result.repositories {
            self.add_repo_row(&mut table, repo);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn add_repo_row(&self, table: &mut Table, repo: &RepoChunks) {
        let fallback = Cell::new(repo.fallback_files);
        let fallback = if self.use_colors && repo.fallback_files > 0 {
            fallback.fg(Color::Yellow)
        } else {
            fallback
        };

        table.add_row(vec![
            Cell::new(truncate(&repo.context.url, 48)),
            Cell::new(&repo.context.commit),
            Cell::new(&repo.context.owner),
            Cell::new(repo.files_processed),
            fallback,
            Cell::new(repo.records.len()),
        ]);
    }

    fn format_types(&self, result: &ChunkRunResult) -> String {
        let mut output = self.section("Chunks by type");

        let mut totals: BTreeMap<String, usize> = BTreeMap::new();
        for repo in &result.repositories {
            for (kind, count) in repo.counts_by_type() {
                *totals.entry(kind).or_insert(0) += count;
            }
        }

        let mut table = Table::new();
        table
            .load_preset(comfy_table::presets::UTF8_BORDERS_ONLY)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["Type", "Chunks"]);
        for (kind, count) in totals {
            table.add_row(vec![Cell::new(kind), Cell::new(count)]);
        }

        output.push_str(&table.to_string());
        output.push('\n');
        output
    }

    fn format_problems(&self, skipped: &[&RepoChunks], result: &ChunkRunResult) -> String {
        let mut output = self.section("Skipped");

        for repo in skipped {
            for file in &repo.skipped {
                let line = format!("  {} {}: {}", repo.context.name, file.file, file.reason);
                if self.use_colors {
                    output.push_str(&line.yellow().to_string());
                } else {
                    output.push_str(&line);
                }
                output.push('\n');
            }
        }

        for (path, error) in &result.failures {
            let line = format!("  {}: {error}", path.display());
            if self.use_colors {
                output.push_str(&line.red().to_string());
            } else {
                output.push_str(&line);
            }
            output.push('\n');
        }

        output
    }

    fn format_footer(&self, result: &ChunkRunResult) -> String {
        let owners = result.owners();
        let summary = format!(
            "{} chunks from {} repositories (owners: {})",
            result.total_chunks(),
            result.repositories.len(),
            if owners.is_empty() { "-".to_string() } else { owners.join(", ") },
        );

        let status = if !result.failures.is_empty() {
            if self.use_colors {
                format!("{} {summary}", "PARTIAL".yellow().bold())
            } else {
                format!("PARTIAL {summary}")
            }
        } else if self.use_colors {
            format!("{} {summary}", "DONE".green().bold())
        } else {
            format!("DONE {summary}")
        };

        format!("\n{status}\n\n")
    }
}

/// Truncate a string to a maximum length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::test_support::sample_result;

    fn plain() -> TextReporter {
        let mut config = Config::default();
        config.output.colored = false;
        TextReporter::new(&config)
    }

    #[test]
    fn test_text_report_generation() {
        let text = plain().generate(&sample_result()).unwrap();

        assert!(text.contains("IaCDrift Chunking"));
        assert!(text.contains("Repositories"));
        assert!(text.contains("Chunks by type"));
        assert!(text.contains("provider"));
        assert!(text.contains("broken.tf"));
        assert!(text.contains("PARTIAL 2 chunks from 1 repositories (owners: acme)"));
    }

    #[test]
    fn test_empty_run() {
        let text = plain().generate(&ChunkRunResult::default()).unwrap();
        assert!(!text.contains("Chunks by type"));
        assert!(text.contains("DONE 0 chunks from 0 repositories (owners: -)"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
    }
}
