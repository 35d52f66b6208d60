use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};

use crate::models::{AuditResult, CategoryScore, Narrative, NarrativeSections};

pub const DETAIL_FILE: &str = "audit_detail.md";
const PAGE_BREAK: &str = "\n---\n";

/// Agency fields printed in the report footer. `extra` carries any additional
/// key/value pairs verbatim.
#[derive(Debug, Clone, Default)]
pub struct Branding {
    pub contact_name: Option<String>,
    pub contact_title: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl Branding {
    fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = [
            &self.contact_name,
            &self.contact_title,
            &self.contact_phone,
            &self.contact_email,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
        lines.extend(self.extra.iter().map(|(key, value)| format!("{key}: {value}")));
        lines
    }
}

pub fn build_report(result: &AuditResult, branding: &Branding) -> String {
    let submission = &result.submission;
    let overall = &result.overall;
    let mut output = String::new();

    let _ = writeln!(output, "# AI Visibility Audit: {}", submission.business_name);
    let _ = writeln!(
        output,
        "Audited {} on {}",
        submission.website_url,
        result.completed_at.format("%Y-%m-%d")
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "**Visibility Score: {}/{} (Grade {})**",
        overall.total_points, overall.max_total_points, overall.grade
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", overall.summary_text);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Category Overview");
    for score in &overall.category_scores {
        let _ = writeln!(
            output,
            "- {}: {}/{} ({:.0}%, grade {})",
            score.category_name, score.points_earned, score.points_possible, score.percentage, score.grade
        );
    }

    output.push_str(PAGE_BREAK);
    let _ = writeln!(output, "## AI Visibility Summary");
    match &overall.narrative {
        Some(Narrative::Deterministic(sections)) => write_sections(&mut output, sections),
        Some(Narrative::Generated { paragraphs }) => {
            for paragraph in paragraphs {
                let _ = writeln!(output, "{paragraph}");
                let _ = writeln!(output);
            }
        }
        None => {
            let _ = writeln!(output, "No narrative was generated for this audit.");
        }
    }

    for score in &overall.category_scores {
        output.push_str(PAGE_BREAK);
        write_category(&mut output, score);
    }

    let footer = branding.lines();
    if !footer.is_empty() {
        output.push_str(PAGE_BREAK);
        let _ = writeln!(output, "## Prepared By");
        for line in footer {
            let _ = writeln!(output, "{line}");
        }
    }

    output
}

fn write_sections(output: &mut String, sections: &NarrativeSections) {
    let _ = writeln!(output, "{}", sections.readiness_explanation);
    let _ = writeln!(output);
    let _ = writeln!(output, "**Bottleneck:** {}", sections.bottleneck_impact);
    let _ = writeln!(output);
    let _ = writeln!(output, "**Strengths:** {}", sections.strength_summary);
    let _ = writeln!(output);
    let _ = writeln!(output, "**Gaps:** {}", sections.gap_summary);
    let _ = writeln!(output);
    let _ = writeln!(output, "### Fastest Score Gains");
    for (index, step) in sections.next_steps.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", index + 1, step);
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "{}", sections.closing_line);
    let _ = writeln!(output);
    let _ = writeln!(output, "_{}_", sections.benchmark_text);
}

fn write_category(output: &mut String, score: &CategoryScore) {
    let _ = writeln!(
        output,
        "## Layer {}: {} ({}/{}, grade {})",
        score.category.id(),
        score.category_name,
        score.points_earned,
        score.points_possible,
        score.grade
    );

    if score.tasks.is_empty() {
        let _ = writeln!(output, "No checks ran for this layer.");
        return;
    }

    for task in &score.tasks {
        let _ = writeln!(
            output,
            "- [{}] {} ({}, {}/{}): {}",
            task.status().label(),
            task.name(),
            task.id(),
            task.points_awarded(),
            task.points_possible(),
            task.rationale()
        );
        for (key, value) in task.evidence() {
            let _ = writeln!(output, "  - {key}: {value}");
        }
    }
}

/// `<base>/<business>_<timestamp>`, keeping only alphanumerics, spaces and
/// hyphens from the business name.
pub fn report_dir(base: &Path, business_name: &str, at: DateTime<Utc>) -> PathBuf {
    let safe: String = business_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
        .collect();
    let safe = safe.trim().replace(' ', "_");
    base.join(format!("{safe}_{}", at.format("%Y%m%d_%H%M%S")))
}

pub fn write_report(result: &AuditResult, branding: &Branding, out_dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create report directory {}", out_dir.display()))?;
    let path = out_dir.join(DETAIL_FILE);
    std::fs::write(&path, build_report(result, branding))
        .with_context(|| format!("failed to write report {}", path.display()))?;
    Ok(path)
}
