use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::models::{AuditResult, Category};

pub const LEADS_FILE: &str = "audit_leads.csv";

const HEADER: [&str; 13] = [
    "Timestamp",
    "ID",
    "Business Name",
    "URL",
    "Email",
    "Overall Score",
    "Grade",
    "L1 Score",
    "L2 Score",
    "L3 Score",
    "L4 Score",
    "L5 Score",
    "Detailed Data Path",
];

/// Append-only CSV with one row per completed audit.
pub struct LeadStore {
    path: PathBuf,
}

impl LeadStore {
    /// Opens the store under `dir`, creating the directory and header row if
    /// needed.
    pub fn open(dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create storage directory {}", dir.display()))?;
        let path = dir.join(LEADS_FILE);

        if !path.exists() {
            let mut writer = csv::Writer::from_path(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, result: &AuditResult, detail_path: &Path) -> anyhow::Result<()> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let mut writer = csv::Writer::from_writer(file);

        let submission = &result.submission;
        let overall = &result.overall;
        let mut record = vec![
            submission.created_at.to_rfc3339(),
            submission.id.to_string(),
            submission.business_name.clone(),
            submission.website_url.clone(),
            submission.contact_email.clone(),
            overall.total_points.to_string(),
            overall.grade.to_string(),
        ];
        record.extend(Category::ALL.iter().map(|category| {
            overall
                .category(*category)
                .map_or(0, |score| score.points_earned)
                .to_string()
        }));
        record.push(detail_path.display().to_string());

        writer.write_record(&record)?;
        writer.flush()?;

        info!(path = %self.path.display(), business = %submission.business_name, "Lead saved");
        Ok(())
    }
}
