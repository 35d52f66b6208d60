use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    EntityClarity = 1,
    StructuralAccessibility = 2,
    SemanticAlignment = 3,
    Authority = 4,
    AutomationReadiness = 5,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::EntityClarity,
        Category::StructuralAccessibility,
        Category::SemanticAlignment,
        Category::Authority,
        Category::AutomationReadiness,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::EntityClarity => "Entity Clarity",
            Category::StructuralAccessibility => "Structural Accessibility",
            Category::SemanticAlignment => "Semantic Alignment",
            Category::Authority => "Authority & Reinforcement",
            Category::AutomationReadiness => "Automation Readiness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Pass,
    Warn,
    Fail,
    #[default]
    Info,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            TaskStatus::Pass => "PASS",
            TaskStatus::Warn => "WARN",
            TaskStatus::Fail => "FAIL",
            TaskStatus::Info => "INFO",
        }
    }
}

pub type Evidence = BTreeMap<String, serde_json::Value>;

/// Static definition of one rubric check. Every `Task` is produced from one of
/// these, so ids and point budgets are fixed at compile time.
#[derive(Debug, Clone, Copy)]
pub struct CheckDef {
    pub id: &'static str,
    pub category: Category,
    pub name: &'static str,
    pub description: &'static str,
    pub points_possible: u32,
}

impl CheckDef {
    /// Awards `points`, capped at the check's budget.
    pub fn pass(&self, points: u32, rationale: impl Into<String>) -> Task {
        self.build(TaskStatus::Pass, points.min(self.points_possible), rationale)
    }

    pub fn warn(&self, rationale: impl Into<String>) -> Task {
        self.build(TaskStatus::Warn, 0, rationale)
    }

    pub fn fail(&self, rationale: impl Into<String>) -> Task {
        self.build(TaskStatus::Fail, 0, rationale)
    }

    pub fn info(&self, rationale: impl Into<String>) -> Task {
        self.build(TaskStatus::Info, 0, rationale)
    }

    fn build(&self, status: TaskStatus, points_awarded: u32, rationale: impl Into<String>) -> Task {
        Task {
            id: self.id,
            category: self.category,
            name: self.name,
            description: self.description,
            status,
            points_awarded,
            points_possible: self.points_possible,
            evidence: Evidence::new(),
            rationale: rationale.into(),
        }
    }
}

/// Outcome of one rubric check. Fields are read-only after construction; the
/// only way to attach evidence is the consuming `with_evidence`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    id: &'static str,
    category: Category,
    name: &'static str,
    description: &'static str,
    status: TaskStatus,
    points_awarded: u32,
    points_possible: u32,
    evidence: Evidence,
    rationale: String,
}

impl Task {
    pub fn with_evidence(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.evidence.insert(key.to_string(), value.into());
        self
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn points_awarded(&self) -> u32 {
        self.points_awarded
    }

    pub fn points_possible(&self) -> u32 {
        self.points_possible
    }

    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: Category,
    pub category_name: &'static str,
    pub points_earned: u32,
    pub points_possible: u32,
    pub percentage: f64,
    pub grade: char,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NarrativeSections {
    pub readiness_explanation: String,
    pub bottleneck_impact: String,
    pub strength_summary: String,
    pub gap_summary: String,
    pub next_steps: [String; 3],
    pub closing_line: String,
    pub benchmark_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Narrative {
    Deterministic(NarrativeSections),
    Generated { paragraphs: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallScore {
    pub total_points: u32,
    pub max_total_points: u32,
    pub percentage: f64,
    pub grade: char,
    pub summary_text: String,
    pub narrative: Option<Narrative>,
    pub category_scores: Vec<CategoryScore>,
}

impl OverallScore {
    pub fn category(&self, category: Category) -> Option<&CategoryScore> {
        self.category_scores.iter().find(|score| score.category == category)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: Uuid,
    pub business_name: String,
    pub website_url: String,
    pub contact_email: String,
    pub location: Option<String>,
    pub services: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub job_id: Uuid,
    pub submission: Submission,
    pub overall: OverallScore,
    pub completed_at: DateTime<Utc>,
}
