use std::fmt::Write;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::models::{Category, CategoryScore, Narrative, NarrativeSections, OverallScore, Submission};
use crate::scoring::{is_strong, is_weak};

const MAX_LISTED: usize = 3;

pub const SYSTEM_INSTRUCTION: &str = "You are an AI visibility consultant. Using only the audit scores \
provided, write a short personalized summary for the business owner: how visible and trustworthy the \
brand is to AI assistants, the main bottleneck, its strengths and gaps, and three prioritized next steps. \
Write plain prose paragraphs separated by newlines. Do not invent findings.";

const CLOSING_LINE: &str = "With targeted upgrades in structure and authority, your existing automation stack is \
well positioned to convert increased AI visibility into measurable lead flow.";
const BENCHMARK_TEXT: &str = "Most businesses at this early visibility stage score between 55 and 75.";

/// External text generator that may replace the deterministic narrative.
#[async_trait]
pub trait NarrativeDelegate: Send + Sync {
    async fn generate(&self, system: &str, prompt: &str) -> anyhow::Result<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DelegateOutcome {
    Generated(String),
    Empty,
    Failed(String),
    TimedOut,
}

pub async fn request_delegate(
    delegate: &dyn NarrativeDelegate,
    submission: &Submission,
    score: &OverallScore,
    timeout: Duration,
) -> DelegateOutcome {
    let prompt = delegate_prompt(submission, score);
    match tokio::time::timeout(timeout, delegate.generate(SYSTEM_INSTRUCTION, &prompt)).await {
        Ok(Ok(text)) if text.trim().is_empty() => DelegateOutcome::Empty,
        Ok(Ok(text)) => DelegateOutcome::Generated(text),
        Ok(Err(err)) => DelegateOutcome::Failed(err.to_string()),
        Err(_) => DelegateOutcome::TimedOut,
    }
}

/// Uses the delegate's text verbatim when it produces any, otherwise the
/// deterministic narrative. The two are never mixed.
pub async fn build_narrative(
    submission: &Submission,
    score: &OverallScore,
    delegate: Option<&dyn NarrativeDelegate>,
    timeout: Duration,
) -> Narrative {
    if let Some(delegate) = delegate {
        match request_delegate(delegate, submission, score, timeout).await {
            DelegateOutcome::Generated(text) => {
                info!(business = %submission.business_name, "Using generated narrative");
                return Narrative::Generated {
                    paragraphs: paragraphs(&text),
                };
            }
            DelegateOutcome::Empty => info!("Narrative delegate returned no text; using fallback"),
            DelegateOutcome::Failed(err) => warn!(error = %err, "Narrative delegate failed; using fallback"),
            DelegateOutcome::TimedOut => warn!(?timeout, "Narrative delegate timed out; using fallback"),
        }
    }

    Narrative::Deterministic(deterministic_narrative(score))
}

pub fn paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect()
}

pub fn delegate_prompt(submission: &Submission, score: &OverallScore) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Business: {}", submission.business_name);
    let _ = writeln!(prompt, "Website: {}", submission.website_url);
    let _ = writeln!(
        prompt,
        "Overall score: {}/{} (grade {})",
        score.total_points, score.max_total_points, score.grade
    );
    for category in &score.category_scores {
        let _ = writeln!(
            prompt,
            "- {}: {}/{} points ({:.0}%, grade {})",
            category.category_name,
            category.points_earned,
            category.points_possible,
            category.percentage,
            category.grade
        );
    }
    prompt
}

/// Ranks categories by absolute points earned, lowest first. Ties keep
/// category order.
pub fn rank_bottlenecks(score: &OverallScore) -> Vec<&CategoryScore> {
    let mut ranked: Vec<&CategoryScore> = score.category_scores.iter().collect();
    ranked.sort_by_key(|s| s.points_earned);
    ranked
}

pub fn deterministic_narrative(score: &OverallScore) -> NarrativeSections {
    let ranked = rank_bottlenecks(score);
    let bottleneck = ranked.first().copied();
    let runner_up = ranked.get(1).copied();

    let strengths: Vec<&str> = score
        .category_scores
        .iter()
        .filter(|s| is_strong(s))
        .map(|s| s.category_name)
        .take(MAX_LISTED)
        .collect();
    let gaps: Vec<&str> = score
        .category_scores
        .iter()
        .filter(|s| is_weak(s))
        .map(|s| s.category_name)
        .take(MAX_LISTED)
        .collect();

    let strength_summary = if strengths.is_empty() {
        "No dominant strengths detected yet; the foundation needs reinforcement.".to_string()
    } else {
        format!(
            "Strong signals detected in {}, providing a solid foundation.",
            strengths.join(", ")
        )
    };

    let gap_summary = if gaps.is_empty() {
        "No critical failures detected, but optimization is possible.".to_string()
    } else {
        format!("Critical gaps in {} are reducing your Visibility Score.", gaps.join(", "))
    };

    NarrativeSections {
        readiness_explanation: readiness_explanation(score.total_points).to_string(),
        bottleneck_impact: bottleneck_impact(bottleneck, runner_up),
        strength_summary,
        gap_summary,
        next_steps: next_steps(score, bottleneck, runner_up),
        closing_line: CLOSING_LINE.to_string(),
        benchmark_text: BENCHMARK_TEXT.to_string(),
    }
}

pub fn readiness_explanation(total_points: u32) -> &'static str {
    match total_points {
        80.. => "Your brand is highly visible to AI systems. Agents can confidently verify your identity and authority.",
        50..=79 => "AI systems can find and understand your brand, but may hesitate to cite or recommend it due to authority and alignment gaps.",
        _ => "Your brand is currently invisible or untrusted by AI systems. Agents will likely ignore your entity in favor of clearer competitors.",
    }
}

fn bottleneck_impact(bottleneck: Option<&CategoryScore>, runner_up: Option<&CategoryScore>) -> String {
    let Some(bottleneck) = bottleneck else {
        return "No category results were available to identify a bottleneck.".to_string();
    };

    match runner_up.filter(|s| is_weak(s)) {
        Some(runner_up) => format!(
            "The primary visibility constraint is a combination of {} and {}. AI systems can access your site, \
             but inconsistent hierarchy signals and limited third-party validation reduce confidence in citing \
             or recommending your brand.",
            bottleneck.category_name, runner_up.category_name
        ),
        None => format!(
            "The primary bottleneck is {} ({}). This prevents AI agents from {}.",
            bottleneck.category_name,
            bottleneck.grade,
            blocked_capability(bottleneck.category)
        ),
    }
}

fn blocked_capability(category: Category) -> &'static str {
    match category {
        Category::EntityClarity => "unambiguously identifying who you are",
        Category::StructuralAccessibility => "efficiently crawling and indexing your content",
        Category::SemanticAlignment => "understanding the semantic meaning of your services",
        Category::Authority => "trusting your brand enough to recommend it",
        Category::AutomationReadiness => "taking action or converting traffic on your behalf",
    }
}

pub fn category_fix(category: Category) -> &'static str {
    match category {
        Category::EntityClarity => "Claim your Google Business Profile to lock in identity trust.",
        Category::StructuralAccessibility => "Add a homepage H1 tag to restore hierarchy signals.",
        Category::SemanticAlignment => "Enrich Title Tags and Meta Descriptions to clarify semantic meaning.",
        Category::Authority => "Generate 3-5 new reviews on Google/Trustpilot to validate authority.",
        Category::AutomationReadiness => "Implement a chat widget or lead capture form to become fully equipped.",
    }
}

const GENERIC_FIX: &str = "Optimize site structure.";
const MONITOR_AUTOMATION: &str = "Monitor and optimize existing conversion interactions to ensure AI-driven traffic is captured efficiently.";
const INSTALL_CAPTURE: &str = "Install conversion interactions (Chat/Forms) to capture AI-driven traffic.";
const VERIFY_IDENTITY: &str = "Verify business details on 3rd-party knowledge graphs (Wikidata, Crunchbase) to solidify trust.";

fn next_steps(
    score: &OverallScore,
    bottleneck: Option<&CategoryScore>,
    runner_up: Option<&CategoryScore>,
) -> [String; 3] {
    let fix = |s: Option<&CategoryScore>| s.map_or(GENERIC_FIX, |s| category_fix(s.category)).to_string();

    let third = match bottleneck.map(|s| s.category) {
        Some(Category::AutomationReadiness) => VERIFY_IDENTITY,
        _ => match score.category(Category::AutomationReadiness) {
            Some(automation) if automation.percentage >= 100.0 => MONITOR_AUTOMATION,
            _ => INSTALL_CAPTURE,
        },
    };

    [fix(bottleneck), fix(runner_up), third.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{percentage, score_overall};
    use chrono::Utc;
    use uuid::Uuid;

    fn category_score(category: Category, earned: u32, possible: u32) -> CategoryScore {
        let percentage = percentage(earned, possible);
        CategoryScore {
            category,
            category_name: category.name(),
            points_earned: earned,
            points_possible: possible,
            percentage,
            grade: crate::scoring::grade_for(percentage),
            tasks: Vec::new(),
        }
    }

    fn overall(points: [(u32, u32); 5]) -> OverallScore {
        let scores = Category::ALL
            .iter()
            .zip(points)
            .map(|(category, (earned, possible))| category_score(*category, earned, possible))
            .collect();
        score_overall(scores)
    }

    fn submission() -> Submission {
        Submission {
            id: Uuid::new_v4(),
            business_name: "Rise Bakery".to_string(),
            website_url: "https://risebakery.com".to_string(),
            contact_email: "owner@risebakery.com".to_string(),
            location: None,
            services: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn lowest_points_is_single_bottleneck() {
        let score = overall([(2, 10), (10, 10), (10, 10), (10, 10), (10, 10)]);
        let narrative = deterministic_narrative(&score);
        assert_eq!(rank_bottlenecks(&score)[0].category, Category::EntityClarity);
        assert_eq!(
            narrative.bottleneck_impact,
            "The primary bottleneck is Entity Clarity (F). This prevents AI agents from unambiguously identifying who you are."
        );
    }

    #[test]
    fn weak_runner_up_compounds_bottleneck() {
        let score = overall([(2, 10), (5, 10), (10, 10), (10, 10), (10, 10)]);
        let narrative = deterministic_narrative(&score);
        assert!(narrative
            .bottleneck_impact
            .starts_with("The primary visibility constraint is a combination of Entity Clarity and Structural Accessibility."));
        assert!(!narrative.bottleneck_impact.contains("The primary bottleneck is"));
    }

    #[test]
    fn bottleneck_follows_absolute_points_not_percentage() {
        // 3/5 is 60%, 4/20 is 20%: the smaller budget still ranks first.
        let score = overall([(3, 5), (4, 20), (20, 20), (20, 20), (15, 15)]);
        assert_eq!(rank_bottlenecks(&score)[0].category, Category::EntityClarity);
    }

    #[test]
    fn low_total_profile_reads_as_untrusted() {
        let score = overall([(7, 35), (20, 25), (8, 20), (1, 10), (9, 10)]);
        assert_eq!((score.total_points, score.max_total_points), (45, 100));

        let narrative = deterministic_narrative(&score);
        assert!(narrative.readiness_explanation.contains("invisible or untrusted"));
        assert_eq!(rank_bottlenecks(&score)[0].category, Category::Authority);
        assert_eq!(
            narrative.strength_summary,
            "Strong signals detected in Structural Accessibility, Automation Readiness, providing a solid foundation."
        );
        assert_eq!(
            narrative.gap_summary,
            "Critical gaps in Entity Clarity, Semantic Alignment, Authority & Reinforcement are reducing your Visibility Score."
        );
    }

    #[test]
    fn readiness_tiers_follow_total_points() {
        assert!(readiness_explanation(80).contains("highly visible"));
        assert!(readiness_explanation(79).contains("may hesitate"));
        assert!(readiness_explanation(50).contains("may hesitate"));
        assert!(readiness_explanation(49).contains("invisible"));
    }

    #[test]
    fn lists_cap_at_three_and_empty_strengths_have_a_sentence() {
        let score = overall([(0, 10), (1, 10), (2, 10), (3, 10), (4, 10)]);
        let narrative = deterministic_narrative(&score);
        assert_eq!(
            narrative.strength_summary,
            "No dominant strengths detected yet; the foundation needs reinforcement."
        );
        assert_eq!(
            narrative.gap_summary,
            "Critical gaps in Entity Clarity, Structural Accessibility, Semantic Alignment are reducing your Visibility Score."
        );
    }

    #[test]
    fn automation_bottleneck_gets_verification_step() {
        let score = overall([(20, 24), (18, 20), (18, 20), (15, 20), (0, 15)]);
        let steps = deterministic_narrative(&score).next_steps;
        assert_eq!(steps[0], category_fix(Category::AutomationReadiness));
        assert_eq!(steps[1], category_fix(Category::Authority));
        assert_eq!(steps[2], VERIFY_IDENTITY);
    }

    #[test]
    fn third_step_depends_on_automation_completeness() {
        let complete = overall([(2, 24), (10, 20), (18, 20), (15, 20), (15, 15)]);
        let steps = deterministic_narrative(&complete).next_steps;
        assert_eq!(steps[0], category_fix(Category::EntityClarity));
        assert_eq!(steps[1], category_fix(Category::StructuralAccessibility));
        assert_eq!(steps[2], MONITOR_AUTOMATION);

        let partial = overall([(2, 24), (10, 20), (18, 20), (15, 20), (10, 15)]);
        assert_eq!(deterministic_narrative(&partial).next_steps[2], INSTALL_CAPTURE);
    }

    #[test]
    fn deterministic_path_is_repeatable() {
        let score = overall([(7, 24), (13, 20), (8, 20), (0, 20), (10, 15)]);
        assert_eq!(deterministic_narrative(&score), deterministic_narrative(&score));
    }

    struct FixedDelegate(anyhow::Result<String>);

    #[async_trait]
    impl NarrativeDelegate for FixedDelegate {
        async fn generate(&self, system: &str, prompt: &str) -> anyhow::Result<String> {
            assert_eq!(system, SYSTEM_INSTRUCTION);
            assert!(prompt.contains("Rise Bakery"));
            match &self.0 {
                Ok(text) => Ok(text.clone()),
                Err(err) => Err(anyhow::anyhow!("{err}")),
            }
        }
    }

    struct SlowDelegate;

    #[async_trait]
    impl NarrativeDelegate for SlowDelegate {
        async fn generate(&self, _: &str, _: &str) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    fn sample_score() -> OverallScore {
        overall([(7, 24), (13, 20), (8, 20), (0, 20), (10, 15)])
    }

    #[tokio::test]
    async fn generated_text_is_used_verbatim() {
        let delegate = FixedDelegate(Ok("First paragraph.\n\n  Second paragraph.\n".to_string()));
        let narrative =
            build_narrative(&submission(), &sample_score(), Some(&delegate), Duration::from_secs(1)).await;
        assert_eq!(
            narrative,
            Narrative::Generated {
                paragraphs: vec!["First paragraph.".to_string(), "  Second paragraph.".to_string()]
            }
        );
    }

    #[tokio::test]
    async fn empty_or_failed_delegate_falls_back() {
        let score = sample_score();
        let expected = Narrative::Deterministic(deterministic_narrative(&score));

        let empty = FixedDelegate(Ok("  \n".to_string()));
        let failing = FixedDelegate(Err(anyhow::anyhow!("quota exceeded")));
        for delegate in [&empty as &dyn NarrativeDelegate, &failing] {
            let narrative = build_narrative(&submission(), &score, Some(delegate), Duration::from_secs(1)).await;
            assert_eq!(narrative, expected);
        }

        let narrative = build_narrative(&submission(), &score, None, Duration::from_secs(1)).await;
        assert_eq!(narrative, expected);
    }

    #[tokio::test]
    async fn slow_delegate_times_out() {
        let outcome =
            request_delegate(&SlowDelegate, &submission(), &sample_score(), Duration::from_millis(20)).await;
        assert_eq!(outcome, DelegateOutcome::TimedOut);
    }

    #[test]
    fn prompt_lists_every_category() {
        let prompt = delegate_prompt(&submission(), &sample_score());
        for category in Category::ALL {
            assert!(prompt.contains(category.name()));
        }
        assert!(prompt.contains("Overall score: 38/99"));
    }
}
