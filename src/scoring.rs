use crate::models::{Category, CategoryScore, OverallScore, Task};

const STRONG_THRESHOLD: f64 = 80.0;
const WEAK_THRESHOLD: f64 = 60.0;

const BASE_SENTENCE: &str = "Your score reflects how ready AI systems are to confidently cite, trust, and act on behalf of your brand.";

pub fn grade_for(percentage: f64) -> char {
    match percentage {
        p if p >= 90.0 => 'A',
        p if p >= 80.0 => 'B',
        p if p >= 70.0 => 'C',
        p if p >= 60.0 => 'D',
        _ => 'F',
    }
}

fn raw_percentage(earned: u32, possible: u32) -> f64 {
    if possible == 0 {
        return 0.0;
    }
    f64::from(earned) / f64::from(possible) * 100.0
}

/// Display percentage, rounded to two decimals. Grades use the unrounded value.
pub fn percentage(earned: u32, possible: u32) -> f64 {
    (raw_percentage(earned, possible) * 100.0).round() / 100.0
}

pub fn is_strong(score: &CategoryScore) -> bool {
    score.percentage >= STRONG_THRESHOLD
}

pub fn is_weak(score: &CategoryScore) -> bool {
    score.percentage < WEAK_THRESHOLD
}

/// Scores one category from the pooled task list, keeping evaluation order.
pub fn score_category(category: Category, tasks: &[Task]) -> CategoryScore {
    let tasks: Vec<Task> = tasks
        .iter()
        .filter(|task| task.category() == category)
        .cloned()
        .collect();
    let points_earned = tasks.iter().map(Task::points_awarded).sum();
    let points_possible = tasks.iter().map(Task::points_possible).sum();
    CategoryScore {
        category,
        category_name: category.name(),
        points_earned,
        points_possible,
        percentage: percentage(points_earned, points_possible),
        grade: grade_for(raw_percentage(points_earned, points_possible)),
        tasks,
    }
}

pub fn score_all(tasks: &[Task]) -> OverallScore {
    let category_scores = Category::ALL
        .iter()
        .map(|category| score_category(*category, tasks))
        .collect();
    score_overall(category_scores)
}

pub fn score_overall(category_scores: Vec<CategoryScore>) -> OverallScore {
    let total_points = category_scores.iter().map(|s| s.points_earned).sum();
    let max_total_points = category_scores.iter().map(|s| s.points_possible).sum();
    OverallScore {
        total_points,
        max_total_points,
        percentage: percentage(total_points, max_total_points),
        grade: grade_for(raw_percentage(total_points, max_total_points)),
        summary_text: summary_sentence(&category_scores),
        narrative: None,
        category_scores,
    }
}

pub fn summary_sentence(category_scores: &[CategoryScore]) -> String {
    let strong: Vec<&CategoryScore> = category_scores.iter().filter(|s| is_strong(s)).collect();
    let weak: Vec<&CategoryScore> = category_scores.iter().filter(|s| is_weak(s)).collect();

    let outlook = match (strong.is_empty(), weak.is_empty()) {
        (true, true) => "You have a balanced visibility profile with room for optimization.".to_string(),
        (false, true) => "Your visibility performance is strong across all tracked layers.".to_string(),
        (true, false) => {
            "Foundational improvements are needed across multiple layers to establish visibility.".to_string()
        }
        (false, false) => {
            let names: Vec<&str> = strong.iter().take(2).map(|s| s.category_name).collect();
            let verb = if strong.len() == 1 { "is" } else { "are" };

            let weak_has = |category: Category| weak.iter().any(|s| s.category == category);
            let limiting = if weak_has(Category::Authority) && weak_has(Category::AutomationReadiness) {
                "authority and automation".to_string()
            } else {
                weak[0].category_name.to_lowercase()
            };

            format!(
                "{} {verb} strong, but {limiting} signals are limiting visibility.",
                names.join(", ")
            )
        }
    };

    format!("{BASE_SENTENCE} {outlook}")
}
