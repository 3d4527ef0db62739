//! Text (terminal) reporter with colors and formatting

use crate::models::{Category, Grade, Metric, MetricLevel};
use crate::pipeline::Evaluation;
use anyhow::Result;

/// Grade colors (ANSI escape codes)
fn grade_color(grade: Grade) -> &'static str {
    match grade {
        Grade::APlus | Grade::A => "\x1b[32m", // Green
        Grade::B => "\x1b[92m",                // Light green
        Grade::C => "\x1b[33m",                // Yellow
        Grade::D => "\x1b[91m",                // Light red
        Grade::F => "\x1b[31m",                // Red
    }
}

fn level_color(level: MetricLevel) -> &'static str {
    match level {
        MetricLevel::Excellent => "\x1b[32m",
        MetricLevel::Good => "\x1b[92m",
        MetricLevel::Fair => "\x1b[33m",
        MetricLevel::Poor => "\x1b[91m",
        MetricLevel::Critical => "\x1b[31m",
    }
}

/// Reset ANSI color
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Render evaluation as formatted terminal output
pub fn render(evaluation: &Evaluation) -> Result<String> {
    let health = &evaluation.health;
    let mut out = String::new();

    // Header
    let grade_c = grade_color(health.overall_grade);
    out.push_str(&format!(
        "\n{BOLD}Repository Health: {}{RESET}\n",
        evaluation.repository
    ));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Score: {BOLD}{:.1}/100{RESET}  Grade: {grade_c}{BOLD}{}{RESET}\n\n",
        health.overall_score, health.overall_grade
    ));

    // Category scores (compact)
    out.push_str(&format!("{BOLD}CATEGORIES{RESET}\n"));
    for category in health.categories.values() {
        out.push_str(&format_category_line(category));
    }
    out.push('\n');

    // Metric table per category
    for category in health.categories.values().filter(|c| !c.is_empty()) {
        out.push_str(&format!("{BOLD}{}{RESET}\n", category.name.to_uppercase()));
        for metric in &category.metrics {
            out.push_str(&format_metric_line(metric));
        }
        out.push('\n');
    }

    // Summary
    out.push_str(&format!("{BOLD}SUMMARY{RESET}\n  {}\n\n", health.summary.text));

    let cached = evaluation.cached_count();
    out.push_str(&format!(
        "{DIM}Evaluated {} · {}/{} resources served from cache{RESET}\n",
        evaluation.evaluated_at.format("%Y-%m-%d %H:%M UTC"),
        cached,
        evaluation.fetches.len()
    ));

    Ok(out)
}

fn format_category_line(category: &Category) -> String {
    if category.is_empty() {
        return format!("  {:<14} {DIM}no data{RESET}\n", category.name);
    }
    format!(
        "  {:<14} {}  {}{}{RESET}  {DIM}weight {:.0}%{RESET}\n",
        category.name,
        format_score(category.score),
        grade_color(category.grade),
        category.grade,
        category.weight * 100.0
    )
}

fn format_metric_line(metric: &Metric) -> String {
    // Truncate display value - use chars() to avoid UTF-8 panic
    let value: String = if metric.display_value.chars().count() > 18 {
        let head: String = metric.display_value.chars().take(15).collect();
        format!("{head}...")
    } else {
        metric.display_value.clone()
    };

    format!(
        "  {:<24} {:<18} {}  {}{}{RESET}\n",
        metric.id.label(),
        value,
        format_score(metric.score),
        level_color(metric.level),
        metric.level
    )
}

fn format_score(score: f64) -> String {
    let color = if score >= 80.0 {
        "\x1b[32m"
    } else if score >= 60.0 {
        "\x1b[33m"
    } else {
        "\x1b[31m"
    };
    format!("{color}{:>3.0}{RESET}", score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_evaluation;

    #[test]
    fn test_text_render_contains_sections() {
        let out = render(&test_evaluation()).expect("render text");
        assert!(out.contains("Repository Health: octo/widget"));
        assert!(out.contains("CATEGORIES"));
        assert!(out.contains("ACTIVITY"));
        assert!(out.contains("Commit frequency"));
        assert!(out.contains("10.1/week"));
        assert!(out.contains("SUMMARY"));
        assert!(out.contains("1/2 resources served from cache"));
    }

    #[test]
    fn test_empty_category_marked() {
        let out = render(&test_evaluation()).expect("render text");
        // Every category has at least one metric
        assert!(!out.contains("no data"));

        let mut evaluation = test_evaluation();
        evaluation
            .health
            .categories
            .values_mut()
            .for_each(|c| c.metrics.clear());
        let out = render(&evaluation).expect("render text");
        assert_eq!(out.matches("no data").count(), 5);
    }
}
