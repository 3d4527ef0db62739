//! JSON reporter
//!
//! Outputs the full evaluation as pretty-printed JSON.
//! Useful for machine consumption, piping to jq, or further processing.

use crate::pipeline::Evaluation;
use anyhow::Result;

/// Render evaluation as JSON
pub fn render(evaluation: &Evaluation) -> Result<String> {
    Ok(serde_json::to_string_pretty(evaluation)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporters::tests::test_evaluation;

    #[test]
    fn test_json_render_valid() {
        let evaluation = test_evaluation();
        let json_str = render(&evaluation).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");

        assert_eq!(parsed["repository"], "octo/widget");
        assert_eq!(parsed["health"]["overall_grade"], evaluation.health.overall_grade.as_str());
        assert_eq!(parsed["fetches"][0]["from_cache"], true);

        let activity = &parsed["health"]["categories"]["activity"];
        assert_eq!(activity["metrics"][0]["id"], "commit_frequency");
        assert_eq!(activity["metrics"][0]["raw_value"]["kind"], "number");
        assert_eq!(activity["metrics"][0]["level"], "Excellent");
    }

    #[test]
    fn test_json_has_flat_metrics_array() {
        let evaluation = test_evaluation();
        let json_str = render(&evaluation).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");

        let metrics = parsed["metrics"].as_array().expect("metrics array");
        assert_eq!(metrics.len(), 5);
        assert_eq!(metrics[0]["id"], "commit_frequency");
        assert_eq!(metrics[4]["id"], "best_practices_badge");
    }

    #[test]
    fn test_json_unknown_values() {
        let json_str = render(&test_evaluation()).expect("render JSON");
        let parsed: serde_json::Value = serde_json::from_str(&json_str).expect("parse JSON");
        let badge = &parsed["health"]["categories"]["governance"]["metrics"][0];
        assert_eq!(badge["id"], "best_practices_badge");
        assert_eq!(badge["raw_value"]["kind"], "unknown");
        assert_eq!(badge["score"], 50.0);
    }
}
