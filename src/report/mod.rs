/// Evaluation output for the fitted model.
///
/// - `metrics`: per-class precision/recall/F1 and balanced accuracy.
/// - `plots`  : SVG step chart of predictions and the tree diagram.

pub mod metrics;
pub mod plots;

use metrics::ClassificationReport;

/// Balanced accuracy as the percentage line printed after the report.
pub fn format_balanced_accuracy(score: f64) -> String {
    format!("Balanced Accuracy Score on Test Set: {:.2}%", score * 100.0)
}

/// Print the test-set evaluation block to stdout.
pub fn print_evaluation(report: &ClassificationReport, balanced_accuracy: f64) {
    println!("\n--- Test Set Evaluation ---");
    println!("{}", report);
    println!("{}", format_balanced_accuracy(balanced_accuracy));
}
