//! Test-set evaluation metrics.
//!
//! Per-class precision/recall/F1 from the binary confusion matrix, plus
//! balanced accuracy. Divisions by zero yield 0.

use std::fmt;

use crate::model::{CLASS_NAMES, PipelineError};

/// Precision, recall and F1 for one class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class metrics for labels 0 and 1 with the summary rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: [ClassMetrics; 2],
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn total_support(&self) -> usize {
        self.classes[0].support + self.classes[1].support
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Counts `[[tn, fp], [fn, tp]]`: `matrix[actual][predicted]`.
fn confusion_matrix(y_true: &[u8], y_pred: &[u8]) -> Result<[[usize; 2]; 2], PipelineError> {
    if y_true.len() != y_pred.len() {
        return Err(PipelineError::Value(format!(
            "{} true labels but {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(PipelineError::Value("cannot score an empty test set".into()));
    }
    let mut matrix = [[0usize; 2]; 2];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        if t > 1 || p > 1 {
            return Err(PipelineError::Value(format!("labels must be 0 or 1, got ({}, {})", t, p)));
        }
        matrix[t as usize][p as usize] += 1;
    }
    Ok(matrix)
}

pub fn classification_report(y_true: &[u8], y_pred: &[u8]) -> Result<ClassificationReport, PipelineError> {
    let m = confusion_matrix(y_true, y_pred)?;

    let class = |c: usize| {
        let other = 1 - c;
        let tp = m[c][c];
        let predicted = tp + m[other][c];
        let actual = tp + m[c][other];
        let precision = ratio(tp, predicted);
        let recall = ratio(tp, actual);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics { precision, recall, f1, support: actual }
    };
    let classes = [class(0), class(1)];
    let total = y_true.len();

    let macro_avg = ClassMetrics {
        precision: (classes[0].precision + classes[1].precision) / 2.0,
        recall: (classes[0].recall + classes[1].recall) / 2.0,
        f1: (classes[0].f1 + classes[1].f1) / 2.0,
        support: total,
    };
    let weighted = |f: fn(&ClassMetrics) -> f64| {
        classes.iter().map(|c| f(c) * c.support as f64).sum::<f64>() / total as f64
    };
    let weighted_avg = ClassMetrics {
        precision: weighted(|c| c.precision),
        recall: weighted(|c| c.recall),
        f1: weighted(|c| c.f1),
        support: total,
    };

    Ok(ClassificationReport {
        classes,
        accuracy: ratio(m[0][0] + m[1][1], total),
        macro_avg,
        weighted_avg,
    })
}

/// Mean of the recall of class 0 and class 1. A class with no true samples
/// contributes a recall of 0, so the score always lies in [0, 1].
pub fn balanced_accuracy(y_true: &[u8], y_pred: &[u8]) -> Result<f64, PipelineError> {
    let m = confusion_matrix(y_true, y_pred)?;
    let recall0 = ratio(m[0][0], m[0][0] + m[0][1]);
    let recall1 = ratio(m[1][1], m[1][0] + m[1][1]);
    Ok((recall0 + recall1) / 2.0)
}

fn write_row(f: &mut fmt::Formatter<'_>, width: usize, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, m.precision, m.recall, m.f1, m.support,
        width = width
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = CLASS_NAMES
            .iter()
            .map(|n| n.len())
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(12);

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support",
            width = width
        )?;
        writeln!(f)?;
        for (name, metrics) in CLASS_NAMES.iter().zip(&self.classes) {
            write_row(f, width, name, metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_support(),
            width = width
        )?;
        write_row(f, width, "macro avg", &self.macro_avg)?;
        write_row(f, width, "weighted avg", &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_perfect_predictions() {
        let y = [0, 0, 1, 1, 0];
        let report = classification_report(&y, &y).unwrap();
        assert!(close(report.accuracy, 1.0));
        for c in &report.classes {
            assert!(close(c.precision, 1.0) && close(c.recall, 1.0) && close(c.f1, 1.0));
        }
        assert_eq!(report.classes[0].support, 3);
        assert_eq!(report.classes[1].support, 2);
        assert!(close(balanced_accuracy(&y, &y).unwrap(), 1.0));
    }

    #[test]
    fn test_known_confusion_matrix() {
        // tn=3 fp=1 fn=1 tp=2
        let y_true = [0, 0, 0, 0, 1, 1, 1];
        let y_pred = [0, 0, 0, 1, 0, 1, 1];
        let report = classification_report(&y_true, &y_pred).unwrap();

        assert!(close(report.classes[0].precision, 0.75));
        assert!(close(report.classes[0].recall, 0.75));
        assert!(close(report.classes[1].precision, 2.0 / 3.0));
        assert!(close(report.classes[1].recall, 2.0 / 3.0));
        assert!(close(report.accuracy, 5.0 / 7.0));
        assert!(close(report.macro_avg.recall, (0.75 + 2.0 / 3.0) / 2.0));
        assert!(close(report.weighted_avg.recall, (0.75 * 4.0 + 2.0 / 3.0 * 3.0) / 7.0));

        let bal = balanced_accuracy(&y_true, &y_pred).unwrap();
        assert!(close(bal, (0.75 + 2.0 / 3.0) / 2.0));
    }

    #[test]
    fn test_single_class_truth_with_majority_prediction_scores_half() {
        let y_true = [0u8; 12];
        let y_pred = [0u8; 12];
        assert!(close(balanced_accuracy(&y_true, &y_pred).unwrap(), 0.5));

        let report = classification_report(&y_true, &y_pred).unwrap();
        assert_eq!(report.classes[1].support, 0);
        assert!(close(report.classes[1].precision, 0.0));
        assert!(close(report.classes[1].f1, 0.0));
    }

    #[test]
    fn test_balanced_accuracy_stays_in_unit_interval() {
        let cases: [(&[u8], &[u8]); 4] = [
            (&[0, 1, 0, 1], &[1, 0, 1, 0]),
            (&[1, 1, 1], &[0, 0, 0]),
            (&[0, 0, 1], &[1, 1, 1]),
            (&[0, 1, 1, 1, 0], &[0, 1, 0, 1, 1]),
        ];
        for (t, p) in cases {
            let score = balanced_accuracy(t, p).unwrap();
            assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
        }
        assert!(close(balanced_accuracy(&[0, 1, 0, 1], &[1, 0, 1, 0]).unwrap(), 0.0));
    }

    #[test]
    fn test_invalid_inputs_are_value_errors() {
        assert!(matches!(balanced_accuracy(&[], &[]), Err(PipelineError::Value(_))));
        assert!(matches!(balanced_accuracy(&[0, 1], &[0]), Err(PipelineError::Value(_))));
        assert!(matches!(classification_report(&[0, 3], &[0, 1]), Err(PipelineError::Value(_))));
    }

    #[test]
    fn test_report_table_layout() {
        let report = classification_report(&[0, 0, 0, 1], &[0, 0, 1, 1]).unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].trim_start().starts_with("precision"));
        assert!(lines[2].trim_start().starts_with("No Laying"));
        assert!(lines[3].trim_start().starts_with("Laying"));
        assert!(lines[5].contains("accuracy") && lines[5].contains("0.75"));
        assert!(lines[7].trim_start().starts_with("weighted avg"));
        assert!(lines[2].ends_with("3"));
    }
}
