//! Diagnostic charts
//!
//! Two SVG charts are written per run:
//! - a step chart of actual laying weeks (training and test) against the
//!   model's test-set predictions;
//! - a node-and-edge diagram of the fitted decision tree.
//!
//! Layout math (step points, node placement, fill colours) is kept in plain
//! functions so it can be tested without rendering.

use chrono::{Duration, NaiveDate};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};

use crate::classifier::{DecisionTree, NodeKind, TreeNode};
use crate::model::{LabelSeries, PipelineError, io_error};

pub const PREDICTIONS_FILE: &str = "laying_predictions.svg";
pub const TREE_FILE: &str = "decision_tree.svg";

const TRAIN_COLOR: RGBColor = RGBColor(31, 119, 180);
const TEST_COLOR: RGBColor = RGBColor(128, 128, 128);
const PREDICTED_COLOR: RGBColor = RGBColor(214, 39, 40);

/// Leaf fill colours for class 0 and class 1.
const CLASS_COLORS: [(u8, u8, u8); 2] = [(229, 129, 57), (57, 157, 229)];

fn render_err<E: std::fmt::Debug>(err: E) -> PipelineError {
    PipelineError::Render(format!("{:?}", err))
}

// ============================================================================
// Prediction Step Chart
// ============================================================================

/// Points of a step line whose level changes halfway between consecutive
/// samples. X is days since `origin`.
pub fn step_points(index: &[NaiveDate], values: &[u8], origin: NaiveDate) -> Vec<(f64, f64)> {
    let xs: Vec<f64> = index.iter().map(|d| (*d - origin).num_days() as f64).collect();
    let mut points = Vec::with_capacity(values.len() * 3);
    for (i, (&x, &v)) in xs.iter().zip(values).enumerate() {
        if i > 0 {
            let mid = (xs[i - 1] + x) / 2.0;
            points.push((mid, values[i - 1] as f64));
            points.push((mid, v as f64));
        }
        points.push((x, v as f64));
    }
    points
}

/// Step chart of training actuals, test actuals and test predictions.
pub fn plot_predictions(
    path: &Path,
    y_train: &LabelSeries,
    y_test: &LabelSeries,
    y_pred: &[u8],
) -> Result<(), PipelineError> {
    if y_pred.len() != y_test.len() {
        return Err(PipelineError::Value(format!(
            "{} predictions for {} test weeks",
            y_pred.len(),
            y_test.len()
        )));
    }
    let dates: Vec<NaiveDate> = y_train.index.iter().chain(&y_test.index).copied().collect();
    let (Some(&first), Some(&last)) = (dates.iter().min(), dates.iter().max()) else {
        return Err(PipelineError::Render("no weeks to plot".into()));
    };
    let span = ((last - first).num_days() as f64).max(7.0);

    let root = SVGBackend::new(path, (1600, 640)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Octopus Egg-Laying Prediction vs. Actual Events",
            ("sans-serif", 28).into_font(),
        )
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(-3.5f64..span + 3.5, -0.1f64..1.15f64)
        .map_err(render_err)?;

    let date_label = |x: &f64| {
        (first + Duration::days(x.round() as i64))
            .format("%Y-%m")
            .to_string()
    };
    chart
        .configure_mesh()
        .x_desc("Date")
        .y_desc("Egg Laying Event (1=Yes, 0=No)")
        .x_label_formatter(&date_label)
        .y_labels(3)
        .draw()
        .map_err(render_err)?;

    let series = [
        ("Training Data (Actual)", step_points(&y_train.index, &y_train.values, first), TRAIN_COLOR),
        ("Test Data (Actual)", step_points(&y_test.index, &y_test.values, first), TEST_COLOR),
        ("Test Data (Predicted)", step_points(&y_test.index, y_pred, first), PREDICTED_COLOR),
    ];
    for (label, points, color) in series {
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(render_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .map_err(render_err)?;

    root.present().map_err(render_err)
}

// ============================================================================
// Decision Tree Diagram
// ============================================================================

/// Horizontal position of a node, in leaf slots, and its depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodePlacement {
    pub slot: f64,
    pub level: usize,
}

/// Place leaves left to right in traversal order and centre every split
/// node over its two children. Indexed like `tree.nodes()`.
pub fn layout_tree(tree: &DecisionTree) -> Vec<NodePlacement> {
    fn place(nodes: &[TreeNode], idx: usize, next_slot: &mut f64, out: &mut [NodePlacement]) -> f64 {
        let node = &nodes[idx];
        let slot = match node.kind {
            NodeKind::Leaf => {
                let s = *next_slot;
                *next_slot += 1.0;
                s
            }
            NodeKind::Split { left, right, .. } => {
                let l = place(nodes, left, next_slot, out);
                let r = place(nodes, right, next_slot, out);
                (l + r) / 2.0
            }
        };
        out[idx] = NodePlacement { slot, level: node.depth };
        slot
    }

    let nodes = tree.nodes();
    let mut out = vec![NodePlacement { slot: 0.0, level: 0 }; nodes.len()];
    let mut next_slot = 0.0;
    place(nodes, 0, &mut next_slot, &mut out);
    out
}

/// Text shown inside a node box.
pub fn node_label(tree: &DecisionTree, idx: usize, class_names: &[&str; 2]) -> Vec<String> {
    let node = &tree.nodes()[idx];
    let mut lines = Vec::with_capacity(5);
    if let NodeKind::Split { feature, threshold, .. } = node.kind {
        lines.push(format!("{} <= {:.3}", tree.feature_names()[feature], threshold));
    }
    lines.push(format!("gini = {:.3}", node.impurity));
    lines.push(format!("samples = {}", node.samples));
    lines.push(format!("value = [{:.1}, {:.1}]", node.value[0], node.value[1]));
    lines.push(format!("class = {}", class_names[node.predicted_class() as usize]));
    lines
}

/// Majority-class colour, faded toward white as the node gets less pure.
pub fn node_fill(node: &TreeNode) -> (u8, u8, u8) {
    let total = node.value[0] + node.value[1];
    if total <= 0.0 {
        return (255, 255, 255);
    }
    let p = [node.value[0] / total, node.value[1] / total];
    let (hi, lo) = if p[0] >= p[1] { (p[0], p[1]) } else { (p[1], p[0]) };
    let alpha = if lo >= 1.0 { 0.0 } else { (hi - lo) / (1.0 - lo) };

    let (r, g, b) = CLASS_COLORS[node.predicted_class() as usize];
    let fade = |c: u8| (255.0 - alpha * (255.0 - c as f64)).round() as u8;
    (fade(r), fade(g), fade(b))
}

/// Node-and-edge diagram of the fitted tree.
pub fn plot_decision_tree(path: &Path, tree: &DecisionTree, class_names: &[&str; 2]) -> Result<(), PipelineError> {
    const BOX_W: i32 = 220;
    const BOX_H: i32 = 104;
    const SLOT_W: i32 = 240;
    const LEVEL_H: i32 = 160;
    const MARGIN: i32 = 30;
    const TITLE_H: i32 = 60;
    const LINE_H: i32 = 18;

    let placements = layout_tree(tree);
    let leaves = tree.n_leaves().max(1) as i32;
    let width = (leaves * SLOT_W + 2 * MARGIN) as u32;
    let height = ((tree.depth() as i32 + 1) * LEVEL_H + TITLE_H + MARGIN) as u32;

    let center = |p: &NodePlacement| {
        let x = MARGIN + (p.slot * SLOT_W as f64) as i32 + SLOT_W / 2;
        let y = TITLE_H + p.level as i32 * LEVEL_H;
        (x, y)
    };

    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let title_style = TextStyle::from(("sans-serif", 22).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    root.draw(&Text::new(
        "Decision Tree for Octopus Egg-Laying Prediction",
        (width as i32 / 2, 15),
        title_style,
    ))
    .map_err(render_err)?;

    // Edges first so boxes paint over them.
    for (idx, node) in tree.nodes().iter().enumerate() {
        if let NodeKind::Split { left, right, .. } = node.kind {
            let (px, py) = center(&placements[idx]);
            for child in [left, right] {
                let (cx, cy) = center(&placements[child]);
                root.draw(&PathElement::new(
                    vec![(px, py + BOX_H), (cx, cy)],
                    BLACK.stroke_width(1),
                ))
                .map_err(render_err)?;
            }
        }
    }

    let text_style = TextStyle::from(("sans-serif", 14).into_font()).pos(Pos::new(HPos::Center, VPos::Top));
    for (idx, node) in tree.nodes().iter().enumerate() {
        let (x, y) = center(&placements[idx]);
        let (r, g, b) = node_fill(node);
        let corners = [(x - BOX_W / 2, y), (x + BOX_W / 2, y + BOX_H)];
        root.draw(&Rectangle::new(corners, RGBColor(r, g, b).filled()))
            .map_err(render_err)?;
        root.draw(&Rectangle::new(corners, BLACK.stroke_width(1)))
            .map_err(render_err)?;

        for (i, line) in node_label(tree, idx, class_names).into_iter().enumerate() {
            root.draw(&Text::new(line, (x, y + 6 + i as i32 * LINE_H), text_style.clone()))
                .map_err(render_err)?;
        }
    }

    root.present().map_err(render_err)
}

// ============================================================================
// Output Directory
// ============================================================================

/// Render both charts into `dir`, creating it if needed. Returns the paths
/// written, predictions chart first.
pub fn render_charts(
    dir: &Path,
    y_train: &LabelSeries,
    y_test: &LabelSeries,
    y_pred: &[u8],
    tree: &DecisionTree,
    class_names: &[&str; 2],
) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(dir).map_err(|e| io_error(dir, e))?;

    let predictions = dir.join(PREDICTIONS_FILE);
    plot_predictions(&predictions, y_train, y_test, y_pred)?;

    let diagram = dir.join(TREE_FILE);
    plot_decision_tree(&diagram, tree, class_names)?;

    Ok(vec![predictions, diagram])
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::DecisionTreeConfig;
    use crate::model::{CLASS_NAMES, FeatureMatrix};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn weekly(first: NaiveDate, values: Vec<u8>) -> LabelSeries {
        LabelSeries {
            index: (0..values.len()).map(|i| first + Duration::weeks(i as i64)).collect(),
            values,
        }
    }

    fn fitted_tree() -> DecisionTree {
        let temps = [14.0, 15.0, 19.0, 20.0, 16.0, 21.0, 13.0, 22.0];
        let first = ymd(2012, 1, 1);
        let x = FeatureMatrix {
            feature_names: vec!["Temp_Lag_2w".into()],
            index: (0..temps.len()).map(|i| first + Duration::weeks(i as i64)).collect(),
            rows: temps.iter().map(|&t| vec![t]).collect(),
        };
        let y = weekly(first, temps.iter().map(|&t| (t > 18.0) as u8).collect());
        DecisionTree::fit(&DecisionTreeConfig::default(), &x, &y).unwrap()
    }

    #[test]
    fn test_step_points_change_level_halfway() {
        let first = ymd(2012, 1, 1);
        let points = step_points(&[first, first + Duration::days(7)], &[0, 1], first);
        assert_eq!(points, vec![(0.0, 0.0), (3.5, 0.0), (3.5, 1.0), (7.0, 1.0)]);
    }

    #[test]
    fn test_step_points_empty_series() {
        assert!(step_points(&[], &[], ymd(2012, 1, 1)).is_empty());
    }

    #[test]
    fn test_layout_centres_parent_over_children() {
        let tree = fitted_tree();
        let layout = layout_tree(&tree);
        assert_eq!(layout.len(), tree.nodes().len());
        if let NodeKind::Split { left, right, .. } = tree.root().kind {
            assert_eq!(layout[0].slot, (layout[left].slot + layout[right].slot) / 2.0);
            assert_eq!(layout[left].level, 1);
            assert!(layout[left].slot < layout[right].slot);
        } else {
            panic!("root should split");
        }
    }

    #[test]
    fn test_node_label_lists_rule_and_stats() {
        let tree = fitted_tree();
        let lines = node_label(&tree, 0, &CLASS_NAMES);
        assert_eq!(lines[0], "Temp_Lag_2w <= 17.500");
        assert_eq!(lines[1], "gini = 0.500");
        assert_eq!(lines[2], "samples = 8");
        assert!(lines[4].starts_with("class = "));
    }

    #[test]
    fn test_node_fill_fades_with_impurity() {
        let tree = fitted_tree();
        // Balanced root is white, pure leaves take the full class colour.
        assert_eq!(node_fill(tree.root()), (255, 255, 255));
        for node in tree.nodes().iter().filter(|n| n.is_leaf()) {
            let expected = CLASS_COLORS[node.predicted_class() as usize];
            assert_eq!(node_fill(node), expected);
        }
    }

    #[test]
    fn test_mismatched_predictions_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let train = weekly(ymd(2012, 1, 1), vec![0, 1]);
        let test = weekly(ymd(2012, 1, 15), vec![0, 1, 0]);
        let result = plot_predictions(&dir.path().join("p.svg"), &train, &test, &[0]);
        assert!(matches!(result, Err(PipelineError::Value(_))));
    }

    #[test]
    fn test_render_charts_writes_both_svgs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("plots");
        let train = weekly(ymd(2012, 1, 1), vec![0, 1, 1, 0]);
        let test = weekly(ymd(2012, 1, 29), vec![0, 1, 0]);
        let paths = render_charts(&out, &train, &test, &[0, 1, 1], &fitted_tree(), &CLASS_NAMES).unwrap();

        assert_eq!(paths, vec![out.join(PREDICTIONS_FILE), out.join(TREE_FILE)]);
        for path in &paths {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"), "{} is not an SVG", path.display());
        }
        let diagram = std::fs::read_to_string(&paths[1]).unwrap();
        assert!(diagram.contains("Temp_Lag_2w"));
    }
}
