//! The individual chart painters. Each takes a drawing area owned by the
//! caller's [`Figure`](super::figure::Figure) and the data already reduced
//! to what it draws.

use std::collections::BTreeMap;

use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::PlotError;
use super::figure::{ANNOTATION_PX, Area, CAPTION_PX, LABEL_PX, MARGIN_PX, font};
use crate::color::{coolwarm, generate_palette, outcome_colors, text_color_for};
use crate::data::model::{EnrichedDataset, EnrichedRecord};
use crate::stats::{Histogram, Kde};

const OUTCOME_LABELS: [&str; 2] = ["Did not survive", "Survived"];

/// Label for a categorical axis laid out at integer positions.
fn category_label(labels: &[String], x: f64) -> String {
    let i = x.round();
    if (x - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn draw_legend<'a>(chart: &mut Chart<'a, 'a>) -> Result<(), PlotError> {
    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85).filled())
        .border_style(BLACK.stroke_width(1))
        .label_font(font(LABEL_PX))
        .draw()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Grouped counts (sex, pclass, familysize)
// ---------------------------------------------------------------------------

/// Passenger counts per category, split `[did not survive, survived]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedCounts {
    pub categories: Vec<String>,
    pub counts: Vec<[usize; 2]>,
}

impl GroupedCounts {
    /// Group labelled records by `key`; categories come out in key order.
    pub fn by<K, F>(data: &EnrichedDataset, key: F) -> Result<Self, PlotError>
    where
        K: Ord + ToString,
        F: Fn(&EnrichedRecord) -> K,
    {
        let mut groups: BTreeMap<K, [usize; 2]> = BTreeMap::new();
        for (record, survived) in data.labelled() {
            groups.entry(key(record)).or_default()[usize::from(survived)] += 1;
        }
        if groups.is_empty() {
            return Err(PlotError::NoData("labelled passenger"));
        }
        let (categories, counts): (Vec<String>, Vec<[usize; 2]>) =
            groups.into_iter().map(|(k, c)| (k.to_string(), c)).unzip();
        Ok(Self { categories, counts })
    }

    fn max(&self) -> usize {
        self.counts.iter().flat_map(|c| c.iter().copied()).max().unwrap_or(0)
    }
}

pub fn grouped_counts(root: &Area<'_>, title: &str, x_desc: &str, groups: &GroupedCounts) -> Result<(), PlotError> {
    let n = groups.categories.len();
    let y_max = (groups.max() as f64 * 1.12).max(1.0);

    let mut chart = ChartBuilder::on(root)
        .caption(title, font(CAPTION_PX))
        .margin(MARGIN_PX)
        .x_label_area_size(64)
        .y_label_area_size(80)
        .build_cartesian_2d(-0.5..n as f64 - 0.5, 0.0..y_max)?;

    let x_label = |x: &f64| category_label(&groups.categories, *x);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&x_label)
        .y_label_formatter(&|y: &f64| format!("{y:.0}"))
        .x_desc(x_desc)
        .y_desc("count")
        .label_style(font(LABEL_PX))
        .axis_desc_style(font(LABEL_PX))
        .draw()?;

    const BAR: f64 = 0.4;
    for (outcome, color) in outcome_colors().into_iter().enumerate() {
        let offset = if outcome == 0 { -BAR } else { 0.0 };
        chart
            .draw_series(groups.counts.iter().enumerate().map(|(i, c)| {
                let x0 = i as f64 + offset;
                Rectangle::new([(x0, 0.0), (x0 + BAR, c[outcome] as f64)], color.filled())
            }))?
            .label(OUTCOME_LABELS[outcome])
            .legend(move |(x, y)| Rectangle::new([(x, y - 7), (x + 16, y + 7)], color.filled()));
    }

    draw_legend(&mut chart)
}

// ---------------------------------------------------------------------------
// Age histogram with density overlay
// ---------------------------------------------------------------------------

pub fn age_histogram(root: &Area<'_>, title: &str, ages: &[f64], bins: usize) -> Result<(), PlotError> {
    let hist = Histogram::build(ages, bins).ok_or(PlotError::NoData("Age"))?;

    // Density scaled to counts so it shares the histogram's y axis.
    let scale = ages.len() as f64 * hist.bin_width;
    let curve: Vec<(f64, f64)> = Kde::fit(ages)
        .map(|kde| {
            kde.grid(hist.start, hist.end(), 256)
                .into_iter()
                .map(|(x, d)| (x, d * scale))
                .collect()
        })
        .unwrap_or_default();

    let curve_max = curve.iter().map(|p| p.1).fold(0.0, f64::max);
    let y_max = (hist.max_count() as f64).max(curve_max).max(1.0) * 1.1;
    let [fill, _] = outcome_colors();

    let mut chart = ChartBuilder::on(root)
        .caption(title, font(CAPTION_PX))
        .margin(MARGIN_PX)
        .x_label_area_size(64)
        .y_label_area_size(80)
        .build_cartesian_2d(hist.start..hist.end(), 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Age")
        .y_desc("count")
        .y_label_formatter(&|y: &f64| format!("{y:.0}"))
        .label_style(font(LABEL_PX))
        .axis_desc_style(font(LABEL_PX))
        .draw()?;

    chart.draw_series(
        hist.bins()
            .map(|(left, right, count)| Rectangle::new([(left, 0.0), (right, count as f64)], fill.mix(0.55).filled())),
    )?;
    chart.draw_series(
        hist.bins()
            .map(|(left, right, count)| Rectangle::new([(left, 0.0), (right, count as f64)], fill.stroke_width(1))),
    )?;
    if !curve.is_empty() {
        chart.draw_series(LineSeries::new(curve, fill.stroke_width(3)))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Age density per outcome
// ---------------------------------------------------------------------------

/// Filled density curves for each outcome group. Groups too small to
/// estimate a density are left out; with none left the plot fails.
pub fn age_density(root: &Area<'_>, title: &str, ages_by_outcome: [&[f64]; 2]) -> Result<(), PlotError> {
    let colors = outcome_colors();
    let fitted: Vec<(usize, Kde)> = ages_by_outcome
        .iter()
        .enumerate()
        .filter_map(|(outcome, ages)| Kde::fit(ages).map(|kde| (outcome, kde)))
        .collect();
    if fitted.is_empty() {
        return Err(PlotError::Degenerate(
            "not enough distinct ages in either outcome group to estimate a density".into(),
        ));
    }

    let (lo, hi) = fitted
        .iter()
        .map(|(_, kde)| kde.support(3.0))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (a, b)| (lo.min(a), hi.max(b)));
    let curves: Vec<(usize, Vec<(f64, f64)>)> = fitted
        .iter()
        .map(|(outcome, kde)| (*outcome, kde.grid(lo, hi, 256)))
        .collect();
    let y_max = curves
        .iter()
        .flat_map(|(_, c)| c.iter().map(|p| p.1))
        .fold(0.0, f64::max)
        * 1.1;

    let mut chart = ChartBuilder::on(root)
        .caption(title, font(CAPTION_PX))
        .margin(MARGIN_PX)
        .x_label_area_size(64)
        .y_label_area_size(100)
        .build_cartesian_2d(lo..hi, 0.0..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_desc("Age")
        .y_desc("density")
        .y_label_formatter(&|y: &f64| format!("{y:.3}"))
        .label_style(font(LABEL_PX))
        .axis_desc_style(font(LABEL_PX))
        .draw()?;

    for (outcome, points) in curves {
        let color = colors[outcome];
        chart
            .draw_series(
                AreaSeries::new(points, 0.0, color.mix(0.3).filled()).border_style(color.stroke_width(2)),
            )?
            .label(OUTCOME_LABELS[outcome])
            .legend(move |(x, y)| Rectangle::new([(x, y - 7), (x + 16, y + 7)], color.filled()));
    }

    draw_legend(&mut chart)
}

// ---------------------------------------------------------------------------
// Correlation heat grid
// ---------------------------------------------------------------------------

/// Annotated heat grid; row `i` of `matrix` is drawn top-down.
pub fn correlation_grid(root: &Area<'_>, title: &str, names: &[String], matrix: &[Vec<f64>]) -> Result<(), PlotError> {
    let n = names.len();
    if n == 0 {
        return Err(PlotError::NoData("numeric column"));
    }
    let top = n as f64 - 0.5;

    let mut chart = ChartBuilder::on(root)
        .caption(title, font(CAPTION_PX))
        .margin(MARGIN_PX)
        .x_label_area_size(56)
        .y_label_area_size(150)
        .build_cartesian_2d(-0.5..top, -0.5..top)?;

    let x_label = |x: &f64| category_label(names, *x);
    let y_label = |y: &f64| category_label(names, n as f64 - 1.0 - y);
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .x_label_style(font(ANNOTATION_PX - 2))
        .y_label_style(font(ANNOTATION_PX))
        .draw()?;

    let cells = matrix.iter().enumerate().flat_map(|(i, row)| {
        row.iter().enumerate().map(move |(j, &v)| (i, j, v))
    });
    let y_of = |i: usize| (n - 1 - i) as f64;

    chart.draw_series(cells.clone().map(|(i, j, v)| {
        let (x, y) = (j as f64, y_of(i));
        Rectangle::new([(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)], coolwarm(v).filled())
    }))?;

    chart.draw_series(cells.map(|(i, j, v)| {
        let text = if v.is_nan() { "nan".to_string() } else { format!("{v:.2}") };
        let style = font(ANNOTATION_PX)
            .color(text_color_for(coolwarm(v)))
            .pos(Pos::new(HPos::Center, VPos::Center));
        Text::new(text, (j as f64, y_of(i)), style)
    }))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Horizontal importance bars
// ---------------------------------------------------------------------------

/// One bar per feature, first feature at the top.
pub fn importance_bars(root: &Area<'_>, title: &str, importances: &[(&str, f64)]) -> Result<(), PlotError> {
    let n = importances.len();
    if n == 0 {
        return Err(PlotError::NoData("feature"));
    }
    let max = importances.iter().map(|(_, v)| *v).fold(0.0, f64::max);
    let x_max = if max > 0.0 { max * 1.1 } else { 1.0 };
    let labels: Vec<String> = importances.iter().rev().map(|(name, _)| name.to_string()).collect();
    let colors = generate_palette(n);

    let mut chart = ChartBuilder::on(root)
        .caption(title, font(CAPTION_PX))
        .margin(MARGIN_PX)
        .x_label_area_size(64)
        .y_label_area_size(150)
        .build_cartesian_2d(0.0..x_max, -0.5..n as f64 - 0.5)?;

    let y_label = |y: &f64| category_label(&labels, *y);
    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&y_label)
        .x_label_formatter(&|x: &f64| format!("{x:.2}"))
        .x_desc("importance")
        .label_style(font(LABEL_PX))
        .axis_desc_style(font(LABEL_PX))
        .draw()?;

    const HALF: f64 = 0.4;
    chart.draw_series(importances.iter().zip(colors).enumerate().map(|(i, ((_, value), color))| {
        let y = (n - 1 - i) as f64;
        Rectangle::new([(0.0, y - HALF), (*value, y + HALF)], color.filled())
    }))?;
    Ok(())
}
