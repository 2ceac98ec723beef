/// Plot layer: named plots rendered on demand to PNG.
///
/// Architecture:
/// ```text
///   "/plot/{id}"
///        │
///        ▼
///   ┌──────────┐
///   │  render   │  id → PlotKind, data check, panic isolation
///   └──────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ render_kind   │  reduce EnrichedDataset → chart input
///   └──────────────┘        (importance: train forest)
///        │
///        ▼
///   ┌──────────┐
///   │  Figure   │  charts::* paint → PNG bytes
///   └──────────┘
/// ```
mod charts;
mod figure;
pub mod importance;

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;

use plotters::drawing::DrawingAreaErrorKind;
use serde::Serialize;
use thiserror::Error;

use crate::data::model::EnrichedDataset;
use crate::forest::ForestError;
use crate::stats::correlation_matrix;

pub use figure::{DPI, Figure};

/// Bins used by the age histogram.
const AGE_BINS: usize = 30;

// ---------------------------------------------------------------------------
// PlotKind – the closed set of plots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    Sex,
    Pclass,
    Age,
    AgeKde,
    #[serde(rename = "familysize")]
    FamilySize,
    Corr,
    FeatImp,
}

impl PlotKind {
    /// Every plot, in dashboard order.
    pub const ALL: [PlotKind; 7] = [
        PlotKind::Sex,
        PlotKind::Pclass,
        PlotKind::Age,
        PlotKind::AgeKde,
        PlotKind::FamilySize,
        PlotKind::Corr,
        PlotKind::FeatImp,
    ];

    /// Identifier used in URLs.
    pub fn id(self) -> &'static str {
        match self {
            PlotKind::Sex => "sex",
            PlotKind::Pclass => "pclass",
            PlotKind::Age => "age",
            PlotKind::AgeKde => "age_kde",
            PlotKind::FamilySize => "familysize",
            PlotKind::Corr => "corr",
            PlotKind::FeatImp => "feat_imp",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            PlotKind::Sex => "Survival by Sex",
            PlotKind::Pclass => "Survival by Passenger Class",
            PlotKind::Age => "Age Distribution",
            PlotKind::AgeKde => "Age Density by Survival",
            PlotKind::FamilySize => "Survival by Family Size",
            PlotKind::Corr => "Correlation Matrix",
            PlotKind::FeatImp => "Feature Importance (Random Forest)",
        }
    }

    /// Figure size in inches (width, height).
    pub fn size_inches(self) -> (f64, f64) {
        match self {
            PlotKind::Sex | PlotKind::Pclass | PlotKind::FamilySize => (6.0, 4.0),
            PlotKind::Age | PlotKind::AgeKde => (8.0, 4.0),
            PlotKind::Corr => (8.0, 6.0),
            PlotKind::FeatImp => (8.0, 5.0),
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown plot '{0}'")]
pub struct UnknownPlot(pub String);

impl FromStr for PlotKind {
    type Err = UnknownPlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PlotKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| UnknownPlot(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Results and errors
// ---------------------------------------------------------------------------

/// An encoded PNG with its pixel dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl PlotImage {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Outcome of a single plot request.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotResult {
    Success(PlotImage),
    NotFound,
    DataUnavailable,
    RenderError(String),
}

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("no {0} data to plot")]
    NoData(&'static str),
    #[error("{0}")]
    Degenerate(String),
    #[error("drawing failed: {0}")]
    Draw(String),
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("font setup failed: {0}")]
    Font(String),
    #[error("model training failed: {0}")]
    Model(#[from] ForestError),
}

impl<E> From<DrawingAreaErrorKind<E>> for PlotError
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Draw(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Render the plot named `plot_id`.
///
/// Unknown ids are `NotFound` whether or not data is loaded. With no data
/// every known id is `DataUnavailable`. Any failure while drawing, including
/// a panic inside a renderer, comes back as `RenderError`.
pub fn render(plot_id: &str, data: Option<&EnrichedDataset>) -> PlotResult {
    let kind = match plot_id.parse::<PlotKind>() {
        Ok(kind) => kind,
        Err(_) => return PlotResult::NotFound,
    };
    let Some(data) = data else {
        return PlotResult::DataUnavailable;
    };

    match catch_unwind(AssertUnwindSafe(|| render_kind(kind, data))) {
        Ok(Ok(image)) => PlotResult::Success(image),
        Ok(Err(e)) => PlotResult::RenderError(e.to_string()),
        Err(payload) => PlotResult::RenderError(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "renderer panicked".to_string()
    }
}

/// Draw `kind` from `data` into a fresh figure and encode it.
pub fn render_kind(kind: PlotKind, data: &EnrichedDataset) -> Result<PlotImage, PlotError> {
    let (w, h) = kind.size_inches();
    let mut figure = Figure::new(w, h);
    let title = kind.title();

    match kind {
        PlotKind::Sex => {
            let groups = charts::GroupedCounts::by(data, |r| r.raw.sex.as_str())?;
            figure.draw(|root| charts::grouped_counts(root, title, "Sex", &groups))?;
        }
        PlotKind::Pclass => {
            let groups = charts::GroupedCounts::by(data, |r| r.raw.pclass)?;
            figure.draw(|root| charts::grouped_counts(root, title, "Pclass", &groups))?;
        }
        PlotKind::FamilySize => {
            let groups = charts::GroupedCounts::by(data, |r| r.family_size)?;
            figure.draw(|root| charts::grouped_counts(root, title, "FamilySize", &groups))?;
        }
        PlotKind::Age => {
            let ages: Vec<f64> = data.records().iter().filter_map(|r| r.raw.age).collect();
            figure.draw(|root| charts::age_histogram(root, title, &ages, AGE_BINS))?;
        }
        PlotKind::AgeKde => {
            let mut by_outcome: [Vec<f64>; 2] = Default::default();
            for (r, survived) in data.labelled() {
                if let Some(age) = r.raw.age {
                    by_outcome[usize::from(survived)].push(age);
                }
            }
            let [died, lived] = &by_outcome;
            figure.draw(|root| charts::age_density(root, title, [died.as_slice(), lived.as_slice()]))?;
        }
        PlotKind::Corr => {
            let columns = data.numeric_columns();
            let names: Vec<String> = columns.iter().map(|c| c.name.to_string()).collect();
            let values: Vec<&[Option<f64>]> = columns.iter().map(|c| c.values.as_slice()).collect();
            let matrix = correlation_matrix(&values);
            figure.draw(|root| charts::correlation_grid(root, title, &names, &matrix))?;
        }
        PlotKind::FeatImp => {
            let importances = importance::feature_importances(data)?;
            figure.draw(|root| charts::importance_bars(root, title, &importances))?;
        }
    }

    figure.into_png()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::data::features::derive;
    use crate::data::model::fixtures::{passengers, raw};
    use crate::data::model::Sex;

    fn fixture() -> EnrichedDataset {
        derive(&passengers())
    }

    #[test]
    fn ids_round_trip() {
        for kind in PlotKind::ALL {
            assert_eq!(kind.id().parse::<PlotKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.id());
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.id());
        }
        assert!("Sex".parse::<PlotKind>().is_err());
    }

    #[test]
    fn unknown_id_is_not_found_with_or_without_data() {
        let data = fixture();
        assert_eq!(render("violin", Some(&data)), PlotResult::NotFound);
        assert_eq!(render("violin", None), PlotResult::NotFound);
        assert_eq!(render("", None), PlotResult::NotFound);
    }

    #[test]
    fn missing_data_is_unavailable_for_every_plot() {
        for kind in PlotKind::ALL {
            assert_eq!(render(kind.id(), None), PlotResult::DataUnavailable);
        }
    }

    #[test]
    fn every_plot_renders_at_its_size() {
        let data = fixture();
        for kind in PlotKind::ALL {
            match render(kind.id(), Some(&data)) {
                PlotResult::Success(png) => {
                    assert_eq!(&png.bytes()[..4], b"\x89PNG", "{kind}");
                    let (w, h) = kind.size_inches();
                    assert_eq!(png.width(), (w * DPI) as u32, "{kind}");
                    assert_eq!(png.height(), (h * DPI) as u32, "{kind}");
                }
                other => panic!("{kind}: {other:?}"),
            }
        }
    }

    #[test]
    fn single_class_importance_still_renders() {
        let mut rows = passengers();
        rows.iter_mut().for_each(|r| r.survived = Some(false));
        let result = render("feat_imp", Some(&derive(&rows)));
        assert!(matches!(result, PlotResult::Success(_)), "{result:?}");
    }

    #[test]
    fn unlabelled_data_is_a_render_error() {
        let data = derive(&[
            raw("Doe, Mr. John", Sex::Male, 0, 0),
            raw("Doe, Mrs. Jane", Sex::Female, 1, 0),
        ]);
        for id in ["sex", "feat_imp", "age_kde"] {
            assert!(matches!(render(id, Some(&data)), PlotResult::RenderError(_)), "{id}");
        }
    }

    #[test]
    fn correlation_diagonal_is_one() {
        let data = fixture();
        let columns = data.numeric_columns();
        let values: Vec<&[Option<f64>]> = columns.iter().map(|c| c.values.as_slice()).collect();
        let matrix = correlation_matrix(&values);
        for (i, row) in matrix.iter().enumerate() {
            assert!((row[i] - 1.0).abs() < 1e-9, "{}: {}", columns[i].name, row[i]);
        }
    }

    #[test]
    fn empty_dataset_fails_cleanly() {
        let data = EnrichedDataset::default();
        for kind in PlotKind::ALL {
            assert!(
                matches!(render(kind.id(), Some(&data)), PlotResult::RenderError(_)),
                "{kind}"
            );
        }
    }

    #[test]
    fn concurrent_renders_match_serial_output() {
        let data = Arc::new(fixture());
        let serial: Vec<PlotResult> = PlotKind::ALL
            .iter()
            .map(|kind| render(kind.id(), Some(&*data)))
            .collect();

        let handles: Vec<_> = PlotKind::ALL
            .iter()
            .chain(PlotKind::ALL.iter())
            .map(|&kind| {
                let data = Arc::clone(&data);
                thread::spawn(move || (kind, render(kind.id(), Some(&*data))))
            })
            .collect();

        for handle in handles {
            let (kind, result) = handle.join().unwrap();
            let index = PlotKind::ALL.iter().position(|k| *k == kind).unwrap();
            assert!(matches!(result, PlotResult::Success(_)), "{kind}");
            assert_eq!(result, serial[index], "{kind}");
        }
    }
}
