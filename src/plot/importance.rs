//! Feature matrix for the importance plot and the forest trained on it.

use super::PlotError;
use crate::data::model::{EnrichedDataset, EnrichedRecord};
use crate::forest::{ForestConfig, RandomForest};
use crate::stats::median;

/// Model inputs, in column order.
pub const FEATURES: [&str; 8] = [
    "Pclass",
    "Sex",
    "Age",
    "Fare",
    "SibSp",
    "Parch",
    "FamilySize",
    "IsAlone",
];

/// Medians over every record, labelled or not, used to fill missing values.
fn fill_values(data: &EnrichedDataset) -> (f64, f64) {
    let present = |f: fn(&EnrichedRecord) -> Option<f64>| -> Vec<f64> {
        data.records().iter().filter_map(f).collect()
    };
    let age = median(&present(|r| r.raw.age)).unwrap_or(0.0);
    let fare = median(&present(|r| r.raw.fare)).unwrap_or(0.0);
    (age, fare)
}

/// Build the labelled feature matrix: one row per passenger with a known
/// outcome, plus the `0 = died / 1 = survived` labels.
pub fn training_set(data: &EnrichedDataset) -> Result<(Vec<Vec<f64>>, Vec<usize>), PlotError> {
    let (age_fill, fare_fill) = fill_values(data);
    let (samples, labels): (Vec<Vec<f64>>, Vec<usize>) = data
        .labelled()
        .map(|(r, survived)| {
            let row = vec![
                f64::from(r.raw.pclass),
                r.raw.sex.code(),
                r.raw.age.unwrap_or(age_fill),
                r.raw.fare.unwrap_or(fare_fill),
                f64::from(r.raw.sib_sp),
                f64::from(r.raw.parch),
                f64::from(r.family_size),
                f64::from(r.is_alone),
            ];
            (row, usize::from(survived))
        })
        .unzip();

    if samples.is_empty() {
        return Err(PlotError::NoData("labelled passenger"));
    }
    Ok((samples, labels))
}

/// Train a fresh forest and pair each feature name with its importance.
pub fn feature_importances(data: &EnrichedDataset) -> Result<Vec<(&'static str, f64)>, PlotError> {
    let (samples, labels) = training_set(data)?;
    let forest = RandomForest::fit(&samples, &labels, &ForestConfig::default())?;
    log::debug!(
        "trained forest on {} passengers, training accuracy {:.3}",
        samples.len(),
        training_accuracy(&forest, &samples, &labels)
    );
    Ok(FEATURES.into_iter().zip(forest.feature_importances()).collect())
}

/// Share of training rows the fitted forest classifies correctly.
fn training_accuracy(forest: &RandomForest, samples: &[Vec<f64>], labels: &[usize]) -> f64 {
    let correct = samples
        .iter()
        .zip(labels)
        .filter(|(row, label)| forest.predict(row) == **label)
        .count();
    correct as f64 / samples.len().max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::features::derive;
    use crate::data::model::fixtures::{passengers, raw};
    use crate::data::model::Sex;

    #[test]
    fn missing_values_take_the_median() {
        let data = derive(&passengers());
        let (samples, labels) = training_set(&data).unwrap();
        assert_eq!(samples.len(), 24);
        assert_eq!(labels.len(), 24);
        assert!(samples.iter().all(|row| row.len() == FEATURES.len()));
        assert!(samples.iter().flatten().all(|v| v.is_finite()));

        // "Moran, Mr. James" has no age.
        let known: Vec<f64> = data.records().iter().filter_map(|r| r.raw.age).collect();
        assert_eq!(samples[5][2], median(&known).unwrap());
    }

    #[test]
    fn importances_cover_every_feature() {
        let data = derive(&passengers());
        let imp = feature_importances(&data).unwrap();
        let names: Vec<&str> = imp.iter().map(|(n, _)| *n).collect();
        assert_eq!(names, FEATURES);
        let total: f64 = imp.iter().map(|(_, v)| v).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(imp.iter().all(|(_, v)| *v >= 0.0));
    }

    #[test]
    fn forest_fits_its_training_rows() {
        let data = derive(&passengers());
        let (samples, labels) = training_set(&data).unwrap();
        let forest = RandomForest::fit(&samples, &labels, &ForestConfig::default()).unwrap();
        assert!(training_accuracy(&forest, &samples, &labels) > 0.8);
    }

    #[test]
    fn single_outcome_gives_zero_importances() {
        let mut rows = passengers();
        rows.iter_mut().for_each(|r| r.survived = Some(true));
        let imp = feature_importances(&derive(&rows)).unwrap();
        assert!(imp.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn unlabelled_rows_are_rejected() {
        let data = derive(&[raw("Doe, Mr. John", Sex::Male, 0, 0)]);
        assert!(matches!(feature_importances(&data), Err(PlotError::NoData(_))));
    }
}
