use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sex – the only categorical column the plots group by
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Numeric encoding used as a classifier feature (male = 0, female = 1).
    pub fn code(self) -> f64 {
        match self {
            Sex::Male => 0.0,
            Sex::Female => 1.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            other => Err(format!("unknown sex '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// RawRecord – one row of the source table
// ---------------------------------------------------------------------------

/// A single passenger as loaded from the source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub passenger_id: Option<u32>,
    /// Ticket class, 1–3.
    pub pclass: u8,
    pub sex: Sex,
    pub age: Option<f64>,
    pub fare: Option<f64>,
    /// Siblings / spouses aboard.
    pub sib_sp: u32,
    /// Parents / children aboard.
    pub parch: u32,
    pub name: String,
    /// `None` for unlabeled (test) rows.
    pub survived: Option<bool>,
}

impl AsRef<RawRecord> for RawRecord {
    fn as_ref(&self) -> &RawRecord {
        self
    }
}

// ---------------------------------------------------------------------------
// EnrichedRecord – raw row plus derived features
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRecord {
    pub raw: RawRecord,
    /// `sib_sp + parch + 1`, never below 1.
    pub family_size: u32,
    /// 1 when travelling alone, 0 otherwise.
    pub is_alone: u8,
    /// Canonical honorific; `None` when the name has no `Title.` token.
    pub title: Option<String>,
}

impl AsRef<RawRecord> for EnrichedRecord {
    fn as_ref(&self) -> &RawRecord {
        &self.raw
    }
}

// ---------------------------------------------------------------------------
// EnrichedDataset – the complete derived table
// ---------------------------------------------------------------------------

/// A named numeric column with missing values kept as `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericColumn {
    pub name: &'static str,
    pub values: Vec<Option<f64>>,
}

/// The full derived table. Built once by [`crate::data::features::derive`]
/// and only read afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnrichedDataset {
    records: Vec<EnrichedRecord>,
}

impl EnrichedDataset {
    pub fn new(records: Vec<EnrichedRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that carry a survival outcome, paired with it.
    pub fn labelled(&self) -> impl Iterator<Item = (&EnrichedRecord, bool)> + '_ {
        self.records
            .iter()
            .filter_map(|r| r.raw.survived.map(|s| (r, s)))
    }

    /// Numeric columns in source order, the way a dataframe would expose
    /// them. Columns without a single value are left out.
    pub fn numeric_columns(&self) -> Vec<NumericColumn> {
        let columns = vec![
            self.column("PassengerId", |r| r.raw.passenger_id.map(f64::from)),
            self.column("Survived", |r| r.raw.survived.map(|s| if s { 1.0 } else { 0.0 })),
            self.column("Pclass", |r| Some(f64::from(r.raw.pclass))),
            self.column("Age", |r| r.raw.age),
            self.column("SibSp", |r| Some(f64::from(r.raw.sib_sp))),
            self.column("Parch", |r| Some(f64::from(r.raw.parch))),
            self.column("Fare", |r| r.raw.fare),
            self.column("FamilySize", |r| Some(f64::from(r.family_size))),
            self.column("IsAlone", |r| Some(f64::from(r.is_alone))),
        ];

        columns
            .into_iter()
            .filter(|c| c.values.iter().any(Option::is_some))
            .collect()
    }

    fn column<F>(&self, name: &'static str, value: F) -> NumericColumn
    where
        F: Fn(&EnrichedRecord) -> Option<f64>,
    {
        NumericColumn {
            name,
            values: self.records.iter().map(value).collect(),
        }
    }

    /// Number of passengers per canonical title (missing titles excluded).
    pub fn title_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for title in self.records.iter().filter_map(|r| r.title.as_deref()) {
            *counts.entry(title).or_insert(0) += 1;
        }
        counts
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::features::derive;

    #[test]
    fn sex_parses_case_insensitively() {
        assert_eq!("male".parse::<Sex>(), Ok(Sex::Male));
        assert_eq!(" Female ".parse::<Sex>(), Ok(Sex::Female));
        assert!("unknown".parse::<Sex>().is_err());
        assert_eq!(Sex::Female.code(), 1.0);
    }

    #[test]
    fn numeric_columns_follow_source_order() {
        let ds = derive(&fixtures::passengers());
        let names: Vec<_> = ds.numeric_columns().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            [
                "PassengerId", "Survived", "Pclass", "Age", "SibSp", "Parch", "Fare",
                "FamilySize", "IsAlone"
            ]
        );
    }

    #[test]
    fn numeric_columns_skip_empty_columns() {
        let raw = vec![fixtures::raw("Kelly, Mr. James", Sex::Male, 0, 0)];
        let ds = derive(&raw);
        let names: Vec<_> = ds.numeric_columns().iter().map(|c| c.name).collect();
        assert_eq!(names, ["Pclass", "SibSp", "Parch", "FamilySize", "IsAlone"]);
    }

    #[test]
    fn labelled_skips_unlabelled_rows() {
        let mut raw = fixtures::passengers();
        raw[0].survived = None;
        let ds = derive(&raw);
        assert_eq!(ds.labelled().count(), raw.len() - 1);
    }

    #[test]
    fn title_counts_group_canonical_titles() {
        let ds = derive(&fixtures::passengers());
        let counts = ds.title_counts();
        assert_eq!(counts.get("Mr"), Some(&7));
        assert_eq!(counts.get("Rare"), Some(&3));
        assert_eq!(counts.get("Miss"), Some(&5));
    }
}
