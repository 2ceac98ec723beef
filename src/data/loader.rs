use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::model::{RawRecord, Sex};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Outcome of loading the training table at start-up.
///
/// A missing or malformed file is a value, not a crash: the service still
/// starts and answers every plot request with "data unavailable".
#[derive(Debug)]
pub enum DataSource {
    Loaded(Vec<RawRecord>),
    Unavailable { reason: String },
}

impl DataSource {
    pub fn records(&self) -> Option<&[RawRecord]> {
        match self {
            DataSource::Loaded(records) => Some(records),
            DataSource::Unavailable { .. } => None,
        }
    }
}

/// Load passengers from `path`, folding any failure into
/// [`DataSource::Unavailable`].
pub fn load_source(path: &Path) -> DataSource {
    match load_file(path) {
        Ok(records) => {
            log::info!("Loaded {} passengers from {}", records.len(), path.display());
            DataSource::Loaded(records)
        }
        Err(e) => {
            log::warn!("Passenger data unavailable ({}): {e:#}", path.display());
            DataSource::Unavailable {
                reason: format!("{e:#}"),
            }
        }
    }
}

/// Load a passenger table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – Kaggle layout (`PassengerId,Survived,Pclass,Name,Sex,...`)
/// * `.json`    – `[{ "PassengerId": 1, "Pclass": 3, ... }, ...]`
/// * `.parquet` – same column names; numeric columns may be any int/float type
pub fn load_file(path: &Path) -> Result<Vec<RawRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Row schema shared by the CSV and JSON readers
// ---------------------------------------------------------------------------

/// One source row with Kaggle column names. Columns not listed here
/// (`Ticket`, `Cabin`, `Embarked`, ...) are ignored; empty cells become `None`.
#[derive(Debug, Deserialize)]
struct PassengerRow {
    #[serde(rename = "PassengerId", default)]
    passenger_id: Option<u32>,
    #[serde(rename = "Survived", default)]
    survived: Option<u8>,
    #[serde(rename = "Pclass")]
    pclass: u8,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Sex")]
    sex: String,
    #[serde(rename = "Age", default)]
    age: Option<f64>,
    #[serde(rename = "SibSp")]
    sib_sp: u32,
    #[serde(rename = "Parch")]
    parch: u32,
    #[serde(rename = "Fare", default)]
    fare: Option<f64>,
}

impl PassengerRow {
    fn into_record(self, row: usize) -> Result<RawRecord> {
        let sex: Sex = self
            .sex
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .with_context(|| format!("Row {row}: invalid Sex"))?;

        Ok(RawRecord {
            passenger_id: self.passenger_id,
            pclass: check_pclass(self.pclass, row)?,
            sex,
            age: self.age.filter(|a| a.is_finite()),
            fare: self.fare.filter(|f| f.is_finite()),
            sib_sp: self.sib_sp,
            parch: self.parch,
            name: self.name,
            survived: check_survived(self.survived, row)?,
        })
    }
}

fn check_pclass(pclass: u8, row: usize) -> Result<u8> {
    if !(1..=3).contains(&pclass) {
        bail!("Row {row}: Pclass must be 1, 2 or 3, got {pclass}");
    }
    Ok(pclass)
}

fn check_survived(survived: Option<u8>, row: usize) -> Result<Option<bool>> {
    match survived {
        None => Ok(None),
        Some(0) => Ok(Some(false)),
        Some(1) => Ok(Some(true)),
        Some(other) => bail!("Row {row}: Survived must be 0 or 1, got {other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize::<PassengerRow>().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(row.into_record(row_no)?);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')` layout.
fn load_json(path: &Path) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let rows: Vec<PassengerRow> = serde_json::from_str(&text).context("parsing JSON")?;

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| row.into_record(i))
        .collect()
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file written by Pandas or Polars with the Kaggle column
/// names. Integer columns stored as floats (Pandas does this once a column
/// holds a null) are accepted.
fn load_parquet(path: &Path) -> Result<Vec<RawRecord>> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        read_batch(&batch, records.len(), &mut records)?;
    }
    Ok(records)
}

fn read_batch(batch: &RecordBatch, offset: usize, out: &mut Vec<RawRecord>) -> Result<()> {
    let passenger_id = optional_f64_column(batch, "PassengerId")?;
    let survived = optional_f64_column(batch, "Survived")?;
    let pclass = f64_column(batch, "Pclass")?;
    let name = string_column(batch, "Name")?;
    let sex = string_column(batch, "Sex")?;
    let age = optional_f64_column(batch, "Age")?;
    let sib_sp = f64_column(batch, "SibSp")?;
    let parch = f64_column(batch, "Parch")?;
    let fare = optional_f64_column(batch, "Fare")?;

    for i in 0..batch.num_rows() {
        let row_no = offset + i;
        let required = |col: &[Option<f64>], label: &str| {
            col[i].with_context(|| format!("Row {row_no}: missing {label}"))
        };

        let optional = |col: &Option<Vec<Option<f64>>>| col.as_ref().and_then(|c| c[i]);

        let row = PassengerRow {
            passenger_id: optional(&passenger_id)
                .map(|v| whole(v, "PassengerId", row_no))
                .transpose()?,
            survived: optional(&survived)
                .map(|v| whole(v, "Survived", row_no))
                .transpose()?,
            pclass: whole(required(&pclass, "Pclass")?, "Pclass", row_no)?,
            name: name[i]
                .clone()
                .with_context(|| format!("Row {row_no}: missing Name"))?,
            sex: sex[i]
                .clone()
                .with_context(|| format!("Row {row_no}: missing Sex"))?,
            age: optional(&age),
            sib_sp: whole(required(&sib_sp, "SibSp")?, "SibSp", row_no)?,
            parch: whole(required(&parch, "Parch")?, "Parch", row_no)?,
            fare: optional(&fare),
        };
        out.push(row.into_record(row_no)?);
    }
    Ok(())
}

// -- Parquet / Arrow helpers --

/// Integer columns arrive as `f64`; accept only whole numbers that fit `T`.
fn whole<T: TryFrom<i64>>(value: f64, label: &str, row: usize) -> Result<T> {
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("Row {row}: {label} must be a whole number, got {value}");
    }
    T::try_from(value as i64)
        .map_err(|_| anyhow::anyhow!("Row {row}: {label} out of range, got {value}"))
}

fn column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    let idx = batch
        .schema()
        .index_of(name)
        .map_err(|_| anyhow::anyhow!("Parquet file missing '{name}' column"))?;
    Ok(batch.column(idx))
}

/// Read any numeric column as nullable `f64`.
fn f64_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<f64>>> {
    let col = column(batch, name)?;
    let floats = cast(col.as_ref(), &DataType::Float64)
        .with_context(|| format!("column '{name}' is not numeric"))?;
    Ok(floats.as_primitive::<Float64Type>().iter().collect())
}

fn optional_f64_column(batch: &RecordBatch, name: &str) -> Result<Option<Vec<Option<f64>>>> {
    if batch.schema().index_of(name).is_err() {
        return Ok(None);
    }
    f64_column(batch, name).map(Some)
}

fn string_column(batch: &RecordBatch, name: &str) -> Result<Vec<Option<String>>> {
    let col = column(batch, name)?;
    let strings =
        cast(col.as_ref(), &DataType::Utf8).with_context(|| format!("column '{name}' is not text"))?;
    let strings = strings.as_string::<i32>();
    Ok((0..strings.len())
        .map(|i| (!strings.is_null(i)).then(|| strings.value(i).to_string()))
        .collect())
}
