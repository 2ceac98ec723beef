use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64;
use serde::Serialize;

/// Write a reproducible synthetic passenger table in the Kaggle layout.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Number of passengers
    #[arg(long, default_value_t = 891)]
    rows: usize,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Output directory
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

const SURNAMES: [&str; 16] = [
    "Andersson", "Brown", "Carter", "Davies", "Eriksson", "Fortune", "Goldsmith", "Harris",
    "Ivanov", "Johnson", "Kelly", "Lindqvist", "Murphy", "Nilsson", "O'Brien", "Palsson",
];
const MALE_NAMES: [&str; 8] = ["John", "William", "Charles", "George", "James", "Thomas", "Karl", "Henry"];
const FEMALE_NAMES: [&str; 8] = ["Mary", "Anna", "Elizabeth", "Margaret", "Helen", "Alice", "Emma", "Ellen"];

#[derive(Debug, Serialize)]
struct Passenger {
    #[serde(rename = "PassengerId")]
    passenger_id: i64,
    #[serde(rename = "Survived")]
    survived: i64,
    #[serde(rename = "Pclass")]
    pclass: i64,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Sex")]
    sex: &'static str,
    #[serde(rename = "Age")]
    age: Option<f64>,
    #[serde(rename = "SibSp")]
    sib_sp: i64,
    #[serde(rename = "Parch")]
    parch: i64,
    #[serde(rename = "Fare")]
    fare: f64,
}

fn pick<'a>(rng: &mut Pcg64, options: &[&'a str]) -> &'a str {
    options[rng.random_range(0..options.len())]
}

fn passenger(rng: &mut Pcg64, id: i64) -> Result<Passenger> {
    let pclass = match rng.random::<f64>() {
        p if p < 0.24 => 1,
        p if p < 0.45 => 2,
        _ => 3,
    };
    let female = rng.random_bool(0.35);
    // Older passengers travel in the better classes.
    let age_dist = Normal::new(31.0 - 3.0 * pclass as f64, 13.0).context("age distribution")?;
    let age = age_dist.sample(rng).clamp(0.5, 80.0).round();
    let sib_sp = if rng.random_bool(0.3) { rng.random_range(1..=4) } else { 0 };
    let parch = if age < 16.0 || rng.random_bool(0.2) { rng.random_range(0..=2) } else { 0 };

    let title = match (female, age < 14.0, sib_sp > 0) {
        (false, true, _) => "Master",
        (false, false, _) if rng.random_bool(0.03) => pick(rng, &["Dr", "Rev", "Col", "Major"]),
        (false, false, _) => "Mr",
        (true, false, true) => "Mrs",
        (true, _, _) if rng.random_bool(0.02) => pick(rng, &["Mlle", "Ms", "Mme", "Countess"]),
        (true, _, _) => "Miss",
    };
    let given = pick(rng, if female { &FEMALE_NAMES } else { &MALE_NAMES });
    let name = format!("{}, {title}. {given}", pick(rng, &SURNAMES));

    let base_fare = match pclass {
        1 => 84.0,
        2 => 21.0,
        _ => 13.0,
    };
    let fare = (base_fare * (0.4 + rng.random::<f64>() * 1.2) * (1.0 + 0.3 * sib_sp as f64) * 100.0).round() / 100.0;

    let mut odds = if female { 0.74 } else { 0.19 };
    odds += (2 - pclass) as f64 * 0.15;
    if age < 10.0 {
        odds += 0.2;
    }
    let survived = rng.random_bool(odds.clamp(0.02, 0.98));

    // About a fifth of ages are unrecorded.
    let age = (!rng.random_bool(0.2)).then_some(age);

    Ok(Passenger {
        passenger_id: id,
        survived: i64::from(survived),
        pclass,
        name,
        sex: if female { "female" } else { "male" },
        age,
        sib_sp,
        parch,
        fare,
    })
}

fn to_batch(passengers: &[Passenger]) -> Result<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("PassengerId", DataType::Int64, false),
        Field::new("Survived", DataType::Int64, false),
        Field::new("Pclass", DataType::Int64, false),
        Field::new("Name", DataType::Utf8, false),
        Field::new("Sex", DataType::Utf8, false),
        Field::new("Age", DataType::Float64, true),
        Field::new("SibSp", DataType::Int64, false),
        Field::new("Parch", DataType::Int64, false),
        Field::new("Fare", DataType::Float64, false),
    ]));

    let int = |f: fn(&Passenger) -> i64| -> ArrayRef {
        Arc::new(Int64Array::from_iter_values(passengers.iter().map(f)))
    };
    let columns: Vec<ArrayRef> = vec![
        int(|p| p.passenger_id),
        int(|p| p.survived),
        int(|p| p.pclass),
        Arc::new(StringArray::from_iter_values(passengers.iter().map(|p| p.name.as_str()))),
        Arc::new(StringArray::from_iter_values(passengers.iter().map(|p| p.sex))),
        Arc::new(passengers.iter().map(|p| p.age).collect::<Float64Array>()),
        int(|p| p.sib_sp),
        int(|p| p.parch),
        Arc::new(Float64Array::from_iter_values(passengers.iter().map(|p| p.fare))),
    ];

    RecordBatch::try_new(schema, columns).context("building record batch")
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = Pcg64::seed_from_u64(args.seed);
    let passengers = (1..=args.rows as i64)
        .map(|id| passenger(&mut rng, id))
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    // CSV
    let csv_path = args.out_dir.join("sample_passengers.csv");
    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("creating {}", csv_path.display()))?;
    for p in &passengers {
        writer.serialize(p)?;
    }
    writer.flush()?;

    // Parquet
    let batch = to_batch(&passengers)?;
    let parquet_path = args.out_dir.join("sample_passengers.parquet");
    let file = File::create(&parquet_path)
        .with_context(|| format!("creating {}", parquet_path.display()))?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;

    println!("{}", pretty_format_batches(&[batch.slice(0, batch.num_rows().min(5))])?);
    println!(
        "Wrote {} passengers to {} and {}",
        passengers.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
