use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Command-line and environment configuration for the dashboard service.
#[derive(Parser, Debug, Clone)]
#[command(name = "titanic-dash")]
#[command(about = "Titanic exploratory data analysis dashboard")]
pub struct Config {
    /// Labelled passenger table (.csv, .json, .parquet)
    #[arg(long, env = "TITANIC_TRAIN", default_value = "train.csv")]
    pub train: PathBuf,

    /// Unlabelled passenger table offered for download
    #[arg(long, env = "TITANIC_TEST", default_value = "test.csv")]
    pub test: PathBuf,

    /// Listen address
    #[arg(long, env = "TITANIC_LISTEN", default_value = "127.0.0.1:5000")]
    pub listen: SocketAddr,
}
