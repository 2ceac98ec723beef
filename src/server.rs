//! HTTP surface: dashboard page, plot images, plot catalogue and raw file
//! downloads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, info, warn};
use serde::Serialize;

use crate::data::model::EnrichedDataset;
use crate::plot::{self, PlotKind, PlotResult};

/// Immutable state shared by every request.
#[derive(Debug, Clone)]
pub struct DashboardContext {
    pub dataset: Option<Arc<EnrichedDataset>>,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

impl DashboardContext {
    pub fn new(dataset: Option<EnrichedDataset>, train_path: PathBuf, test_path: PathBuf) -> Self {
        Self {
            dataset: dataset.map(Arc::new),
            train_path,
            test_path,
        }
    }
}

pub fn router(ctx: Arc<DashboardContext>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/plot/:name", get(plot_image))
        .route("/api/plots", get(plot_catalogue))
        .route("/download/:which", get(download))
        .with_state(ctx)
}

// ---------------------------------------------------------------------------
// Plots
// ---------------------------------------------------------------------------

async fn plot_image(State(ctx): State<Arc<DashboardContext>>, UrlPath(name): UrlPath<String>) -> Response {
    let dataset = ctx.dataset.clone();
    let id = name.clone();
    let result = tokio::task::spawn_blocking(move || plot::render(&id, dataset.as_deref()))
        .await
        .unwrap_or_else(|e| PlotResult::RenderError(e.to_string()));

    match &result {
        PlotResult::Success(png) => debug!("plot '{name}': {} bytes", png.len()),
        PlotResult::NotFound => debug!("plot '{name}': not found"),
        PlotResult::DataUnavailable => warn!("plot '{name}': no data loaded"),
        PlotResult::RenderError(msg) => warn!("plot '{name}' failed: {msg}"),
    }
    plot_response(result, &ctx.train_path)
}

/// Map a dispatcher outcome onto an HTTP response.
pub fn plot_response(result: PlotResult, train_path: &Path) -> Response {
    match result {
        PlotResult::Success(png) => (
            [(header::CONTENT_TYPE, "image/png")],
            png.into_bytes(),
        )
            .into_response(),
        PlotResult::NotFound => (StatusCode::NOT_FOUND, "Plot not found").into_response(),
        PlotResult::DataUnavailable => (
            StatusCode::NOT_FOUND,
            format!(
                "Data not available: place the training data at {}",
                train_path.display()
            ),
        )
            .into_response(),
        PlotResult::RenderError(msg) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {msg}")).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
struct PlotEntry {
    id: PlotKind,
    title: &'static str,
}

async fn plot_catalogue() -> Json<Vec<PlotEntry>> {
    Json(
        PlotKind::ALL
            .into_iter()
            .map(|kind| PlotEntry {
                id: kind,
                title: kind.title(),
            })
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Index page
// ---------------------------------------------------------------------------

async fn index(State(ctx): State<Arc<DashboardContext>>) -> Html<String> {
    Html(index_page(ctx.dataset.as_deref()))
}

fn index_page(dataset: Option<&EnrichedDataset>) -> String {
    let status = match dataset {
        Some(data) => {
            let titles: Vec<String> = data
                .title_counts()
                .into_iter()
                .map(|(title, n)| format!("{title} {n}"))
                .collect();
            format!("{} passengers loaded ({})", data.len(), titles.join(", "))
        }
        None => "No training data loaded".to_string(),
    };
    let cards: String = PlotKind::ALL
        .into_iter()
        .map(|kind| {
            format!(
                r#"    <div class="card"><h2>{title}</h2><img src="/plot/{id}" alt="{title}"></div>
"#,
                title = kind.title(),
                id = kind.id(),
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Titanic EDA Dashboard</title>
  <style>
    body {{ font-family: sans-serif; margin: 2rem; background: #f6f7f9; }}
    .grid {{ display: flex; flex-wrap: wrap; gap: 1rem; }}
    .card {{ background: #fff; border-radius: 6px; padding: 1rem; box-shadow: 0 1px 3px #0002; }}
    .card img {{ max-width: 100%; }}
  </style>
</head>
<body>
  <h1>Titanic EDA Dashboard</h1>
  <p>{status} &middot; <a href="/download/train">train.csv</a> &middot; <a href="/download/test">test.csv</a></p>
  <div class="grid">
{cards}  </div>
</body>
</html>
"#
    )
}

// ---------------------------------------------------------------------------
// Downloads
// ---------------------------------------------------------------------------

async fn download(State(ctx): State<Arc<DashboardContext>>, UrlPath(which): UrlPath<String>) -> Response {
    let path = match which.as_str() {
        "train" => &ctx.train_path,
        "test" => &ctx.test_path,
        _ => return (StatusCode::NOT_FOUND, "Not found").into_response(),
    };

    match tokio::fs::read(path).await {
        Ok(bytes) => {
            info!("serving {} ({} bytes)", path.display(), bytes.len());
            let filename = path
                .file_name()
                .map_or_else(|| format!("{which}.csv"), |n| n.to_string_lossy().into_owned());
            (
                [
                    (header::CONTENT_TYPE, "text/csv".to_string()),
                    (
                        header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => {
            warn!("download {}: {e}", path.display());
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
    }
}
