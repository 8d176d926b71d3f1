use crate::generator::scan::{GeneratorConfig, ScanGenerator};
use crate::gui_bridge::model::VisualizationModel;
use crate::workflow::runner::{CycleReport, Runner};
use anyhow::Context;
use serde_json::json;
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{Arc, RwLock},
    thread,
};
use stormcore::radar_interface::Grid;
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9000))
}

type SharedModel = Arc<RwLock<VisualizationModel>>;

#[derive(Debug)]
struct CycleFailed(String);

impl warp::reject::Reject for CycleFailed {}

/// Bridge that hosts the cell HTTP endpoint and runs cycles for incoming scans.
#[derive(Clone)]
pub struct GuiBridge {
    state: SharedModel,
    runner: Arc<Runner>,
}

impl GuiBridge {
    pub fn new(runner: Arc<Runner>) -> Self {
        Self {
            state: Arc::new(RwLock::new(VisualizationModel::default())),
            runner,
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone + Send + Sync + 'static
    {
        let state = self.state.clone();
        let state_filter = warp::any().map(move || state.clone());
        let runner = self.runner.clone();
        let runner_filter = warp::any().map(move || runner.clone());

        let cells_route = warp::path("cells")
            .and(warp::path::end())
            .and(warp::get())
            .and(state_filter.clone())
            .map(|state: SharedModel| {
                let model = state.read().map(|guard| guard.clone()).unwrap_or_default();
                warp::reply::json(&model)
            });

        let ingest_route = warp::path("ingest")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter.clone())
            .and(runner_filter.clone())
            .and_then(
                |grid: Grid, state: SharedModel, runner: Arc<Runner>| async move {
                    let outcome = tokio::task::spawn_blocking(move || runner.ingest(&grid)).await;
                    let report = match outcome {
                        Ok(report) => report,
                        Err(err) => Err(err.into()),
                    };
                    settle("ingest", report, &state, None)
                },
            );

        let generator_route = warp::path("ingest-config")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(state_filter)
            .and(runner_filter)
            .and_then(
                |config: GeneratorConfig, state: SharedModel, runner: Arc<Runner>| async move {
                    let description = config.description.clone();
                    if let Some(name) = config.scenario.as_ref() {
                        log::info!("[GUI] running scenario {}", name);
                    }
                    let outcome = tokio::task::spawn_blocking(move || {
                        config.validate().context("validating generator config")?;
                        let mut generator = ScanGenerator::new(config);
                        let scan = generator.next_scan()?;
                        runner.run_cycle(&scan)
                    })
                    .await;
                    let report = match outcome {
                        Ok(report) => report,
                        Err(err) => Err(err.into()),
                    };
                    settle("ingest-config", report, &state, description)
                },
            );

        cells_route
            .or(ingest_route)
            .or(generator_route)
            .recover(handle_rejection)
    }

    /// Serves the routes on their own thread until the process exits.
    pub fn serve(&self, address: SocketAddr) -> thread::JoinHandle<()> {
        let routes = self.routes();
        thread::spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    log::error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            log::info!("[GUI] serving cells on http://{}", address);
            runtime.block_on(async move {
                warp::serve(routes).run(address).await;
            });
        })
    }

    /// Replaces the served model unless it comes from an older scan.
    pub fn publish(&self, model: VisualizationModel) -> bool {
        accept(&self.state, model)
    }

    pub fn publish_status(&self, message: &str) {
        log::info!("[GUI] {}", message);
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> VisualizationModel {
        self.state.read().unwrap().clone()
    }
}

fn accept(state: &SharedModel, model: VisualizationModel) -> bool {
    let Ok(mut guard) = state.write() else {
        log::error!("[GUI] model lock poisoned, dropping update");
        return false;
    };
    if !model.supersedes(&guard) {
        return false;
    }
    log::info!(
        "[GUI] cells: {}, reachable intercepts: {}",
        model.cells.len(),
        model
            .intercepts
            .iter()
            .filter(|intercept| intercept.plan.is_some())
            .count()
    );
    *guard = model;
    true
}

fn settle(
    route: &str,
    report: anyhow::Result<CycleReport>,
    state: &SharedModel,
    description: Option<String>,
) -> Result<warp::reply::WithStatus<warp::reply::Json>, warp::Rejection> {
    match report {
        Ok(report) => {
            let accepted = accept(state, VisualizationModel::from_report(&report));
            Ok(warp::reply::with_status(
                warp::reply::json(&json!({
                    "status": "ok",
                    "station_id": report.station_id,
                    "cells": report.cells.len(),
                    "reachable": report.reachable(),
                    "accepted": accepted,
                    "description": description.unwrap_or_default()
                })),
                StatusCode::OK,
            ))
        }
        Err(err) => {
            log::warn!("{} error: {:#}", route, err);
            Err(warp::reject::custom(CycleFailed(format!("{:#}", err))))
        }
    }
}

async fn handle_rejection(rejection: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, message) = if let Some(CycleFailed(message)) = rejection.find::<CycleFailed>() {
        (StatusCode::UNPROCESSABLE_ENTITY, message.clone())
    } else if let Some(err) = rejection.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if rejection.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, format!("{:?}", rejection))
    };
    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "status": "error", "message": message })),
        status,
    ))
}
