//! Tools for running many placement decisions in parallel.

use std::fs;
use std::fs::File;
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};
use threadpool::ThreadPool;

use crate::catalog::Catalog;
use crate::decision::Decision;
use crate::error::{PlacementError, Result};
use crate::optimizer::PlacementOptimizer;
use crate::request::PlacementRequest;

/// Runs independent decisions for a list of requests against one catalog snapshot.
///
/// Every request gets its own program, so workers share nothing but the read-only catalog and the solver.
///
/// With a solver timeout a timed out solve keeps its thread busy until the solver returns. All workers share
/// the selector's limit of live solver threads, so a batch with many slow requests reports `SolverError` for
/// the excess requests instead of piling up threads.
pub struct BatchPlanner {
    optimizer: PlacementOptimizer,
    catalog: Arc<Catalog>,
    report_dir: Option<String>,
}

impl BatchPlanner {
    /// Takes a snapshot of the catalog.
    pub fn new(optimizer: PlacementOptimizer, catalog: &Catalog) -> Self {
        Self {
            optimizer,
            catalog: Arc::new(catalog.clone()),
            report_dir: None,
        }
    }

    /// Enables writing of `decisions.json` report into the specified directory.
    pub fn with_report_dir(mut self, dir: &str) -> Self {
        self.report_dir = Some(dir.to_string());
        self
    }

    /// Runs the decisions using the specified number of threads.
    /// Results are returned in the order of requests.
    pub fn run(&self, requests: Vec<PlacementRequest>, num_threads: usize) -> Result<Vec<Result<Decision>>> {
        let count = requests.len();
        let results = Arc::new(Mutex::new(Vec::with_capacity(count)));
        let pool = ThreadPool::new(num_threads.max(1));

        for (id, request) in requests.iter().cloned().enumerate() {
            let optimizer = self.optimizer.clone();
            let catalog = self.catalog.clone();
            let results = results.clone();
            pool.execute(move || {
                let result = optimizer.decide(&catalog, &request);
                results.lock().unwrap_or_else(|e| e.into_inner()).push((id, result));
            });
        }
        pool.join();

        let mut slots: Vec<Option<Result<Decision>>> = (0..count).map(|_| None).collect();
        for (id, result) in results.lock().unwrap_or_else(|e| e.into_inner()).drain(..) {
            slots[id] = Some(result);
        }
        let results: Vec<Result<Decision>> = slots
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(PlacementError::SolverError("decision worker panicked".to_string()))))
            .collect();
        info!(
            "batch finished: {} of {} requests placed",
            results.iter().filter(|r| matches!(r, Ok(d) if d.is_placed())).count(),
            count
        );

        if let Some(dir) = &self.report_dir {
            write_report(dir, &requests, &results)?;
        }
        Ok(results)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(untagged)]
enum ReportValue {
    Id(usize),
    Request(PlacementRequest),
    Decision(Decision),
    Error(String),
}

fn write_report(dir: &str, requests: &[PlacementRequest], results: &[Result<Decision>]) -> Result<()> {
    let entries: Vec<IndexMap<String, ReportValue>> = requests
        .iter()
        .zip(results)
        .enumerate()
        .map(|(id, (request, result))| {
            let mut entry = IndexMap::new();
            entry.insert("id".to_string(), ReportValue::Id(id));
            entry.insert("request".to_string(), ReportValue::Request(request.clone()));
            match result {
                Ok(decision) => entry.insert("decision".to_string(), ReportValue::Decision(decision.clone())),
                Err(e) => entry.insert("error".to_string(), ReportValue::Error(e.to_string())),
            };
            entry
        })
        .collect();

    fs::create_dir_all(dir).map_err(|e| PlacementError::Report(format!("can't create {}: {}", dir, e)))?;
    let path = format!("{}/decisions.json", dir);
    let mut file = File::create(&path).map_err(|e| PlacementError::Report(format!("can't create {}: {}", path, e)))?;
    serde_json::to_writer_pretty(&mut file, &entries)
        .map_err(|e| PlacementError::Report(format!("can't write {}: {}", path, e)))?;
    info!("decisions saved to {}", path);
    Ok(())
}
