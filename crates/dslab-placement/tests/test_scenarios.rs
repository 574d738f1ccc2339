use rstest::rstest;

use dslab_placement::batch::BatchPlanner;
use dslab_placement::catalog::Catalog;
use dslab_placement::config::PlacementConfig;
use dslab_placement::decision::Decision;
use dslab_placement::error::PlacementError;
use dslab_placement::objective::ObjectiveWeights;
use dslab_placement::optimizer::PlacementOptimizer;
use dslab_placement::request::{FeatureRequirement, PlacementRequest, SelectionCountPolicy};
use dslab_placement::solver::SolveStatus;

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn load(file_name: &str) -> (PlacementConfig, Catalog, Vec<PlacementRequest>) {
    let config = PlacementConfig::from_file(&name_wrapper(file_name)).unwrap();
    let catalog = config.build_catalog().unwrap();
    let requests = config.build_requests().unwrap();
    (config, catalog, requests)
}

#[test]
// Only H1 and H2 satisfy vcpu >= 100 and ram >= 33, so AtLeast(2) leaves a single feasible answer.
fn test_sample_fleet_selects_h1_and_h2() {
    let (config, catalog, requests) = load("sample_fleet.yaml");
    let optimizer = PlacementOptimizer::from_config(&config).unwrap();

    let report = optimizer.decide_with_report(&catalog, &requests[0]).unwrap();
    assert_eq!(
        report.decision,
        Decision::Placed {
            selected: vec!["H1".to_string(), "H2".to_string()],
            objective: 129. + 43.,
        }
    );
    assert_eq!(report.values.len(), 5);
    assert!((report.values["H1"].unwrap() - 1.).abs() < 1e-6);
    assert!(report.values["H4"].unwrap().abs() < 1e-6);
    assert_eq!(catalog.get("H2").unwrap().location.as_deref(), Some("Montreal"));
    assert_eq!(catalog.get("H5").unwrap().location, None);
}

#[rstest]
#[case(2.0, 0.0)]
#[case(3.0, 0.0)]
#[case(2.0, 2000.0)]
#[case(3.0, 2000.0)]
// Every hypervisor supports the feature while the request forbids it.
fn test_feature_mismatch_is_infeasible(#[case] beta: f64, #[case] bonus: f64) {
    let (mut config, catalog, requests) = load("feature_fleet.yaml");
    config.weights = ObjectiveWeights::new(1.0, beta).with_bonus(bonus);
    let optimizer = PlacementOptimizer::from_config(&config).unwrap();

    let decision = optimizer.decide(&catalog, &requests[0]).unwrap();
    assert!(decision.is_infeasible());
    assert!(decision.selected().is_empty());
    assert_eq!(decision.into_result(), Err(PlacementError::NoFeasibleCandidate));
}

#[test]
// With the bonus every selection is profitable, AtMost(1) becomes binding and the tightest host wins.
fn test_feature_request_with_bonus_selects_one_host() {
    let (config, catalog, requests) = load("feature_fleet.yaml");
    let optimizer = PlacementOptimizer::from_config(&config).unwrap();

    let decision = optimizer.decide(&catalog, &requests[1]).unwrap();
    assert_eq!(
        decision,
        Decision::Placed {
            selected: vec!["H5".to_string()],
            objective: 4. + 0. + 3. * 2. - 2000.,
        }
    );
}

#[test]
fn test_empty_catalog() {
    let optimizer = PlacementOptimizer::with_weights(ObjectiveWeights::default());
    let request = PlacementRequest::new(1, 1, SelectionCountPolicy::AtLeast(1));
    let decision = optimizer.decide(&Catalog::new(), &request).unwrap();
    assert!(decision.is_infeasible());

    let request = PlacementRequest::new(1, 1, SelectionCountPolicy::AtMost(2)).with_allow_empty(true);
    let decision = optimizer.decide(&Catalog::new(), &request).unwrap();
    assert_eq!(
        decision,
        Decision::Placed {
            selected: vec![],
            objective: 0.,
        }
    );
}

#[test]
// Zero feasible candidates must never produce an empty but optimal decision.
fn test_no_candidate_meets_thresholds() {
    let (_, catalog, _) = load("sample_fleet.yaml");
    let optimizer = PlacementOptimizer::with_weights(ObjectiveWeights::default());
    for policy in [
        SelectionCountPolicy::AtLeast(1),
        SelectionCountPolicy::AtMost(3),
        SelectionCountPolicy::Exactly(1),
    ] {
        let request = PlacementRequest::new(200, 33, policy);
        let decision = optimizer.decide(&catalog, &request).unwrap();
        assert_eq!(decision.status(), SolveStatus::Infeasible, "policy {}", policy);
    }
}

#[test]
fn test_too_few_feasible_candidates() {
    let (_, catalog, _) = load("sample_fleet.yaml");
    let optimizer = PlacementOptimizer::with_weights(ObjectiveWeights::default());
    let request = PlacementRequest::new(100, 33, SelectionCountPolicy::Exactly(3));
    assert!(optimizer.decide(&catalog, &request).unwrap().is_infeasible());
}

#[test]
fn test_batch_matches_sequential_decisions() {
    let (config, catalog, _) = load("uniform_fleet.yaml");
    let optimizer = PlacementOptimizer::from_config(&config).unwrap();

    let mut requests = Vec::new();
    for vcpu in [8, 16, 32, 64, 128] {
        for policy in [
            SelectionCountPolicy::AtLeast(2),
            SelectionCountPolicy::AtMost(3),
            SelectionCountPolicy::Exactly(4),
        ] {
            requests.push(PlacementRequest::new(vcpu, 16, policy));
            requests.push(PlacementRequest::new(vcpu, 16, policy).with_feature(FeatureRequirement::Present));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let planner = BatchPlanner::new(optimizer.clone(), &catalog).with_report_dir(dir.path().to_str().unwrap());
    let results = planner.run(requests.clone(), 4).unwrap();
    assert_eq!(results.len(), requests.len());
    for (request, result) in requests.iter().zip(results) {
        let sequential = optimizer.decide(&catalog, request).unwrap();
        assert_eq!(result.unwrap().selected(), sequential.selected());
    }

    let report = std::fs::read_to_string(dir.path().join("decisions.json")).unwrap();
    let entries: serde_json::Value = serde_json::from_str(&report).unwrap();
    assert_eq!(entries.as_array().unwrap().len(), requests.len());
    assert_eq!(entries[0]["id"], 0);
}
