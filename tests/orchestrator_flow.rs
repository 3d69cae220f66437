use std::time::Duration;

use funcfit::domain::FitState;
use funcfit::engine::{EngineBridge, LocalEngine};
use funcfit::error::FitError;
use funcfit::io::{ParsedColumns, format_result_text, parse_columns};
use funcfit::models::{ModelRegistry, evaluate};
use funcfit::{Delivery, FittingOrchestrator};

fn drain(orch: &mut FittingOrchestrator<EngineBridge>) -> Vec<Result<Delivery, FitError>> {
    let mut out = Vec::new();
    while orch.is_busy() {
        let response = orch
            .dispatcher()
            .recv_timeout(Duration::from_secs(30))
            .unwrap()
            .expect("engine did not answer in time");
        out.push(orch.deliver(response));
    }
    out
}

#[test]
fn rapid_edits_settle_on_the_last_one() {
    let bridge = EngineBridge::spawn(LocalEngine::default()).unwrap();
    let mut orch = FittingOrchestrator::new(bridge);
    orch.select_model(ModelRegistry::global().instantiate("parabola").unwrap()).unwrap();
    for a in 1..=20 {
        orch.edit_parameters([("a", a as f64)]).unwrap();
    }

    let deliveries = drain(&mut orch);
    assert_eq!(deliveries.last(), Some(&Ok(Delivery::ModelUpdated)));
    assert_eq!(deliveries.iter().filter(|d| **d == Ok(Delivery::ModelUpdated)).count(), 1);
    assert_eq!(orch.state(), FitState::Idle);

    // Default range is 0..1, so the last point is a·1² = 20.
    assert_eq!(orch.dataset().y_model.last().copied(), Some(20.0));

    // Every request was answered exactly once; nothing else is in flight.
    assert_eq!(orch.dispatcher().recv_timeout(Duration::from_millis(50)).unwrap(), None);
}

#[test]
fn fit_through_the_worker_thread_and_export() {
    let x: Vec<f64> = (0..80).map(|i| 0.01 + i as f64 * 0.005).collect();
    let truth = [1.0, 60.0, 0.1, 40e-6, 10e-6, 20.0];
    let y = evaluate("sas_sphere", &truth, &x).unwrap();
    let sigma_y: Vec<f64> = y.iter().map(|v| 0.02 * v).collect();

    let bridge = EngineBridge::spawn(LocalEngine::default()).unwrap();
    let mut orch = FittingOrchestrator::new(bridge);
    orch.select_model(ModelRegistry::global().instantiate("sas_sphere").unwrap()).unwrap();
    orch.load_dataset(ParsedColumns { x, y, sigma_y }).unwrap();
    orch.edit_parameters([("R", 59.0), ("I0", 0.9)]).unwrap();
    orch.set_vary("σ_R", false).unwrap();
    orch.run_fit().unwrap();
    assert_eq!(orch.state(), FitState::AwaitingFit);

    let deliveries = drain(&mut orch);
    assert_eq!(deliveries.last(), Some(&Ok(Delivery::FitCompleted)));

    let stats = orch.fit_statistics().unwrap();
    let r = stats.fitted_parameters.iter().find(|p| p.name == "R").unwrap();
    let i0 = stats.fitted_parameters.iter().find(|p| p.name == "I0").unwrap();
    assert!((r.value - 60.0).abs() < 1e-3, "R = {}", r.value);
    assert!((i0.value - 1.0).abs() < 1e-4, "I0 = {}", i0.value);
    assert!(r.std_error.is_some());
    assert_eq!(stats.initial_parameters[1].value, 59.0);

    let text = format_result_text(orch.dataset(), orch.model(), Some(stats), "test");
    assert!(text.contains("# Used model: Sphere\n"));
    assert!(text.contains("# x\ty_data\tsy_data\ty_model\n"));
    let table = parse_columns(&text).unwrap();
    assert_eq!(table.len(), 80);
}

#[test]
fn dropping_the_bridge_stops_the_worker() {
    let bridge = EngineBridge::spawn(LocalEngine::default()).unwrap();
    let mut orch = FittingOrchestrator::new(bridge);
    orch.select_model(ModelRegistry::global().instantiate("linear").unwrap()).unwrap();
    // Dropped with a request in flight: must not hang or panic.
    drop(orch);
}
