/// Integration tests for detection, correction and the convergence loop

use glam::{DVec2, DVec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use connection_lab::clash::{ClashCategory, ClashDetector, Severity};
use connection_lab::config::EngineConfig;
use connection_lab::connection::ConnectionCategory;
use connection_lab::convergence::{CancellationToken, ConvergenceLoop, LoopState};
use connection_lab::correction::ClashCorrector;
use connection_lab::model::{Footprint, Foundation, Joint, Member, Plate, StructuralModel, WeldKind};
use connection_lab::pipeline::{run_pipeline, Pipeline};
use connection_lab::report::ReportStatus;
use connection_lab::standards::tables::min_weld_size;
use connection_lab::standards::SizingRegistry;

/// A column on a footing whose base plate was left at the top of the column
fn stranded_base_plate() -> StructuralModel {
    let mut model = StructuralModel::new(vec![Member::new(
        "C1",
        DVec3::ZERO,
        DVec3::new(0.0, 0.0, 3000.0),
        "HEA200",
    )])
    .with_foundation(Foundation {
        elevation: 0.0,
        footprint: Footprint {
            min: DVec2::new(-600.0, -600.0),
            max: DVec2::new(600.0, 600.0),
        },
    });
    model.joints.push(Joint {
        id: "J1".into(),
        position: DVec3::ZERO,
        members: vec!["C1".into()],
        confidence: 1.0,
    });
    model.plates.push(Plate {
        id: "P1".into(),
        position: DVec3::new(0.0, 0.0, 3000.0),
        width: 400.0,
        height: 400.0,
        thickness: 20.0,
        material: "S355".into(),
        members: vec!["C1".into()],
        joint: Some("J1".into()),
        category: ConnectionCategory::BasePlate,
        axis_u: DVec3::X,
        axis_v: DVec3::Y,
    });
    model
}

fn count(detection: &connection_lab::clash::Detection, category: ClashCategory) -> usize {
    detection
        .clashes
        .iter()
        .filter(|clash| clash.category == category)
        .count()
}

// ============ Correction Tests ============

#[test]
fn test_stranded_base_plate_is_lowered() {
    let config = EngineConfig::default();
    let sizing = SizingRegistry::new(&config);
    let detector = ClashDetector::new(&config);
    let mut model = stranded_base_plate();

    let before = detector.detect(&model);
    assert_eq!(count(&before, ClashCategory::BasePlateWrongElevation), 1);
    let stranded = before
        .clashes
        .iter()
        .find(|clash| clash.category == ClashCategory::BasePlateWrongElevation)
        .unwrap();
    assert_eq!(stranded.severity, Severity::Critical);

    ClashCorrector::new(&config, &sizing).correct(&mut model, &before.clashes);
    assert_eq!(model.plates[0].position.z, 0.0);
    let after = detector.detect(&model);
    assert_eq!(count(&after, ClashCategory::BasePlateWrongElevation), 0);
}

#[test]
fn test_stranded_base_plate_converges() {
    let config = EngineConfig::default();
    let (model, report) = Pipeline::new(config).run(stranded_base_plate()).unwrap();
    assert_eq!(report.terminal, LoopState::Converged);
    assert_eq!(report.remaining.blocking(), 0);
    assert!(report.iterations >= 2);
    assert_eq!(model.plates[0].position.z, 0.0);
    assert!(model.anchors_on("P1").count() >= 4);
    assert!(model.welds_on("P1").count() >= 1);
}

#[test]
fn test_misplaced_joint_converges() {
    let mut model = StructuralModel::new(vec![
        Member::new("M1", DVec3::ZERO, DVec3::new(3000.0, 0.0, 0.0), "IPE300"),
        Member::new("M2", DVec3::new(3000.0, 0.0, 0.0), DVec3::new(6000.0, 0.0, 0.0), "IPE300"),
    ]);
    model.joints.push(Joint {
        id: "J1".into(),
        position: DVec3::new(3000.0, 0.0, 500.0),
        members: vec!["M1".into(), "M2".into()],
        confidence: 1.0,
    });
    let (model, report) = run_pipeline(model, &EngineConfig::default()).unwrap();
    assert_eq!(report.initial.by_category.get(&ClashCategory::JointPositionMismatch), Some(&1));
    assert_eq!(report.terminal, LoopState::Converged);
    assert!(!report.rolled_back);
    assert_eq!(report.remaining.blocking(), 0);
    assert_eq!(model.joints[0].position, DVec3::new(3000.0, 0.0, 0.0));
    assert!(model.plates.iter().all(|plate| plate.position.z.abs() < 1e-6));
}

#[test]
fn test_snapped_weld_keeps_a_clean_model_clean() {
    let config = EngineConfig::default();
    let loaded = StructuralModel::new(vec![
        Member::new("M1", DVec3::ZERO, DVec3::new(3000.0, 0.0, 0.0), "IPE300").with_load(300.0),
        Member::new("M2", DVec3::new(3000.0, 0.0, 0.0), DVec3::new(6000.0, 0.0, 0.0), "IPE300").with_load(300.0),
    ]);
    let (mut model, first) = run_pipeline(loaded, &config).unwrap();
    assert_eq!(first.remaining.blocking(), 0);

    // one long, thin fillet left 50 mm inside the plate edge
    let plate = model.plates[0].clone();
    let weld_id = model.welds_on(&plate.id).next().unwrap().id.clone();
    let weld = model.weld_mut(&weld_id).unwrap();
    weld.kind = WeldKind::Fillet;
    weld.position = plate.global(DVec3::new(plate.width / 2.0 - 50.0, 0.0, 0.0));
    weld.length = 2000.0;
    weld.size = min_weld_size(plate.thickness);

    let scan = ClashDetector::new(&config).detect(&model);
    assert_eq!(scan.blocking(), 0);
    assert_eq!(count(&scan, ClashCategory::WeldOffEdge), 1);

    let (model, report) = run_pipeline(model, &config).unwrap();
    assert_eq!(report.terminal, LoopState::Converged);
    assert!(!report.rolled_back);
    assert_ne!(report.status, ReportStatus::Failed);
    assert_eq!(report.remaining.blocking(), 0);
    assert!(!report.remaining.by_category.contains_key(&ClashCategory::WeldOffEdge));
    assert!(!report.remaining.by_category.contains_key(&ClashCategory::WeldUndersized));
    let snapped = model.welds.iter().find(|weld| weld.id == weld_id).unwrap();
    assert_eq!(snapped.length, plate.height);
}

// ============ Loop State Tests ============

#[test]
fn test_budget_of_one_is_exhausted() {
    let config = EngineConfig {
        max_iterations: 1,
        ..EngineConfig::default()
    };
    let sizing = SizingRegistry::new(&config);
    let mut model = stranded_base_plate();
    let outcome = ConvergenceLoop::new(&config, &sizing).run(&mut model);
    assert_eq!(outcome.terminal, LoopState::Exhausted);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.last.blocking() < outcome.initial.blocking());
}

#[test]
fn test_cancelled_run_returns_the_model() {
    let token = CancellationToken::new();
    token.cancel();
    let (model, report) = Pipeline::new(EngineConfig::default())
        .with_cancellation(token)
        .run(stranded_base_plate())
        .unwrap();
    assert_eq!(report.terminal, LoopState::Cancelled);
    assert_eq!(report.iterations, 0);
    assert_eq!(report.status, ReportStatus::Failed);
    assert_eq!(model.plates.len(), 1);
}

// ============ Monotonicity Tests ============

fn jitter(rng: &mut ChaCha8Rng, vertical: bool) -> DVec3 {
    DVec3::new(
        rng.random_range(-20.0..20.0),
        rng.random_range(-20.0..20.0),
        if vertical { rng.random_range(-20.0..20.0) } else { 0.0 },
    )
}

/// A row of bays with slightly sloppy member ends
fn random_frame(rng: &mut ChaCha8Rng) -> StructuralModel {
    let bays = rng.random_range(1..4);
    let height = rng.random_range(3000.0..4500.0);
    let mut x = 0.0;
    let mut tops = Vec::new();
    let mut members = Vec::new();
    for column in 0..=bays {
        let foot = DVec3::new(x, 0.0, 0.0) + jitter(rng, false);
        let top = DVec3::new(x, 0.0, height) + jitter(rng, true);
        members.push(Member::new(&format!("C{column}"), foot, top, "HEA200").with_load(rng.random_range(0.0..150.0)));
        tops.push(top);
        x += rng.random_range(4000.0..7000.0);
    }
    for (bay, pair) in tops.windows(2).enumerate() {
        members.push(Member::new(&format!("B{bay}"), pair[0], pair[1], "IPE300").with_load(rng.random_range(0.0..80.0)));
    }
    StructuralModel::new(members)
}

#[test]
fn test_blocking_count_never_rises() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..8 {
        let model = random_frame(&mut rng);
        let (_, report) = run_pipeline(model, &EngineConfig::default()).unwrap();
        assert!(!report.rolled_back, "{:?}", report.history);
        assert!(
            matches!(
                report.terminal,
                LoopState::Converged | LoopState::Exhausted | LoopState::Escalated
            ),
            "{}",
            report.terminal
        );
        for record in &report.history {
            assert!(record.blocking_after <= record.blocking_before, "{record:?}");
        }
        for pair in report.history.windows(2) {
            assert!(pair[1].blocking_before <= pair[0].blocking_before);
        }
        assert!(report.remaining.blocking() <= report.initial.blocking());
    }
}
