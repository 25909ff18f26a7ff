use airport_tycoon::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
};
use tempfile::tempdir;

#[test]
fn engine_runs_hook_each_tick() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader
        .load("scenarios/regional_airport.yaml")
        .expect("scenario should load");
    let mut world = scenario.build_world().expect("opening builds fit");
    let temp = tempdir().expect("tempdir");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: 0,
        snapshot_dir: temp.path().to_path_buf(),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_standard_systems(&scenario)
        .build();

    let mut ticks = Vec::new();
    engine
        .run_with_hook(&mut world, 6, scenario.frame_secs, |summary| {
            ticks.push(summary.tick)
        })
        .expect("run succeeds");

    assert_eq!(ticks, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(world.tick(), 6);
    assert!(std::fs::read_dir(temp.path()).expect("readable").next().is_none());
}

#[test]
fn snapshots_are_written_on_interval() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader
        .load("scenarios/regional_airport.yaml")
        .expect("scenario should load");
    let mut world = scenario.build_world().expect("opening builds fit");
    let temp = tempdir().expect("tempdir");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        seed: scenario.seed,
        snapshot_interval_ticks: 2,
        snapshot_dir: temp.path().to_path_buf(),
    };
    let mut engine = EngineBuilder::new(settings)
        .with_standard_systems(&scenario)
        .build();

    let mut written = Vec::new();
    engine
        .run_with_hook(&mut world, 5, scenario.frame_secs, |summary| {
            if let Some(path) = summary.snapshot_path {
                written.push(path);
            }
        })
        .expect("run succeeds");

    let dir = temp.path().join("regional_airport");
    assert_eq!(
        written,
        vec![dir.join("tick_000002.json"), dir.join("tick_000004.json")]
    );
    let text = std::fs::read_to_string(&written[1]).expect("snapshot readable");
    let value: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(value["scenario"], "regional_airport");
    assert_eq!(value["world"]["tick"], 4);
    assert_eq!(value["world"]["buildings"].as_array().map(Vec::len), Some(2));
    assert!(value["written_at"].is_string());
}
