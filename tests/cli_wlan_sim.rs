use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "wlansim-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &PathBuf, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

const TWO_NODES: &str = r#"
{
    "schema_version": 1,
    "seed": 3,
    "duration_ms": 10,
    "nodes": [
        { "id": 0, "name": "ap" },
        { "id": 1, "name": "sta1", "position": { "x": 8.0 } }
    ],
    "traffic": [
        { "src": 0, "dst": 1, "packet_bytes": 1000, "interval_us": 1000, "count": 4 }
    ]
}
"#;

#[test]
fn wlan_sim_prints_summary_and_writes_viz_json_with_meta_first() {
    let dir = unique_temp_dir("wlan-sim-viz");
    let scenario = write_file(&dir, "scenario.json", TWO_NODES);
    let out_json = dir.join("viz.json");

    let output = Command::new(env!("CARGO_BIN_EXE_wlan_sim"))
        .args([
            "--scenario",
            scenario.to_str().unwrap(),
            "--viz-json",
            out_json.to_str().unwrap(),
        ])
        .output()
        .expect("run wlan_sim");
    assert!(
        output.status.success(),
        "wlan_sim failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l.starts_with("node n0 (ap): ")));
    assert!(stdout.lines().any(|l| l.starts_with("node n1 (sta1): ")));
    let total = stdout
        .lines()
        .find(|l| l.starts_with("total: "))
        .expect("missing total line");
    assert!(total.contains("acked=4"), "unexpected total: {total}");
    assert!(total.contains("loss_ratio=0.0000"), "unexpected total: {total}");

    let raw = fs::read_to_string(&out_json).expect("read viz.json");
    let v: Value = serde_json::from_str(&raw).expect("parse viz.json");
    let arr = v.as_array().expect("viz.json must be a JSON array");
    assert!(!arr.is_empty(), "viz.json should contain at least meta event");
    assert_eq!(
        arr[0].get("kind").and_then(|k| k.as_str()),
        Some("meta"),
        "expected first viz event to be meta"
    );
    let nodes = arr[0]["nodes"].as_array().expect("meta.nodes");
    assert_eq!(nodes.len(), 2);
    assert!(
        arr.iter()
            .any(|e| e.get("kind").and_then(|k| k.as_str()) == Some("data_rx")),
        "expected at least one data_rx event"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wlan_sim_json_output_is_deterministic() {
    let dir = unique_temp_dir("wlan-sim-json");
    let scenario = write_file(&dir, "scenario.json", TWO_NODES);

    let run = || {
        let output = Command::new(env!("CARGO_BIN_EXE_wlan_sim"))
            .args(["--scenario", scenario.to_str().unwrap(), "--json"])
            .output()
            .expect("run wlan_sim");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).to_string()
    };
    let first = run();
    assert_eq!(first, run());

    let v: Value = serde_json::from_str(&first).expect("stats must be JSON");
    assert_eq!(v["nodes"]["0"]["acked_pkts"], 4);
    assert_eq!(v["nodes"]["1"]["rx_data_pkts"], 4);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn wlan_sim_rejects_bad_scenario() {
    let dir = unique_temp_dir("wlan-sim-bad");
    let scenario = write_file(
        &dir,
        "scenario.json",
        r#"{ "schema_version": 1, "nodes": [ { "id": 0 } ],
             "traffic": [ { "src": 0, "dst": 5, "packet_bytes": 10, "interval_us": 10 } ] }"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_wlan_sim"))
        .args(["--scenario", scenario.to_str().unwrap()])
        .output()
        .expect("run wlan_sim");
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("UnknownNode(5)"),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn bss_runs_with_cli_options() {
    let output = Command::new(env!("CARGO_BIN_EXE_bss"))
        .args([
            "--stations",
            "2",
            "--format",
            "non_ht",
            "--mcs",
            "3",
            "--count",
            "3",
            "--duration-ms",
            "20",
        ])
        .output()
        .expect("run bss");
    assert!(
        output.status.success(),
        "bss failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let total = stdout
        .lines()
        .find(|l| l.starts_with("total: "))
        .expect("missing total line");
    assert!(total.contains("acked=6"), "unexpected total: {total}");
}
