//! End-to-end host-only sweep: dataset file in, results table out.

use std::fs;
use std::path::PathBuf;

use ccl_bench::config::BenchConfig;
use ccl_bench::orchestrator::run_sweep;
use ccl_bench::report::RESULTS_FORMAT_VERSION;
use ccl_bench::strategy::{LayoutMode, ResidencyMode};
use ccl_core::dataset::write_stream_to_file;
use ccl_core::synth::generate_stream;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ccl_e2e_{}_{}", std::process::id(), name))
}

#[test]
fn host_sweep_produces_a_well_formed_table() {
    let dataset_path = temp_path("cells.bin");
    let output_path = temp_path("results.txt");
    let _ = fs::remove_file(&output_path);
    write_stream_to_file(&dataset_path, &generate_stream(48, 30, 0xC0FFEE)).unwrap();

    let config = BenchConfig {
        dataset_path: dataset_path.clone(),
        dataset_id: 11,
        output_path: output_path.clone(),
        trial_count: 3,
        kernel_count: 2,
        residencies: vec![ResidencyMode::Host],
        layouts: LayoutMode::ALL.to_vec(),
        ..BenchConfig::default()
    };
    run_sweep(&config).unwrap();

    let text = fs::read_to_string(&output_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], RESULTS_FORMAT_VERSION.to_string());
    // Three layouts, each a header plus three trial rows.
    assert_eq!(lines.len(), 1 + 3 * 4);

    for block in 0..3 {
        let header: Vec<i64> = lines[1 + block * 4]
            .split_whitespace()
            .map(|f| f.parse().unwrap())
            .collect();
        assert_eq!(header[0], 11, "dataset id");
        assert_eq!(header[3], 3, "trial count");
        assert_eq!(header[4], 2, "kernel count");
        assert_eq!(header[5], 1, "host residency id");

        for trial in 0..3 {
            let row: Vec<i64> = lines[2 + block * 4 + trial]
                .split_whitespace()
                .map(|f| f.parse().unwrap())
                .collect();
            // alloc_native, fill, read and dealloc_native are measured on the
            // host path; backend phases and the copy stay unreported.
            assert!(row[0] >= 0, "t_alloc_native");
            assert_eq!(row[1], -1, "t_alloc_backend");
            assert!(row[2] >= 0, "t_fill");
            assert_eq!(row[3], -1, "t_copy");
            assert!(row[4] >= 0, "t_read");
            assert_eq!(row[5], -1, "t_dealloc_backend");
            assert!(row[6] >= 0, "t_dealloc_native");
            assert_eq!(row[7], 2, "kernel count");
            assert!(row[8] >= 0 && row[9] >= 0, "kernel laps");
            assert_eq!(row.len(), 10);
        }
    }

    fs::remove_file(&dataset_path).unwrap();
    fs::remove_file(&output_path).unwrap();
}

#[test]
fn sweep_skips_combinations_the_backend_cannot_express() {
    let dataset_path = temp_path("skip_cells.bin");
    let output_path = temp_path("skip_results.txt");
    let _ = fs::remove_file(&output_path);
    write_stream_to_file(&dataset_path, &generate_stream(8, 10, 3)).unwrap();

    // Pointer-graph layouts paired with a GPU residency are structurally
    // invalid; a sweep restricted to them writes no configuration blocks at
    // all and never initializes the backend.
    let config = BenchConfig {
        dataset_path: dataset_path.clone(),
        output_path: output_path.clone(),
        trial_count: 1,
        residencies: vec![ResidencyMode::Unified, ResidencyMode::DeviceExplicit],
        layouts: vec![LayoutMode::PointerGraphMerged, LayoutMode::PointerGraphSplit],
        ..BenchConfig::default()
    };
    run_sweep(&config).unwrap();

    let text = fs::read_to_string(&output_path).unwrap();
    assert_eq!(text.lines().count(), 1, "only the version line");

    fs::remove_file(&dataset_path).unwrap();
    fs::remove_file(&output_path).unwrap();
}
