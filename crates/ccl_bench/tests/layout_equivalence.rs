//! Every supported layout must observe identical aggregate totals for the
//! same dataset, and those totals must match the CPU reference pass.

use ccl_bench::host_runner::{run_host_flattened, run_host_merged, run_host_split};
use ccl_core::dataset::{Dataset, ReplicationSpec, SparsityWindow};
use ccl_core::synth::{generate_stream, stress_stream};

fn dataset_from(stream: Vec<u32>) -> Dataset {
    Dataset::from_stream(stream, &SparsityWindow::default(), &ReplicationSpec::default()).unwrap()
}

#[test]
fn layouts_agree_on_generated_modules() {
    for seed in [1u64, 0xBEEF, 9_000_000] {
        let dataset = dataset_from(generate_stream(64, 40, seed));

        let flattened = run_host_flattened(&dataset, 1).unwrap();
        let merged = run_host_merged(&dataset, 1).unwrap();
        let split = run_host_split(&dataset, 1).unwrap();

        assert_eq!(flattened.observed, dataset.expected, "seed {seed}");
        assert_eq!(merged.observed, dataset.expected, "seed {seed}");
        assert_eq!(split.observed, dataset.expected, "seed {seed}");
    }
}

#[test]
fn layouts_agree_on_edge_case_modules() {
    let dataset = dataset_from(stress_stream());

    let flattened = run_host_flattened(&dataset, 2).unwrap();
    let merged = run_host_merged(&dataset, 2).unwrap();
    let split = run_host_split(&dataset, 2).unwrap();

    assert_eq!(flattened.observed, merged.observed);
    assert_eq!(merged.observed, split.observed);
    assert_eq!(split.observed, dataset.expected);
}

#[test]
fn replication_preserves_layout_agreement() {
    let dataset = Dataset::from_stream(
        stress_stream(),
        &SparsityWindow::default(),
        &ReplicationSpec { base_repeat: 4, target_cell_count: None },
    )
    .unwrap();

    let flattened = run_host_flattened(&dataset, 1).unwrap();
    assert_eq!(flattened.observed, dataset.expected);
}

#[test]
fn sparsity_window_changes_the_workload_consistently() {
    let full = dataset_from(generate_stream(64, 40, 7));
    let windowed = Dataset::from_stream(
        generate_stream(64, 40, 7),
        &SparsityWindow { min: 10, max: 30 },
        &ReplicationSpec::default(),
    )
    .unwrap();
    assert!(windowed.total_cell_count <= full.total_cell_count);

    if !windowed.is_empty() {
        let flattened = run_host_flattened(&windowed, 1).unwrap();
        let merged = run_host_merged(&windowed, 1).unwrap();
        assert_eq!(flattened.observed, windowed.expected);
        assert_eq!(merged.observed, windowed.expected);
    }
}
