//! Command-line entry point for the SparseCCL residency/layout sweep.
//!
//! All options take `--key=value` form. A JSON config file supplies the
//! baseline; individual flags override its fields.

use std::env;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use tracer::init_tracing;

use ccl_bench::config::BenchConfig;
use ccl_bench::orchestrator::run_sweep;

fn main() -> Result<()> {
    init_tracing();

    let mut config_path: Option<PathBuf> = None;
    let mut overrides: Vec<(String, String)> = Vec::new();

    for arg in env::args().skip(1) {
        if let Some(value) = arg.strip_prefix("--config=") {
            config_path = Some(PathBuf::from(value));
        } else if let Some(rest) = arg.strip_prefix("--") {
            let (key, value) = rest
                .split_once('=')
                .with_context(|| format!("expected --key=value, got {arg:?}"))?;
            overrides.push((key.to_string(), value.to_string()));
        } else {
            anyhow::bail!("unrecognized argument {arg:?} (expected --key=value)");
        }
    }

    let mut config = match config_path {
        Some(path) => BenchConfig::from_file(&path)?,
        None => BenchConfig::default(),
    };
    apply_overrides(&mut config, &overrides)?;
    config.validate()?;

    run_sweep(&config)
}

fn apply_overrides(config: &mut BenchConfig, overrides: &[(String, String)]) -> Result<()> {
    for (key, value) in overrides {
        match key.as_str() {
            "dataset" => config.dataset_path = PathBuf::from(value),
            "dataset-id" => {
                config.dataset_id = value.parse().context("invalid value for --dataset-id")?
            }
            "output" => config.output_path = PathBuf::from(value),
            "trials" => {
                config.trial_count = value.parse().context("invalid value for --trials")?
            }
            "kernels" => {
                config.kernel_count = value.parse().context("invalid value for --kernels")?
            }
            "sparsity-min" => {
                config.sparsity.min = value.parse().context("invalid value for --sparsity-min")?
            }
            "sparsity-max" => {
                config.sparsity.max = value.parse().context("invalid value for --sparsity-max")?
            }
            "repeat" => {
                config.replication.base_repeat =
                    value.parse().context("invalid value for --repeat")?
            }
            "target-cells" => {
                config.replication.target_cell_count =
                    Some(value.parse().context("invalid value for --target-cells")?)
            }
            "residencies" => {
                config.residencies = parse_list(value).context("invalid --residencies list")?
            }
            "layouts" => config.layouts = parse_list(value).context("invalid --layouts list")?,
            other => anyhow::bail!("unknown option --{other}"),
        }
    }
    Ok(())
}

/// Parses a comma-separated list of snake_case enum names via serde.
fn parse_list<T: serde::de::DeserializeOwned>(value: &str) -> Result<Vec<T>> {
    value
        .split(',')
        .map(|name| {
            serde_json::from_value(serde_json::Value::String(name.trim().to_string()))
                .with_context(|| format!("unknown name {name:?}"))
        })
        .collect()
}

mod tracer {
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt().try_init();
    }
}
