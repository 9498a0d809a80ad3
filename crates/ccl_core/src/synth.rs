//! Deterministic synthetic dataset generation for tests and demos.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::kernel::MAX_CELLS_PER_MODULE;

/// Generates a flat `[cell_count, (chan0, chan1)*]*` stream of `module_count`
/// modules with up to `max_cells_per_module` cells each, column major sorted
/// and free of duplicate coordinates within a module.
pub fn generate_stream(module_count: u32, max_cells_per_module: u32, seed: u64) -> Vec<u32> {
    let max_cells = (max_cells_per_module as usize).min(MAX_CELLS_PER_MODULE);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut stream = Vec::new();

    for _ in 0..module_count {
        let cell_count = rng.gen_range(0..=max_cells);
        let mut coords: Vec<(u32, u32)> = Vec::with_capacity(cell_count);
        while coords.len() < cell_count {
            // Column major sort key is (channel1, channel0).
            let c1 = rng.gen_range(0..64u32);
            let c0 = rng.gen_range(0..64u32);
            if !coords.contains(&(c1, c0)) {
                coords.push((c1, c0));
            }
        }
        coords.sort_unstable();

        stream.push(coords.len() as u32);
        for (c1, c0) in coords {
            stream.push(c0);
            stream.push(c1);
        }
    }
    stream
}

/// Small hand-picked modules that exercise the kernel's edge cases: an empty
/// module, isolated cells, a chain and a dense block.
pub fn stress_stream() -> Vec<u32> {
    vec![
        0, //
        1, 7, 7, //
        3, 0, 0, 1, 0, 5, 5, //
        3, 0, 0, 0, 1, 0, 2, //
        4, 0, 0, 1, 0, 0, 1, 1, 1,
    ]
}
