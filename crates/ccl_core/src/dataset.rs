//! Dataset repository: binary loading, sparsity filtering and replication.
//!
//! On-disk layout, all little-endian `u32`:
//! `[total_module_count][total_cell_count][total_int_written][stream...]`
//! where the stream is `cell_count, (channel0, channel1) * cell_count` once
//! per module. The in-memory representation keeps exactly that flat stream so
//! the fill phase can replay it through a pull cursor.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use crate::cell::{FlatInputModule, InputCell};
use crate::kernel::{sparse_ccl, MAX_CELLS_PER_MODULE};
use crate::validation::ValidationTotals;

/// Inclusive `[min, max]` bound on module cell count used to filter a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SparsityWindow {
    pub min: u32,
    pub max: u32,
}

impl Default for SparsityWindow {
    fn default() -> Self {
        Self { min: 0, max: u32::MAX }
    }
}

impl SparsityWindow {
    pub fn accepts(&self, cell_count: u32) -> bool {
        cell_count >= self.min && cell_count <= self.max
    }

    /// A full window keeps every module and skips the filtering passes.
    pub fn is_full(&self) -> bool {
        self.min == 0 && self.max == u32::MAX
    }
}

/// How many times the loaded stream is repeated to reach the target workload.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct ReplicationSpec {
    /// Base repeat count applied to every load.
    pub base_repeat: u32,
    /// When a sparsity window thins the dataset, the repeat count is scaled up
    /// so the filtered workload reaches roughly this many cells.
    pub target_cell_count: Option<u32>,
}

impl Default for ReplicationSpec {
    fn default() -> Self {
        Self { base_repeat: 1, target_cell_count: None }
    }
}

/// An ordered sequence of modules plus the concatenated cells they reference,
/// kept as the raw flat stream, with the validation totals derived from it.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    stream: Vec<u32>,
    pub total_module_count: u32,
    pub total_cell_count: u32,
    /// Largest single module in the stream, checked against the configured
    /// per-module capacity before any kernel runs.
    pub max_module_cell_count: u32,
    pub expected: ValidationTotals,
    pub dataset_id: u32,
}

impl Dataset {
    /// A zero-size dataset; every downstream phase treats it as a no-op.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.total_module_count == 0
    }

    /// Builds a dataset from a raw flat stream, applying the sparsity window
    /// and replication policy, and derives the expected validation totals by
    /// running the CPU reference kernel once over the filtered stream.
    pub fn from_stream(
        mut stream: Vec<u32>,
        window: &SparsityWindow,
        replication: &ReplicationSpec,
    ) -> Result<Self> {
        let mut repeat = replication.base_repeat.max(1);

        if !window.is_full() {
            let before_cells = count_stream(&stream)?.1;
            stream = filter_stream(&stream, window)?;
            let after_cells = count_stream(&stream)?.1;
            // Thinner data gets repeated more, so every window ends up with a
            // comparable workload.
            if let (Some(target), true) = (replication.target_cell_count, after_cells != 0) {
                let scale = (target / after_cells).max(1);
                info!(before_cells, after_cells, scale, "sparsity window applied");
                repeat *= scale;
            }
        }

        let (module_count, cell_count, max_cells) = count_stream(&stream)?;
        let expected_once = reference_totals(&stream)?;

        let mut dataset = Self {
            stream,
            total_module_count: module_count,
            total_cell_count: cell_count,
            max_module_cell_count: max_cells,
            expected: expected_once,
            dataset_id: 0,
        };
        dataset.replicate(repeat);
        Ok(dataset)
    }

    /// Loads and replicates a binary dataset file.
    pub fn load(
        path: impl AsRef<Path>,
        window: &SparsityWindow,
        replication: &ReplicationSpec,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        let mut reader = BufReader::new(file);

        let declared_modules = read_u32(&mut reader)?;
        let declared_cells = read_u32(&mut reader)?;
        let total_int_written = read_u32(&mut reader)?;

        let mut payload = vec![0u8; total_int_written as usize * 4];
        reader
            .read_exact(&mut payload)
            .with_context(|| format!("truncated dataset stream in {}", path.display()))?;

        // Advisory only: a trailing-length mismatch is a warning, not fatal.
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).ok();
        if !rest.is_empty() {
            warn!(
                extra_words = rest.len() / 4,
                declared = total_int_written,
                "dataset file longer than total_int_written declares"
            );
        }

        let stream: Vec<u32> = payload
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        let (module_count, cell_count, _) = count_stream(&stream)?;
        if module_count != declared_modules || cell_count != declared_cells {
            warn!(
                declared_modules,
                declared_cells,
                module_count,
                cell_count,
                "dataset header counts disagree with stream contents"
            );
        }

        info!(
            path = %path.display(),
            module_count,
            cell_count,
            "dataset loaded"
        );
        Self::from_stream(stream, window, replication)
    }

    /// Repeats the stream `n` times; totals and expected values scale with it.
    pub fn replicate(&mut self, n: u32) {
        if n <= 1 {
            return;
        }
        let once = self.stream.clone();
        self.stream.reserve(once.len() * (n as usize - 1));
        for _ in 1..n {
            self.stream.extend_from_slice(&once);
        }
        self.total_module_count *= n;
        self.total_cell_count *= n;
        self.expected.cluster_count *= u64::from(n);
        self.expected.label_sum *= u64::from(n);
    }

    /// Pull cursor over the flat stream, starting at the first module.
    pub fn cursor(&self) -> StreamCursor<'_> {
        StreamCursor { data: &self.stream, pos: 0 }
    }

    /// Input footprint: flat module entries plus input cells.
    pub fn in_bytes(&self) -> u64 {
        u64::from(self.total_module_count) * core::mem::size_of::<FlatInputModule>() as u64
            + u64::from(self.total_cell_count) * core::mem::size_of::<InputCell>() as u64
    }

    /// Output footprint: one cluster count per module plus one label per cell.
    pub fn out_bytes(&self) -> u64 {
        u64::from(self.total_module_count) * 4 + u64::from(self.total_cell_count) * 4
    }
}

/// Pull-based reader over the flat `[cell_count, (chan0, chan1)*]*` stream.
///
/// The stream length is validated at load time, so a cursor driven by the
/// recorded module/cell counts never runs past the end.
#[derive(Debug, Clone)]
pub struct StreamCursor<'a> {
    data: &'a [u32],
    pos: usize,
}

impl<'a> StreamCursor<'a> {
    pub fn next_uint(&mut self) -> u32 {
        let v = self.data[self.pos];
        self.pos += 1;
        v
    }

    /// Skips over `cell_count` cell pairs without reading them.
    pub fn skip_cells(&mut self, cell_count: u32) {
        self.pos += cell_count as usize * 2;
    }

    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// Writes a flat stream in the on-disk layout. Used by tests and demos.
pub fn write_stream_to_file(path: impl AsRef<Path>, stream: &[u32]) -> Result<()> {
    let (module_count, cell_count, _) = count_stream(stream)?;
    let path = path.as_ref();
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for header in [module_count, cell_count, stream.len() as u32] {
        writer.write_all(&header.to_le_bytes())?;
    }
    for word in stream {
        writer.write_all(&word.to_le_bytes())?;
    }
    writer.flush().context("failed to flush dataset file")
}

fn read_u32(reader: &mut impl Read) -> Result<u32> {
    let mut bytes = [0u8; 4];
    reader.read_exact(&mut bytes).context("truncated dataset header")?;
    Ok(u32::from_le_bytes(bytes))
}

/// Walks the stream once and returns
/// `(module_count, cell_count, max_module_cell_count)`.
fn count_stream(stream: &[u32]) -> Result<(u32, u32, u32)> {
    let mut pos = 0usize;
    let mut modules = 0u32;
    let mut cells = 0u32;
    let mut max_cells = 0u32;
    while pos < stream.len() {
        let cell_count = stream[pos];
        if cell_count as usize > MAX_CELLS_PER_MODULE {
            bail!(
                "module {modules} holds {cell_count} cells, \
                 exceeding the per-module capacity of {MAX_CELLS_PER_MODULE}"
            );
        }
        pos += 1 + cell_count as usize * 2;
        if pos > stream.len() {
            bail!("stream ends mid-module (module {modules} claims {cell_count} cells)");
        }
        modules += 1;
        cells += cell_count;
        max_cells = max_cells.max(cell_count);
    }
    Ok((modules, cells, max_cells))
}

/// Keeps only the modules whose cell count falls inside the window.
fn filter_stream(stream: &[u32], window: &SparsityWindow) -> Result<Vec<u32>> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < stream.len() {
        let cell_count = stream[pos];
        let end = pos + 1 + cell_count as usize * 2;
        if end > stream.len() {
            bail!("stream ends mid-module during sparsity filtering");
        }
        if window.accepts(cell_count) {
            out.extend_from_slice(&stream[pos..end]);
        }
        pos = end;
    }
    Ok(out)
}

/// Runs the CPU reference kernel over the whole stream to derive the totals
/// every benchmark configuration must reproduce.
pub fn reference_totals(stream: &[u32]) -> Result<ValidationTotals> {
    let mut totals = ValidationTotals::default();
    let mut pos = 0usize;
    let mut cells: Vec<InputCell> = Vec::new();
    let mut labels: Vec<u32> = Vec::new();
    while pos < stream.len() {
        let cell_count = stream[pos] as usize;
        pos += 1;
        if pos + cell_count * 2 > stream.len() {
            bail!("stream ends mid-module while deriving reference totals");
        }
        cells.clear();
        for _ in 0..cell_count {
            let c0 = stream[pos];
            let c1 = stream[pos + 1];
            pos += 2;
            cells.push(InputCell::new(c0, c1));
        }
        labels.clear();
        labels.resize(cell_count, 0);
        let clusters = sparse_ccl(&cells, &mut labels);
        totals.cluster_count += u64::from(clusters);
        totals.label_sum += labels.iter().map(|&l| u64::from(l)).sum::<u64>();
    }
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;

    // stream: module of 1 cell, module of 2 cells, module of 2 cells,
    // module of 3 cells.
    fn mixed_stream() -> Vec<u32> {
        vec![
            1, 5, 5, //
            2, 0, 0, 1, 0, //
            2, 3, 3, 9, 9, //
            3, 0, 0, 0, 1, 0, 2,
        ]
    }

    #[test]
    fn counts_modules_and_cells() {
        let (modules, cells, max_cells) = count_stream(&mixed_stream()).unwrap();
        assert_eq!(modules, 4);
        assert_eq!(cells, 8);
        assert_eq!(max_cells, 3);
    }

    #[test]
    fn sparsity_window_retains_only_matching_modules() {
        let window = SparsityWindow { min: 2, max: 2 };
        let filtered = filter_stream(&mixed_stream(), &window).unwrap();
        let (modules, cells, max_cells) = count_stream(&filtered).unwrap();
        assert_eq!(modules, 2);
        assert_eq!(cells, 4);
        assert_eq!(max_cells, 2);
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let mut stream = mixed_stream();
        stream.pop();
        assert!(count_stream(&stream).is_err());
    }

    #[test]
    fn replication_scales_totals_linearly() {
        let dataset = Dataset::from_stream(
            mixed_stream(),
            &SparsityWindow::default(),
            &ReplicationSpec { base_repeat: 3, target_cell_count: None },
        )
        .unwrap();
        let once = Dataset::from_stream(
            mixed_stream(),
            &SparsityWindow::default(),
            &ReplicationSpec::default(),
        )
        .unwrap();
        assert_eq!(dataset.total_module_count, 12);
        assert_eq!(dataset.total_cell_count, 24);
        assert_eq!(dataset.expected.cluster_count, 3 * once.expected.cluster_count);
        assert_eq!(dataset.expected.label_sum, 3 * once.expected.label_sum);
    }

    #[test]
    fn cursor_replays_the_stream_in_order() {
        let dataset = Dataset::from_stream(
            mixed_stream(),
            &SparsityWindow::default(),
            &ReplicationSpec::default(),
        )
        .unwrap();
        let mut cursor = dataset.cursor();
        assert_eq!(cursor.next_uint(), 1);
        cursor.skip_cells(1);
        assert_eq!(cursor.next_uint(), 2);
    }

    #[test]
    fn oversized_module_fails_the_capacity_precondition() {
        let mut stream = vec![MAX_CELLS_PER_MODULE as u32 + 1];
        for i in 0..(MAX_CELLS_PER_MODULE as u32 + 1) {
            stream.push(0);
            stream.push(i);
        }
        assert!(count_stream(&stream).is_err());
    }
}
