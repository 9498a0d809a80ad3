//! Backend-resident benchmark iterations over the flattened layout.
//!
//! Three residency modes share one buffer topology and differ only in how
//! input data reaches the device:
//! * unified: inputs are written through persistently mapped storage buffers,
//! * device-explicit: inputs live in host shadows and are staged across with
//!   a timed buffer-to-buffer copy,
//! * managed: inputs are handed to the queue right before the first kernel
//!   submission, so the transfer cost lands inside `t_kernel[0]`.
//!
//! Output readback always goes through mapped staging buffers and is charged
//! to the read phase.

use anyhow::Result;
use wgpu::util::DeviceExt;

use ccl_core::cell::{FlatInputModule, InputCell};
use ccl_core::dataset::Dataset;
use ccl_core::validation::ValidationTotals;

use crate::fill::{fill_flat_slices, sum_flat};
use crate::gpu::{GpuContext, KernelParams};
use crate::host_runner::IterationResult;
use crate::timing::{PhaseTimer, PhaseTimings};

struct FlatBuffers {
    modules: wgpu::Buffer,
    cells: wgpu::Buffer,
    labels: wgpu::Buffer,
    clusters: wgpu::Buffer,
    params: wgpu::Buffer,
    staging_labels: wgpu::Buffer,
    staging_clusters: wgpu::Buffer,
    module_bytes: wgpu::BufferAddress,
    cell_bytes: wgpu::BufferAddress,
    label_bytes: wgpu::BufferAddress,
    cluster_bytes: wgpu::BufferAddress,
}

impl FlatBuffers {
    /// One storage buffer per flat array plus mapped readback staging.
    /// `map_inputs` leaves the input buffers mapped for a host-visible fill.
    fn create(gpu: &GpuContext, dataset: &Dataset, map_inputs: bool) -> Self {
        let module_count = dataset.total_module_count as wgpu::BufferAddress;
        let cell_count = dataset.total_cell_count as wgpu::BufferAddress;
        let module_bytes = module_count * std::mem::size_of::<FlatInputModule>() as wgpu::BufferAddress;
        let cell_bytes = cell_count * std::mem::size_of::<InputCell>() as wgpu::BufferAddress;
        let label_bytes = cell_count * 4;
        let cluster_bytes = module_count * 4;

        let input_usage = if map_inputs {
            wgpu::BufferUsages::STORAGE
        } else {
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST
        };

        let modules = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SparseCclModules"),
            size: module_bytes,
            usage: input_usage,
            mapped_at_creation: map_inputs,
        });
        let cells = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SparseCclCells"),
            size: cell_bytes,
            usage: input_usage,
            mapped_at_creation: map_inputs,
        });
        let labels = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SparseCclLabels"),
            size: label_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let clusters = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SparseCclClusters"),
            size: cluster_bytes,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let params = gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SparseCclParams"),
            contents: bytemuck::bytes_of(&KernelParams {
                module_count: dataset.total_module_count,
                _pad: [0; 3],
            }),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let staging_labels = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SparseCclLabelStaging"),
            size: label_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let staging_clusters = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("SparseCclClusterStaging"),
            size: cluster_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            modules,
            cells,
            labels,
            clusters,
            params,
            staging_labels,
            staging_clusters,
            module_bytes,
            cell_bytes,
            label_bytes,
            cluster_bytes,
        }
    }

    fn bind_group(&self, gpu: &GpuContext) -> wgpu::BindGroup {
        gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SparseCclBindGroup"),
            layout: &gpu.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.modules.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: self.cells.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: self.labels.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 3, resource: self.clusters.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 4, resource: self.params.as_entire_binding() },
            ],
        })
    }

    /// Submits one labeling dispatch and blocks until it completes.
    fn dispatch(&self, gpu: &GpuContext, bind_group: &wgpu::BindGroup, module_count: u32) {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("SparseCclKernelEncoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor::default());
            pass.set_pipeline(&gpu.pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            pass.dispatch_workgroups(GpuContext::workgroups_for(module_count), 1, 1);
        }
        gpu.queue.submit(Some(encoder.finish()));
        gpu.poll_wait();
    }

    /// Copies outputs into the staging pair, maps it, and aggregates.
    fn read_totals(&self, gpu: &GpuContext) -> ValidationTotals {
        let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("SparseCclReadbackEncoder"),
        });
        encoder.copy_buffer_to_buffer(&self.labels, 0, &self.staging_labels, 0, self.label_bytes);
        encoder.copy_buffer_to_buffer(
            &self.clusters,
            0,
            &self.staging_clusters,
            0,
            self.cluster_bytes,
        );
        gpu.queue.submit(Some(encoder.finish()));

        let label_slice = self.staging_labels.slice(..);
        let cluster_slice = self.staging_clusters.slice(..);
        label_slice.map_async(wgpu::MapMode::Read, |_| {});
        cluster_slice.map_async(wgpu::MapMode::Read, |_| {});
        gpu.poll_wait();

        let label_data = label_slice.get_mapped_range();
        let cluster_data = cluster_slice.get_mapped_range();
        let (cluster_count, label_sum) =
            sum_flat(bytemuck::cast_slice(&cluster_data), bytemuck::cast_slice(&label_data));
        drop(label_data);
        drop(cluster_data);
        self.staging_labels.unmap();
        self.staging_clusters.unmap();

        ValidationTotals { cluster_count, label_sum }
    }

    /// Releases device memory eagerly instead of waiting for the drop.
    fn destroy(&self) {
        self.modules.destroy();
        self.cells.destroy();
        self.labels.destroy();
        self.clusters.destroy();
        self.params.destroy();
        self.staging_labels.destroy();
        self.staging_clusters.destroy();
    }
}

/// Unified residency: the fill phase writes straight into mapped storage
/// buffers, so there is no separate copy phase.
pub fn run_unified_flattened(
    gpu: &GpuContext,
    dataset: &Dataset,
    kernel_count: usize,
) -> Result<IterationResult> {
    let mut timings = PhaseTimings::new(kernel_count);
    let mut timer = PhaseTimer::start();

    let buffers = FlatBuffers::create(gpu, dataset, true);
    timings.t_alloc_backend = timer.lap_micros();

    {
        let mut module_range = buffers.modules.slice(..).get_mapped_range_mut();
        let mut cell_range = buffers.cells.slice(..).get_mapped_range_mut();
        fill_flat_slices(
            dataset,
            bytemuck::cast_slice_mut(&mut module_range),
            bytemuck::cast_slice_mut(&mut cell_range),
        )?;
    }
    buffers.modules.unmap();
    buffers.cells.unmap();
    let bind_group = buffers.bind_group(gpu);
    timings.t_fill = timer.lap_micros();

    for k in 0..kernel_count {
        buffers.dispatch(gpu, &bind_group, dataset.total_module_count);
        timings.t_kernel[k] = timer.lap_micros();
    }

    let observed = buffers.read_totals(gpu);
    timings.t_read = timer.lap_micros();

    buffers.destroy();
    drop(buffers);
    timings.t_dealloc_backend = timer.lap_micros();

    Ok(IterationResult { timings, observed })
}

/// Device-explicit residency: host shadows are filled first, then staged to
/// the device with a copy that is timed on its own.
pub fn run_device_flattened(
    gpu: &GpuContext,
    dataset: &Dataset,
    kernel_count: usize,
) -> Result<IterationResult> {
    let mut timings = PhaseTimings::new(kernel_count);
    let mut timer = PhaseTimer::start();

    let mut host_modules =
        vec![FlatInputModule::default(); dataset.total_module_count as usize];
    let mut host_cells = vec![InputCell::default(); dataset.total_cell_count as usize];
    timings.t_alloc_native = timer.lap_micros();

    let buffers = FlatBuffers::create(gpu, dataset, false);
    let upload = gpu.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("SparseCclUploadStaging"),
        size: buffers.module_bytes + buffers.cell_bytes,
        usage: wgpu::BufferUsages::MAP_WRITE | wgpu::BufferUsages::COPY_SRC,
        mapped_at_creation: true,
    });
    timings.t_alloc_backend = timer.lap_micros();

    fill_flat_slices(dataset, &mut host_modules, &mut host_cells)?;
    let bind_group = buffers.bind_group(gpu);
    timings.t_fill = timer.lap_micros();

    {
        let mut range = upload.slice(..).get_mapped_range_mut();
        let (module_part, cell_part) = range.split_at_mut(buffers.module_bytes as usize);
        module_part.copy_from_slice(bytemuck::cast_slice(&host_modules));
        cell_part.copy_from_slice(bytemuck::cast_slice(&host_cells));
    }
    upload.unmap();
    let mut encoder = gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("SparseCclUploadEncoder"),
    });
    encoder.copy_buffer_to_buffer(&upload, 0, &buffers.modules, 0, buffers.module_bytes);
    encoder.copy_buffer_to_buffer(
        &upload,
        buffers.module_bytes,
        &buffers.cells,
        0,
        buffers.cell_bytes,
    );
    gpu.queue.submit(Some(encoder.finish()));
    gpu.poll_wait();
    timings.t_copy = timer.lap_micros();

    for k in 0..kernel_count {
        buffers.dispatch(gpu, &bind_group, dataset.total_module_count);
        timings.t_kernel[k] = timer.lap_micros();
    }

    let observed = buffers.read_totals(gpu);
    timings.t_read = timer.lap_micros();

    buffers.destroy();
    upload.destroy();
    drop(buffers);
    drop(upload);
    timings.t_dealloc_backend = timer.lap_micros();

    drop(host_modules);
    drop(host_cells);
    timings.t_dealloc_native = timer.lap_micros();

    Ok(IterationResult { timings, observed })
}

/// Managed residency: the runtime moves input data when the first kernel is
/// submitted, so the migration cost shows up in `t_kernel[0]` and no copy
/// phase is reported.
pub fn run_managed_flattened(
    gpu: &GpuContext,
    dataset: &Dataset,
    kernel_count: usize,
) -> Result<IterationResult> {
    let mut timings = PhaseTimings::new(kernel_count);
    let mut timer = PhaseTimer::start();

    let mut host_modules =
        vec![FlatInputModule::default(); dataset.total_module_count as usize];
    let mut host_cells = vec![InputCell::default(); dataset.total_cell_count as usize];
    timings.t_alloc_native = timer.lap_micros();

    let buffers = FlatBuffers::create(gpu, dataset, false);
    timings.t_alloc_backend = timer.lap_micros();

    fill_flat_slices(dataset, &mut host_modules, &mut host_cells)?;
    let bind_group = buffers.bind_group(gpu);
    timings.t_fill = timer.lap_micros();

    for k in 0..kernel_count {
        if k == 0 {
            gpu.queue.write_buffer(&buffers.modules, 0, bytemuck::cast_slice(&host_modules));
            gpu.queue.write_buffer(&buffers.cells, 0, bytemuck::cast_slice(&host_cells));
        }
        buffers.dispatch(gpu, &bind_group, dataset.total_module_count);
        timings.t_kernel[k] = timer.lap_micros();
    }

    let observed = buffers.read_totals(gpu);
    timings.t_read = timer.lap_micros();

    buffers.destroy();
    drop(buffers);
    timings.t_dealloc_backend = timer.lap_micros();

    drop(host_modules);
    drop(host_cells);
    timings.t_dealloc_native = timer.lap_micros();

    Ok(IterationResult { timings, observed })
}
