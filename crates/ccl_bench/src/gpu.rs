//! Shared backend context: one device, queue and compiled labeling pipeline
//! reused across every GPU-resident benchmark iteration, so adapter and
//! pipeline setup never pollutes per-trial timings.

use anyhow::{Context, Result};

use ccl_shaders::{SPARSE_CCL, SPARSE_CCL_ENTRY_POINT, WORKGROUP_SIZE};

/// Uniform block handed to the labeling kernel.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct KernelParams {
    pub module_count: u32,
    pub _pad: [u32; 3],
}

pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub pipeline: wgpu::ComputePipeline,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl GpuContext {
    pub async fn new_async() -> Result<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions::default())
            .await
            .context("no compatible GPU adapter found")?;
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("sparseccl_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                ..Default::default()
            })
            .await
            .context("failed to request wgpu device")?;

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SparseCclBindGroupLayout"),
                entries: &[
                    storage_entry(0, true),
                    storage_entry(1, true),
                    storage_entry(2, false),
                    storage_entry(3, false),
                    wgpu::BindGroupLayoutEntry {
                        binding: 4,
                        visibility: wgpu::ShaderStages::COMPUTE,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("SparseCclPipelineLayout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("SparseCclShader"),
            source: wgpu::ShaderSource::Wgsl(SPARSE_CCL.into()),
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("SparseCclPipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(SPARSE_CCL_ENTRY_POINT),
            compilation_options: Default::default(),
            cache: None,
        });

        Ok(Self { device, queue, pipeline, bind_group_layout })
    }

    pub fn new() -> Result<Self> {
        pollster::block_on(Self::new_async())
    }

    /// Blocks until all submitted work has completed.
    pub fn poll_wait(&self) {
        let _ = self.device.poll(wgpu::MaintainBase::Wait);
    }

    pub fn workgroups_for(module_count: u32) -> u32 {
        (module_count + WORKGROUP_SIZE - 1) / WORKGROUP_SIZE
    }
}

fn storage_entry(binding: u32, read_only: bool) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
