use std::borrow::Cow;
use std::collections::HashMap;

use bevy::asset::AssetId;
use bevy::prelude::*;
use bevy::render::graph::CameraDriverLabel;
use bevy::render::render_asset::RenderAssets;
use bevy::render::render_graph::{Node, NodeRunError, RenderGraph, RenderGraphContext, RenderLabel};
use bevy::render::render_resource::{
    BindGroup, BindGroupEntry, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType,
    BufferInitDescriptor, BufferSize, BufferUsages, CachedComputePipelineId, CachedPipelineState, CommandEncoder,
    ComputePassDescriptor, ComputePipelineDescriptor, IntoBinding, PipelineCache, PushConstantRange, ShaderDefVal,
    ShaderStages, StorageTextureAccess, TextureFormat, TextureSampleType, TextureView, TextureViewDimension,
};
use bevy::render::renderer::{RenderContext, RenderDevice};
use bevy::render::texture::GpuImage;

use crate::config::{SimulationConfig, SimulationControl};
use crate::error::{FluidError, FluidResult};
use crate::format::FieldName;
use crate::gpu::buffers::{DISPLAY_FORMAT, FieldFormats, GpuFieldPool, texture_format};
use crate::gpu::draw_pass::{FluidDisplayLabel, FluidDisplayNode, prepare_display_pass};
use crate::gpu::ffi::GpuKernelParams;
use crate::gpu::input::FrameInjections;
use crate::kernel::{KernelKind, Pass, PassExecutor};
use crate::pool::FieldPool;
use crate::solver::SolverPipeline;

pub const KERNEL_SHADER_PATH: &str = "shaders/fluid_kernels.wgsl";
pub const WORKGROUP_SIZE: u32 = 8;

/// Layout plus queued pipeline for one entry point at one output format.
#[derive(Clone)]
pub struct KernelPipeline {
    pub layout: BindGroupLayout,
    pub id: CachedComputePipelineId,
}

#[derive(Resource)]
pub struct FluidPipelines {
    kernels: HashMap<(KernelKind, FieldName), KernelPipeline>,
    pub display: KernelPipeline,
    // keeps the shader asset alive
    _shader: Handle<Shader>,
}

/// One recorded compute dispatch, replayed by the render graph.
pub struct PreparedPass {
    pub label: &'static str,
    pub pipeline: CachedComputePipelineId,
    pub bind_group: BindGroup,
    pub workgroups: UVec2,
}

#[derive(Resource, Default)]
pub struct SolverPasses {
    pub solver: Vec<PreparedPass>,
    pub display: Option<PreparedPass>,
}

impl SolverPasses {
    pub fn clear(&mut self) {
        self.solver.clear();
        self.display = None;
    }
}

// ======================= pipelines ===================================

fn output_def(format: TextureFormat) -> &'static str {
    match format {
        TextureFormat::R32Float => "OUTPUT_R32FLOAT",
        TextureFormat::Rg32Float => "OUTPUT_RG32FLOAT",
        TextureFormat::Rgba32Float => "OUTPUT_RGBA32FLOAT",
        TextureFormat::R16Float => "OUTPUT_R16FLOAT",
        TextureFormat::Rg16Float => "OUTPUT_RG16FLOAT",
        TextureFormat::Rgba16Float => "OUTPUT_RGBA16FLOAT",
        TextureFormat::R8Unorm => "OUTPUT_R8UNORM",
        TextureFormat::Rg8Unorm => "OUTPUT_RG8UNORM",
        _ => "OUTPUT_RGBA8UNORM",
    }
}

fn read_entry(binding: u32) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: false },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// input0 @0, input1 @1 (two-input kernels only), output @2, params @3
fn kernel_layout_entries(inputs: usize, format: TextureFormat) -> Vec<BindGroupLayoutEntry> {
    let mut entries = vec![read_entry(0)];
    if inputs > 1 {
        entries.push(read_entry(1));
    }
    entries.push(BindGroupLayoutEntry {
        binding: 2,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::StorageTexture {
            access: StorageTextureAccess::WriteOnly,
            format,
            view_dimension: TextureViewDimension::D2,
        },
        count: None,
    });
    entries.push(BindGroupLayoutEntry {
        binding: 3,
        visibility: ShaderStages::COMPUTE,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: BufferSize::new(size_of::<GpuKernelParams>() as u64),
        },
        count: None,
    });
    entries
}

fn queue_kernel(
    device: &RenderDevice,
    cache: &PipelineCache,
    shader: &Handle<Shader>,
    entry_point: &'static str,
    inputs: usize,
    format: TextureFormat,
) -> KernelPipeline {
    let label = format!("fluid_{entry_point}_{format:?}");
    let layout = device.create_bind_group_layout(label.as_str(), &kernel_layout_entries(inputs, format));
    let id = cache.queue_compute_pipeline(ComputePipelineDescriptor {
        label: Some(label.into()),
        layout: vec![layout.clone()],
        push_constant_ranges: Vec::<PushConstantRange>::new(),
        shader: shader.clone(),
        shader_defs: vec![ShaderDefVal::from(output_def(format))],
        entry_point: Cow::from(entry_point),
        zero_initialize_workgroup_memory: false,
    });
    KernelPipeline { layout, id }
}

impl FluidPipelines {
    /// Queues one pipeline per (kernel, output field) pair the solver can
    /// issue, specialized on that field's resolved storage format.
    pub fn queue(
        device: &RenderDevice,
        cache: &PipelineCache,
        assets: &AssetServer,
        formats: &FieldFormats,
    ) -> Self {
        let shader: Handle<Shader> = assets.load(KERNEL_SHADER_PATH);
        let mut kernels = HashMap::new();
        for kind in KernelKind::ALL {
            for &output in kind.outputs() {
                let format = texture_format(formats.get(output).format);
                let pipeline = queue_kernel(device, cache, &shader, kind.label(), kind.input_count(), format);
                kernels.insert((kind, output), pipeline);
            }
        }
        let display = queue_kernel(device, cache, &shader, "display", 1, DISPLAY_FORMAT);
        info!("queued {} fluid kernel pipelines", kernels.len() + 1);
        Self {
            kernels,
            display,
            _shader: shader,
        }
    }

    pub fn kernel(&self, kind: KernelKind, output: FieldName) -> Option<&KernelPipeline> {
        self.kernels.get(&(kind, output))
    }

    fn ids(&self) -> impl Iterator<Item = CachedComputePipelineId> + '_ {
        self.kernels.values().map(|k| k.id).chain(std::iter::once(self.display.id))
    }

    /// True once every pipeline has compiled. A failed compile is returned
    /// as the error so the caller can report it.
    pub fn ready(&self, cache: &PipelineCache) -> Result<bool, String> {
        for id in self.ids() {
            match cache.get_compute_pipeline_state(id) {
                CachedPipelineState::Ok(_) => {}
                CachedPipelineState::Err(err) => return Err(err.to_string()),
                _ => return Ok(false),
            }
        }
        Ok(true)
    }
}

pub fn prepare_fluid_pipelines(
    mut commands: Commands,
    pipelines: Option<Res<FluidPipelines>>,
    formats: Option<Res<FieldFormats>>,
    device: Res<RenderDevice>,
    cache: Res<PipelineCache>,
    assets: Res<AssetServer>,
) {
    if pipelines.is_some() {
        return;
    }
    // formats arrive with the first extraction after startup allocation
    let Some(formats) = formats else {
        return;
    };
    commands.insert_resource(FluidPipelines::queue(&device, &cache, &assets, &formats));
}

// ======================= bind groups =================================

/// Images one kernel invocation binds: input0, input1, output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BindKey {
    entry_point: &'static str,
    images: [Option<AssetId<Image>>; 3],
}

impl BindKey {
    pub fn new(entry_point: &'static str, inputs: &[AssetId<Image>], output: AssetId<Image>) -> Self {
        let mut images = [None; 3];
        for (slot, &id) in images.iter_mut().zip(inputs) {
            *slot = Some(id);
        }
        images[2] = Some(output);
        Self { entry_point, images }
    }
}

/// Values built once per bound image set and reused every frame after. Each
/// ping-pong parity gets its own entry; a new field generation drops them all.
pub struct BindingCache<V> {
    generation: Option<u32>,
    entries: HashMap<BindKey, (GpuKernelParams, V)>,
}

impl<V> Default for BindingCache<V> {
    fn default() -> Self {
        Self {
            generation: None,
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> BindingCache<V> {
    pub fn sync_generation(&mut self, generation: Option<u32>) {
        if self.generation != generation {
            self.entries.clear();
            self.generation = generation;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calls `make` only when `key` is new or its kernel parameters changed
    /// since the entry was built (splats, config edits).
    pub fn get_or_insert_with(
        &mut self,
        key: BindKey,
        params: GpuKernelParams,
        make: impl FnOnce(&GpuKernelParams) -> V,
    ) -> V {
        if let Some((cached, value)) = self.entries.get(&key) {
            if *cached == params {
                return value.clone();
            }
        }
        let value = make(&params);
        self.entries.insert(key, (params, value.clone()));
        value
    }
}

/// Bind group plus the uniform buffer it points at.
#[derive(Clone)]
pub struct KernelBinding {
    pub bind_group: BindGroup,
    _uniform: Buffer,
}

#[derive(Resource, Default)]
pub struct FluidBindGroupCache(pub BindingCache<KernelBinding>);

impl FluidBindGroupCache {
    pub fn sync_generation(&mut self, generation: Option<u32>) {
        self.0.sync_generation(generation);
    }

    /// Bind group for one kernel invocation, built on first use.
    pub fn get_or_create(
        &mut self,
        device: &RenderDevice,
        entry_point: &'static str,
        layout: &BindGroupLayout,
        inputs: &[(AssetId<Image>, &TextureView)],
        output: (AssetId<Image>, &TextureView),
        params: GpuKernelParams,
    ) -> BindGroup {
        let ids: Vec<AssetId<Image>> = inputs.iter().map(|&(id, _)| id).collect();
        let key = BindKey::new(entry_point, &ids, output.0);

        let binding = self.0.get_or_insert_with(key, params, |params| {
            let uniform = create_uniform(device, params);
            let mut entries: Vec<BindGroupEntry> = inputs
                .iter()
                .enumerate()
                .map(|(i, &(_, view))| BindGroupEntry {
                    binding: i as u32,
                    resource: view.into_binding(),
                })
                .collect();
            entries.push(BindGroupEntry {
                binding: 2,
                resource: output.1.into_binding(),
            });
            entries.push(BindGroupEntry {
                binding: 3,
                resource: uniform.as_entire_binding(),
            });
            KernelBinding {
                bind_group: device.create_bind_group(entry_point, layout, &entries),
                _uniform: uniform,
            }
        });
        binding.bind_group
    }
}

// ======================= recording ===================================

fn create_uniform(device: &RenderDevice, params: &GpuKernelParams) -> Buffer {
    device.create_buffer_with_data(&BufferInitDescriptor {
        label: Some("fluid_kernel_params"),
        contents: bytemuck::bytes_of(params),
        usage: BufferUsages::UNIFORM,
    })
}

pub fn workgroups_for(size: UVec2) -> UVec2 {
    UVec2::new(size.x.div_ceil(WORKGROUP_SIZE), size.y.div_ceil(WORKGROUP_SIZE))
}

/// Pass Executor for the render world. Instead of running a pass it looks
/// up the bind group for it, keeps the dispatch for the render graph and
/// swaps the pool just like the CPU executor.
pub struct PassRecorder<'a> {
    pool: &'a mut FieldPool<Handle<Image>>,
    pipelines: &'a FluidPipelines,
    images: &'a RenderAssets<GpuImage>,
    device: &'a RenderDevice,
    bind_groups: &'a mut FluidBindGroupCache,
    passes: Vec<PreparedPass>,
}

impl<'a> PassRecorder<'a> {
    pub fn new(
        pool: &'a mut FieldPool<Handle<Image>>,
        pipelines: &'a FluidPipelines,
        images: &'a RenderAssets<GpuImage>,
        device: &'a RenderDevice,
        bind_groups: &'a mut FluidBindGroupCache,
    ) -> Self {
        Self {
            pool,
            pipelines,
            images,
            device,
            bind_groups,
            passes: Vec::new(),
        }
    }

    pub fn into_passes(self) -> Vec<PreparedPass> {
        self.passes
    }
}

impl PassExecutor for PassRecorder<'_> {
    type Error = FluidError;

    fn execute(&mut self, pass: &Pass) -> FluidResult<()> {
        let kind = pass.kernel.kind();
        let pipeline = self
            .pipelines
            .kernel(kind, pass.output)
            .ok_or(FluidError::NotResident(pass.output))?;
        let (bind_group, workgroups) = {
            let binding = self.pool.bind(pass.output, &pass.inputs)?;
            let output = self
                .images
                .get(&*binding.output)
                .ok_or(FluidError::NotResident(pass.output))?;

            let mut inputs = Vec::with_capacity(binding.inputs.len());
            for (&name, handle) in pass.inputs.iter().zip(&binding.inputs) {
                let image = self.images.get(*handle).ok_or(FluidError::NotResident(name))?;
                inputs.push((handle.id(), &image.texture_view));
            }

            let bind_group = self.bind_groups.get_or_create(
                self.device,
                kind.label(),
                &pipeline.layout,
                &inputs,
                (binding.output.id(), &output.texture_view),
                GpuKernelParams::from(&pass.kernel),
            );
            (bind_group, workgroups_for(binding.output_desc.size))
        };

        self.passes.push(PreparedPass {
            label: kind.label(),
            pipeline: pipeline.id,
            bind_group,
            workgroups,
        });
        if pass.output.is_double_buffered() {
            self.pool.swap(pass.output)?;
        }
        Ok(())
    }
}

fn images_resident(pool: &FieldPool<Handle<Image>>, display: &Handle<Image>, images: &RenderAssets<GpuImage>) -> bool {
    FieldName::ALL.iter().all(|&name| {
        pool.buffers(name)
            .map(|buffers| buffers.iter().all(|h| images.get(h).is_some()))
            .unwrap_or(false)
    }) && images.get(display).is_some()
}

/// Records this frame's solver passes and the display pass. The frame is
/// skipped whole until every pipeline and texture is ready; the pool only
/// advances when the full pass list was recorded.
pub fn prepare_solver_passes(
    mut passes: ResMut<SolverPasses>,
    mut gpu: ResMut<GpuFieldPool>,
    pipelines: Option<Res<FluidPipelines>>,
    config: Option<Res<SimulationConfig>>,
    control: Option<Res<SimulationControl>>,
    injections: Option<Res<FrameInjections>>,
    cache: Res<PipelineCache>,
    images: Res<RenderAssets<GpuImage>>,
    device: Res<RenderDevice>,
    mut bind_groups: ResMut<FluidBindGroupCache>,
    mut compile_error_reported: Local<bool>,
) {
    passes.clear();
    let (Some(pipelines), Some(config)) = (pipelines, config) else {
        return;
    };
    match pipelines.ready(&cache) {
        Ok(true) => {}
        Ok(false) => {
            debug!("fluid pipelines still compiling, skipping frame");
            return;
        }
        Err(err) => {
            if !*compile_error_reported {
                error!("fluid kernel pipeline failed to compile: {err}");
                *compile_error_reported = true;
            }
            return;
        }
    }

    bind_groups.sync_generation(gpu.generation);
    let GpuFieldPool {
        pool: Some(pool),
        display: Some((display, viewport)),
        ..
    } = &mut *gpu
    else {
        return;
    };
    if !images_resident(pool, display, &images) {
        debug!("fluid textures not uploaded yet, skipping frame");
        return;
    }

    let paused = control.is_some_and(|c| c.paused);
    if !paused {
        let splats = injections.as_ref().map(|i| i.splats.as_slice()).unwrap_or(&[]);
        let mut staged = pool.clone();
        let mut recorder = PassRecorder::new(&mut staged, &pipelines, &images, &device, &mut bind_groups);
        let result = SolverPipeline::new((*config).clone())
            .step(&mut recorder, splats)
            .map(|()| recorder.into_passes());
        match result {
            Ok(recorded) => {
                passes.solver = recorded;
                *pool = staged;
            }
            Err(err) => {
                error!("skipping fluid frame: {err}");
                return;
            }
        }
    }

    match prepare_display_pass(pool, display, *viewport, &pipelines, &images, &device, &mut bind_groups) {
        Ok(display_pass) => passes.display = Some(display_pass),
        Err(err) => error!("cannot present fluid: {err}"),
    }
}

// ======================= render graph ================================

impl PreparedPass {
    pub fn dispatch(&self, encoder: &mut CommandEncoder, cache: &PipelineCache) {
        let Some(pipeline) = cache.get_compute_pipeline(self.pipeline) else {
            return;
        };
        // one compute pass per kernel so each dispatch sees the previous writes
        let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
            label: Some(self.label),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(self.workgroups.x, self.workgroups.y, 1);
    }
}

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct FluidSolverLabel;

#[derive(Default)]
pub struct FluidSolverNode;

impl Node for FluidSolverNode {
    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let Some(passes) = world.get_resource::<SolverPasses>() else {
            return Ok(());
        };
        let cache = world.resource::<PipelineCache>();
        let encoder = render_context.command_encoder();
        for pass in &passes.solver {
            pass.dispatch(encoder, cache);
        }
        Ok(())
    }
}

pub fn add_solver_node_to_graph(render_app: &mut bevy::app::SubApp) {
    render_app
        .init_resource::<SolverPasses>()
        .init_resource::<FluidBindGroupCache>();
    let mut graph = render_app.world_mut().resource_mut::<RenderGraph>();
    graph.add_node(FluidSolverLabel, FluidSolverNode);
    graph.add_node(FluidDisplayLabel, FluidDisplayNode);
    graph.add_node_edge(FluidSolverLabel, FluidDisplayLabel);
    graph.add_node_edge(FluidDisplayLabel, CameraDriverLabel);
}
