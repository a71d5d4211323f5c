use bevy::asset::RenderAssetUsages;
use bevy::image::{ImageSampler, TextureFormatPixelInfo};
use bevy::prelude::*;
use bevy::render::extract_resource::{ExtractResource, ExtractResourcePlugin};
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat, TextureUsages};
use bevy::render::renderer::RenderAdapter;
use bevy::render::{Render, RenderApp, RenderSet};
use bevy::window::{PrimaryWindow, WindowResized};

use crate::config::{SimulationConfig, SimulationControl};
use crate::error::FluidResult;
use crate::format::{ChannelLayout, FieldDescriptor, FieldFormat, FieldName, FilterMode, FormatSupport, Precision};
use crate::gpu::draw_pass::{spawn_presenter, sync_presenter};
use crate::gpu::input::{FrameInjections, capture_pointer, queue_injections};
use crate::gpu::pipeline::{add_solver_node_to_graph, prepare_fluid_pipelines, prepare_solver_passes};
use crate::injection::PointerState;
use crate::pool::FieldPool;

// ==================== resources ======================================

/// What the adapter can sample and write as storage, read once at startup.
#[derive(Resource, Clone, Copy, Debug)]
pub struct RuntimeFormatSupport(pub FormatSupport);

/// Storage format and filter of every field after fallback, sizes zeroed.
/// Pipelines are specialized on these.
#[derive(Resource, Clone, Debug, ExtractResource)]
pub struct FieldFormats {
    pub descriptors: [FieldDescriptor; FieldName::COUNT],
}

/// Main world owner of the field textures. A resize swaps in a whole new
/// pool and bumps `generation`.
#[derive(Resource, Clone, ExtractResource)]
pub struct FieldImages {
    /// Allocation record only. The main world never swaps it, so its read
    /// halves are not the current buffers; the render world `GpuFieldPool`
    /// tracks those.
    pub pool: FieldPool<Handle<Image>>,
    /// presentation target, viewport sized; the main world handle to show dye
    pub display: Handle<Image>,
    pub viewport: UVec2,
    pub generation: u32,
}

// Rendering world copy, kept across frames so ping-pong parity and the
// warm-started pressure survive.
#[derive(Resource, Default)]
pub struct GpuFieldPool {
    pub generation: Option<u32>,
    pub pool: Option<FieldPool<Handle<Image>>>,
    pub display: Option<(Handle<Image>, UVec2)>,
}

// =====================================================================

pub fn texture_format(format: FieldFormat) -> TextureFormat {
    use ChannelLayout::*;
    use Precision::*;
    match (format.layout, format.precision) {
        (R, Float32) => TextureFormat::R32Float,
        (Rg, Float32) => TextureFormat::Rg32Float,
        (Rgba, Float32) => TextureFormat::Rgba32Float,
        (R, Float16) => TextureFormat::R16Float,
        (Rg, Float16) => TextureFormat::Rg16Float,
        (Rgba, Float16) => TextureFormat::Rgba16Float,
        (R, Unorm8) => TextureFormat::R8Unorm,
        (Rg, Unorm8) => TextureFormat::Rg8Unorm,
        (Rgba, Unorm8) => TextureFormat::Rgba8Unorm,
    }
}

pub const DISPLAY_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

pub fn adapter_support(adapter: &RenderAdapter) -> FormatSupport {
    let needed = TextureUsages::STORAGE_BINDING | TextureUsages::TEXTURE_BINDING;
    FormatSupport::from_fn(|format| {
        adapter
            .get_texture_format_features(texture_format(format))
            .allowed_usages
            .contains(needed)
    })
}

impl FieldFormats {
    pub fn resolve(support: &FormatSupport) -> FluidResult<Self> {
        let mut descriptors = FieldName::ALL.map(|name| FieldDescriptor::standard(name, UVec2::ZERO));
        for name in FieldName::ALL {
            let wanted = descriptors[name.index()];
            let resolved = support.resolve(name, &wanted)?;
            if resolved.format != wanted.format {
                warn!(
                    "{} field: {:?} unsupported by the adapter, using {:?}",
                    name.label(),
                    wanted.format,
                    resolved.format
                );
            }
            descriptors[name.index()] = resolved;
        }
        Ok(Self { descriptors })
    }

    pub fn get(&self, name: FieldName) -> FieldDescriptor {
        self.descriptors[name.index()]
    }
}

fn storage_image(size: UVec2, format: TextureFormat, filter: FilterMode) -> Image {
    let extent = Extent3d {
        width: size.x,
        height: size.y,
        depth_or_array_layers: 1,
    };
    let zero = vec![0u8; format.pixel_size()];
    let mut image = Image::new_fill(
        extent,
        TextureDimension::D2,
        &zero,
        format,
        RenderAssetUsages::RENDER_WORLD,
    );
    image.texture_descriptor.usage = TextureUsages::TEXTURE_BINDING
        | TextureUsages::STORAGE_BINDING
        | TextureUsages::COPY_DST
        | TextureUsages::COPY_SRC;
    image.sampler = match filter {
        FilterMode::Nearest => ImageSampler::nearest(),
        FilterMode::Linear => ImageSampler::linear(),
    };
    image
}

pub fn field_image(desc: &FieldDescriptor) -> Image {
    storage_image(desc.size, texture_format(desc.format), desc.filter)
}

impl FieldImages {
    /// Allocates zero-filled textures for every field at the grid sizes the
    /// config derives from `viewport`.
    pub fn allocate(
        images: &mut Assets<Image>,
        support: FormatSupport,
        formats: &FieldFormats,
        config: &SimulationConfig,
        viewport: UVec2,
        generation: u32,
    ) -> FluidResult<Self> {
        let velocity = config.velocity_grid(viewport);
        let dye = config.dye_grid(viewport);

        let mut pool = FieldPool::new(support);
        for name in FieldName::ALL {
            let size = if name == FieldName::Dye { dye } else { velocity };
            let desc = formats.get(name).with_size(size);
            pool.allocate_with(name, desc, |d| images.add(field_image(d)))?;
        }
        let display = images.add(storage_image(viewport, DISPLAY_FORMAT, FilterMode::Linear));

        info!(
            "fluid fields allocated: viewport {}x{}, velocity {}x{}, dye {}x{} (generation {})",
            viewport.x, viewport.y, velocity.x, velocity.y, dye.x, dye.y, generation
        );
        Ok(Self {
            pool,
            display,
            viewport,
            generation,
        })
    }

    pub fn release(&self, images: &mut Assets<Image>) {
        for name in FieldName::ALL {
            if let Ok(buffers) = self.pool.buffers(name) {
                for handle in buffers.iter() {
                    images.remove(handle);
                }
            }
        }
        images.remove(&self.display);
    }
}

// ========================== systems ==================================

fn window_viewport(window: &Window) -> UVec2 {
    UVec2::new(window.physical_width(), window.physical_height())
}

// Startup systems that have to run only once

pub fn setup_fields(
    mut commands: Commands,
    mut images: ResMut<Assets<Image>>,
    support: Res<RuntimeFormatSupport>,
    config: Res<SimulationConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
) -> Result {
    config.validate()?;
    let window = windows.single()?;
    let formats = FieldFormats::resolve(&support.0)?;
    let fields = FieldImages::allocate(
        &mut images,
        support.0,
        &formats,
        &config,
        window_viewport(window),
        0,
    )?;
    commands.insert_resource(formats);
    commands.insert_resource(fields);
    Ok(())
}

// Update systems that have to run per frame

/// Reallocates every field when the window size changes. Prior contents are
/// dropped; the render world rebuilds its pool on the new generation before
/// the next solver pass is recorded.
pub fn resize_fields(
    mut resized: EventReader<WindowResized>,
    mut images: ResMut<Assets<Image>>,
    fields: Option<ResMut<FieldImages>>,
    formats: Option<Res<FieldFormats>>,
    config: Res<SimulationConfig>,
    windows: Query<&Window, With<PrimaryWindow>>,
) -> Result {
    if resized.read().last().is_none() {
        return Ok(());
    }
    let (Some(mut fields), Some(formats)) = (fields, formats) else {
        return Ok(());
    };
    let viewport = window_viewport(windows.single()?);
    if viewport == fields.viewport || viewport.x == 0 || viewport.y == 0 {
        return Ok(());
    }

    let support = *fields.pool.support();
    let next = FieldImages::allocate(
        &mut images,
        support,
        &formats,
        &config,
        viewport,
        fields.generation + 1,
    )?;
    fields.release(&mut images);
    *fields = next;
    Ok(())
}

// Render world systems

pub fn sync_gpu_field_pool(fields: Option<Res<FieldImages>>, mut gpu: ResMut<GpuFieldPool>) {
    let Some(fields) = fields else {
        return;
    };
    if gpu.generation == Some(fields.generation) {
        return;
    }
    gpu.pool = Some(fields.pool.clone());
    gpu.display = Some((fields.display.clone(), fields.viewport));
    gpu.generation = Some(fields.generation);
    debug!("render world picked up field generation {}", fields.generation);
}

// =====================================================================

// Plugin

pub struct GpuFluidPlugin;

impl Plugin for GpuFluidPlugin {
    fn build(&self, app: &mut App) {
        // App
        app.init_resource::<SimulationConfig>()
            .init_resource::<SimulationControl>()
            .init_resource::<PointerState>()
            .init_resource::<FrameInjections>()
            .add_plugins((
                ExtractResourcePlugin::<SimulationConfig>::default(),
                ExtractResourcePlugin::<SimulationControl>::default(),
                ExtractResourcePlugin::<FrameInjections>::default(),
                ExtractResourcePlugin::<FieldFormats>::default(),
                ExtractResourcePlugin::<FieldImages>::default(),
            ))
            .add_systems(Startup, (setup_fields, spawn_presenter).chain())
            .add_systems(
                Update,
                (
                    (capture_pointer, queue_injections).chain(),
                    (resize_fields, sync_presenter).chain(),
                ),
            );

        // Render
        let Some(render_app) = app.get_sub_app_mut(RenderApp) else {
            return;
        };
        render_app.init_resource::<GpuFieldPool>().add_systems(
            Render,
            (
                (sync_gpu_field_pool, prepare_fluid_pipelines).in_set(RenderSet::Prepare),
                prepare_solver_passes.in_set(RenderSet::PrepareBindGroups),
            ),
        );

        add_solver_node_to_graph(render_app);
    }

    fn finish(&self, app: &mut App) {
        let support = match app
            .get_sub_app(RenderApp)
            .and_then(|render_app| render_app.world().get_resource::<RenderAdapter>())
        {
            Some(adapter) => adapter_support(adapter),
            None => {
                warn!("no render adapter found, assuming every field format is available");
                FormatSupport::all()
            }
        };
        app.insert_resource(RuntimeFormatSupport(support));
    }
}
