// Presenter on the GPU: a compute pass copies the dye read buffer into the
// viewport sized display image, which a sprite stretches over the window.

use bevy::prelude::*;
use bevy::render::render_asset::RenderAssets;
use bevy::render::render_graph::{Node, NodeRunError, RenderGraphContext, RenderLabel};
use bevy::render::render_resource::PipelineCache;
use bevy::render::renderer::{RenderContext, RenderDevice};
use bevy::render::texture::GpuImage;
use bevy::window::PrimaryWindow;

use crate::error::{FluidError, FluidResult};
use crate::format::FieldName;
use crate::gpu::buffers::FieldImages;
use crate::gpu::ffi::GpuKernelParams;
use crate::gpu::pipeline::{FluidBindGroupCache, FluidPipelines, PreparedPass, SolverPasses, workgroups_for};
use crate::pool::FieldPool;

#[derive(Component)]
pub struct FluidPresenter;

#[derive(Debug, Hash, PartialEq, Eq, Clone, RenderLabel)]
pub struct FluidDisplayLabel;

#[derive(Default)]
pub struct FluidDisplayNode;

impl Node for FluidDisplayNode {
    fn run(
        &self,
        _graph: &mut RenderGraphContext,
        render_context: &mut RenderContext,
        world: &World,
    ) -> Result<(), NodeRunError> {
        let Some(display) = world.get_resource::<SolverPasses>().and_then(|p| p.display.as_ref()) else {
            return Ok(());
        };
        let cache = world.resource::<PipelineCache>();
        display.dispatch(render_context.command_encoder(), cache);
        Ok(())
    }
}

/// Binds the current dye read buffer to the display pipeline. The uniform
/// carries the dye filter mode so upsampling matches how dye is sampled.
pub fn prepare_display_pass(
    pool: &FieldPool<Handle<Image>>,
    display: &Handle<Image>,
    viewport: UVec2,
    pipelines: &FluidPipelines,
    images: &RenderAssets<GpuImage>,
    device: &RenderDevice,
    bind_groups: &mut FluidBindGroupCache,
) -> FluidResult<PreparedPass> {
    let filter = pool.descriptor(FieldName::Dye)?.filter;
    let dye_handle = pool.get(FieldName::Dye)?;
    let dye = images
        .get(dye_handle)
        .ok_or(FluidError::NotResident(FieldName::Dye))?;
    // the display target only exists to show dye
    let target = images.get(display).ok_or(FluidError::NotResident(FieldName::Dye))?;

    let bind_group = bind_groups.get_or_create(
        device,
        "display",
        &pipelines.display.layout,
        &[(dye_handle.id(), &dye.texture_view)],
        (display.id(), &target.texture_view),
        GpuKernelParams::display(filter),
    );

    Ok(PreparedPass {
        label: "display",
        pipeline: pipelines.display.id,
        bind_group,
        workgroups: workgroups_for(viewport),
    })
}

// ======================== main world =================================

pub fn spawn_presenter(
    mut commands: Commands,
    fields: Option<Res<FieldImages>>,
    windows: Query<&Window, With<PrimaryWindow>>,
) {
    let (Some(fields), Ok(window)) = (fields, windows.single()) else {
        warn!("no fluid fields or window at startup, nothing to present");
        return;
    };
    commands.spawn((
        Sprite {
            image: fields.display.clone(),
            custom_size: Some(window.size()),
            ..default()
        },
        FluidPresenter,
    ));
}

/// Points the sprite at the new display image after a resize.
pub fn sync_presenter(
    fields: Option<Res<FieldImages>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut sprites: Query<&mut Sprite, With<FluidPresenter>>,
) {
    let Some(fields) = fields else {
        return;
    };
    if !fields.is_changed() {
        return;
    }
    let Ok(window) = windows.single() else {
        return;
    };
    for mut sprite in &mut sprites {
        sprite.image = fields.display.clone();
        sprite.custom_size = Some(window.size());
    }
}
