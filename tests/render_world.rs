use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use bevy_stable_fluids::format::{FieldDescriptor, FieldName, FormatSupport};
use bevy_stable_fluids::gpu::buffers::{FieldImages, GpuFieldPool, sync_gpu_field_pool};
use bevy_stable_fluids::gpu::ffi::GpuKernelParams;
use bevy_stable_fluids::gpu::pipeline::{BindKey, BindingCache};
use bevy_stable_fluids::kernel::{Kernel, SplatParams};
use bevy_stable_fluids::pool::FieldPool;

fn image(n: u128) -> AssetId<Image> {
    Handle::<Image>::weak_from_u128(n).id()
}

fn splat_at(x: f32) -> GpuKernelParams {
    GpuKernelParams::from(&Kernel::Splat(SplatParams {
        point: Vec2::new(x, 0.5),
        value: Vec3::ONE,
        radius: 0.01,
        aspect: 1.0,
    }))
}

#[test]
fn pressure_sweeps_build_one_binding_per_parity() {
    let mut cache = BindingCache::<u32>::default();
    let params = GpuKernelParams::from(&Kernel::PressureRelax);
    let divergence = image(3);
    let mut built = 0;

    for _frame in 0..3 {
        for sweep in 0..20 {
            let (read, write) = if sweep % 2 == 0 { (image(1), image(2)) } else { (image(2), image(1)) };
            let key = BindKey::new("pressure", &[read, divergence], write);
            cache.get_or_insert_with(key, params, |_| {
                built += 1;
                built
            });
        }
    }
    assert_eq!(built, 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn changed_parameters_rebuild_the_entry() {
    let mut cache = BindingCache::<u32>::default();
    let key = BindKey::new("splat", &[image(1)], image(2));

    assert_eq!(cache.get_or_insert_with(key, splat_at(0.2), |_| 1), 1);
    assert_eq!(cache.get_or_insert_with(key, splat_at(0.2), |_| 2), 1);
    assert_eq!(cache.get_or_insert_with(key, splat_at(0.7), |_| 3), 3);
    assert_eq!(cache.len(), 1);
}

#[test]
fn new_field_generation_drops_every_entry() {
    let mut cache = BindingCache::<u32>::default();
    let key = BindKey::new("curl", &[image(1)], image(4));
    let params = GpuKernelParams::from(&Kernel::Curl);

    cache.sync_generation(Some(0));
    cache.get_or_insert_with(key, params, |_| 1);
    cache.sync_generation(Some(0));
    assert_eq!(cache.len(), 1);

    cache.sync_generation(Some(1));
    assert!(cache.is_empty());
    assert_eq!(cache.get_or_insert_with(key, params, |_| 2), 2);
}

fn field_images(generation: u32) -> FieldImages {
    let mut pool = FieldPool::new(FormatSupport::all());
    let mut next = 100 * generation as u128;
    for name in FieldName::ALL {
        pool.allocate_with(name, FieldDescriptor::standard(name, UVec2::new(4, 4)), |_| {
            next += 1;
            Handle::weak_from_u128(next)
        })
        .unwrap();
    }
    FieldImages {
        pool,
        display: Handle::weak_from_u128(99),
        viewport: UVec2::new(8, 8),
        generation,
    }
}

fn render_dye(world: &World) -> Handle<Image> {
    let gpu = world.resource::<GpuFieldPool>();
    gpu.pool.as_ref().unwrap().get(FieldName::Dye).unwrap().clone()
}

#[test]
fn render_world_keeps_its_own_read_buffers_until_a_new_generation() {
    let mut world = World::new();
    world.insert_resource(field_images(0));
    world.init_resource::<GpuFieldPool>();
    let main_dye = world.resource::<FieldImages>().pool.get(FieldName::Dye).unwrap().clone();

    world.run_system_once(sync_gpu_field_pool).unwrap();
    assert_eq!(render_dye(&world), main_dye);

    // a recorded frame swaps dye in the render world only
    world
        .resource_mut::<GpuFieldPool>()
        .pool
        .as_mut()
        .unwrap()
        .swap(FieldName::Dye)
        .unwrap();
    world.run_system_once(sync_gpu_field_pool).unwrap();
    let current = render_dye(&world);
    assert_ne!(current, main_dye);
    assert_eq!(world.resource::<FieldImages>().pool.get(FieldName::Dye).unwrap(), &main_dye);

    world.insert_resource(field_images(1));
    world.run_system_once(sync_gpu_field_pool).unwrap();
    assert_eq!(world.resource::<GpuFieldPool>().generation, Some(1));
    assert_eq!(render_dye(&world), *world.resource::<FieldImages>().pool.get(FieldName::Dye).unwrap());
}
