//! Per-frame and per-object uniform bindings
//!
//! Three bind groups are shared by the pipelines:
//!
//! - [`GlobalBindings`]: camera, light rig and shadow parameters (group 0)
//! - [`ShadowBindings`]: the shadow map and its comparison sampler, read by
//!   the ground plane only
//! - [`ObjectBindings`]: model and normal matrices of the code card

use crate::{
    gfx::scene::SceneDescription,
    wgpu_utils::{binding_types, UniformBuffer},
};

use super::texture_resource::TextureResource;

/// Global uniform buffer content.
/// MUST match `Globals` in the shaders exactly.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    /// xyz = direction toward the key light, w = intensity
    pub key_direction: [f32; 4],
    pub key_color: [f32; 4],
    /// xyz = direction toward the fill light, w = intensity
    pub fill_direction: [f32; 4],
    pub fill_color: [f32; 4],
    /// rgb = ambient colour, a = intensity
    pub ambient: [f32; 4],
    /// x = shadows enabled, y = shadow opacity, z = shadow map texel size
    pub shadow_params: [f32; 4],
    pub grid_color: [f32; 4],
}
// 16 + 64 + 64 + 7 * 16 = 256 bytes

impl GlobalUniform {
    pub fn from_scene(scene: &SceneDescription) -> Self {
        let rig = &scene.lights;
        let key = rig.key.direction();
        let fill = rig.fill.direction();
        let [ar, ag, ab] = rig.ambient_color;
        let opacity = scene.ground.map(|g| g.shadow_opacity).unwrap_or(0.0);

        Self {
            view_position: scene.camera.view_position,
            view_proj: scene.camera.view_proj,
            light_view_proj: scene.light_view_proj,
            key_direction: [key[0], key[1], key[2], rig.key.intensity],
            key_color: with_w(rig.key.color, 1.0),
            fill_direction: [fill[0], fill[1], fill[2], rig.fill.intensity],
            fill_color: with_w(rig.fill.color, 1.0),
            ambient: [ar, ag, ab, rig.ambient_intensity],
            shadow_params: [
                if scene.shadows { 1.0 } else { 0.0 },
                opacity,
                1.0 / scene.shadow_map_size.max(1) as f32,
                0.0,
            ],
            grid_color: scene
                .grid
                .map(|grid| with_w(grid.color, 1.0))
                .unwrap_or([0.0; 4]),
        }
    }
}

fn with_w(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

pub type GlobalUBO = UniformBuffer<GlobalUniform>;

/// Group 0 of every pipeline.
pub struct GlobalBindings {
    layout: wgpu::BindGroupLayout,
    ubo: GlobalUBO,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Globals Bind Group Layout"),
            entries: &[binding_types::entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                binding_types::uniform(),
            )],
        });
        let ubo = GlobalUBO::new(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Global Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }],
        });

        Self {
            layout,
            ubo,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, scene: &SceneDescription) {
        self.ubo.update_content(queue, GlobalUniform::from_scene(scene));
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn buffer_size(&self) -> u64 {
        self.ubo.size()
    }
}

/// Shadow map plus comparison sampler. The group is rebuilt whenever the
/// map is reallocated at a different resolution.
pub struct ShadowBindings {
    layout: wgpu::BindGroupLayout,
    map: TextureResource,
    bind_group: wgpu::BindGroup,
}

impl ShadowBindings {
    pub fn new(device: &wgpu::Device, size: u32) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Bind Group Layout"),
            entries: &[
                binding_types::entry(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                    binding_types::depth_texture_2d(),
                ),
                binding_types::entry(
                    1,
                    wgpu::ShaderStages::FRAGMENT,
                    binding_types::sampler(wgpu::SamplerBindingType::Comparison),
                ),
            ],
        });
        let map = TextureResource::create_shadow_map(device, size);
        let bind_group = Self::create_bind_group(device, &layout, &map);

        Self {
            layout,
            map,
            bind_group,
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        map: &TextureResource,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&map.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&map.sampler),
                },
            ],
        })
    }

    /// Reallocates the map when `size` differs. Returns whether it did.
    pub fn ensure_size(&mut self, device: &wgpu::Device, size: u32) -> bool {
        if self.size() == size {
            return false;
        }
        log::debug!("shadow map resized {} -> {size}", self.size());
        self.map = TextureResource::create_shadow_map(device, size);
        self.bind_group = Self::create_bind_group(device, &self.layout, &self.map);
        true
    }

    pub fn size(&self) -> u32 {
        self.map.texture.width()
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.map.view
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn byte_size(&self) -> u64 {
        self.map.byte_size()
    }
}

/// MUST match `Object` in the shaders.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
}

pub struct ObjectBindings {
    layout: wgpu::BindGroupLayout,
    ubo: UniformBuffer<ObjectUniform>,
    bind_group: wgpu::BindGroup,
}

impl ObjectBindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Bind Group Layout"),
            entries: &[binding_types::entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                binding_types::uniform(),
            )],
        });
        let ubo = UniformBuffer::<ObjectUniform>::new(device);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Object Bind Group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: ubo.binding_resource(),
            }],
        });

        Self {
            layout,
            ubo,
            bind_group,
        }
    }

    pub fn update(&mut self, queue: &wgpu::Queue, scene: &SceneDescription) {
        self.ubo.update_content(
            queue,
            ObjectUniform {
                model: scene.model,
                normal_matrix: scene.normal_matrix,
            },
        );
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn buffer_size(&self) -> u64 {
        self.ubo.size()
    }
}
