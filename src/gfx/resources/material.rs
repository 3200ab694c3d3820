//! Material style table
//!
//! A fixed catalogue mapping each [`MaterialStyle`] to the shading parameters
//! the code object is drawn with, plus the GPU-side uniform layout and bind
//! group that carry those parameters and the code texture to the shader.

use wgpu::Device;

use crate::wgpu_utils::{binding_types, uniform_buffer::UniformBuffer};

/// Visual styles the code object can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaterialStyle {
    #[default]
    Normal,
    Hologram,
    Neon,
    Glass,
    Metal,
    Paper,
    Wood,
    Plastic,
}

impl MaterialStyle {
    pub const ALL: [MaterialStyle; 8] = [
        MaterialStyle::Normal,
        MaterialStyle::Hologram,
        MaterialStyle::Neon,
        MaterialStyle::Glass,
        MaterialStyle::Metal,
        MaterialStyle::Paper,
        MaterialStyle::Wood,
        MaterialStyle::Plastic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MaterialStyle::Normal => "normal",
            MaterialStyle::Hologram => "hologram",
            MaterialStyle::Neon => "neon",
            MaterialStyle::Glass => "glass",
            MaterialStyle::Metal => "metal",
            MaterialStyle::Paper => "paper",
            MaterialStyle::Wood => "wood",
            MaterialStyle::Plastic => "plastic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|style| style.name().eq_ignore_ascii_case(name))
    }

    /// Shading parameters for this style.
    pub fn parameters(self) -> MaterialParams {
        parameters(self)
    }
}

/// Shading parameters of one style.
///
/// Colours are linear RGB in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialParams {
    pub opacity: f32,
    pub emissive_color: [f32; 3],
    pub emissive_intensity: f32,
    pub roughness: f32,
    pub metalness: f32,
    pub clearcoat: f32,
    pub tint_color: [f32; 3],
    pub double_sided: bool,
}

impl MaterialParams {
    pub fn is_transparent(&self) -> bool {
        self.opacity < 1.0
    }
}

const fn rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

const BASE: MaterialParams = MaterialParams {
    opacity: 1.0,
    emissive_color: [0.0, 0.0, 0.0],
    emissive_intensity: 0.0,
    roughness: 0.5,
    metalness: 0.0,
    clearcoat: 0.0,
    tint_color: [1.0, 1.0, 1.0],
    double_sided: true,
};

/// Indexed in the same order as [`MaterialStyle::ALL`].
const STYLE_TABLE: [MaterialParams; 8] = [
    // Normal
    BASE,
    // Hologram
    MaterialParams {
        opacity: 0.8,
        emissive_color: rgb(0x00ffff),
        emissive_intensity: 0.5,
        roughness: 0.2,
        metalness: 0.8,
        tint_color: rgb(0x88ffff),
        ..BASE
    },
    // Neon
    MaterialParams {
        emissive_color: rgb(0x00ff00),
        emissive_intensity: 1.0,
        roughness: 0.3,
        tint_color: rgb(0xaaffaa),
        ..BASE
    },
    // Glass
    MaterialParams {
        opacity: 0.7,
        roughness: 0.05,
        clearcoat: 1.0,
        tint_color: rgb(0xe0f4ff),
        ..BASE
    },
    // Metal
    MaterialParams {
        roughness: 0.2,
        metalness: 0.9,
        tint_color: rgb(0xd0d0d8),
        ..BASE
    },
    // Paper
    MaterialParams {
        roughness: 0.9,
        metalness: 0.0,
        tint_color: rgb(0xf5f0e6),
        ..BASE
    },
    // Wood
    MaterialParams {
        roughness: 0.8,
        metalness: 0.1,
        tint_color: rgb(0x8b5a2b),
        ..BASE
    },
    // Plastic
    MaterialParams {
        roughness: 0.4,
        clearcoat: 0.3,
        ..BASE
    },
];

/// Pure lookup of the shading parameters for `style`.
pub fn parameters(style: MaterialStyle) -> MaterialParams {
    STYLE_TABLE[style as usize]
}

/// GPU uniform data for the code material. Must match `MaterialUniform` in
/// `code.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// rgb tint, a = opacity
    pub tint: [f32; 4],
    /// rgb emissive colour, a = emissive intensity
    pub emissive: [f32; 4],
    pub roughness: f32,
    pub metalness: f32,
    pub clearcoat: f32,
    _padding: f32,
}

impl From<&MaterialParams> for MaterialUniform {
    fn from(params: &MaterialParams) -> Self {
        let [r, g, b] = params.tint_color;
        let [er, eg, eb] = params.emissive_color;
        Self {
            tint: [r, g, b, params.opacity],
            emissive: [er, eg, eb, params.emissive_intensity],
            roughness: params.roughness,
            metalness: params.metalness,
            clearcoat: params.clearcoat,
            _padding: 0.0,
        }
    }
}

type MaterialUBO = UniformBuffer<MaterialUniform>;

/// Bind group for the code object: material uniform, code texture, sampler.
pub struct MaterialBindings {
    layout: wgpu::BindGroupLayout,
    ubo: MaterialUBO,
    bind_group: Option<wgpu::BindGroup>,
}

impl MaterialBindings {
    pub fn new(device: &Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Bind Group Layout"),
            entries: &[
                binding_types::entry(0, wgpu::ShaderStages::FRAGMENT, binding_types::uniform()),
                binding_types::entry(1, wgpu::ShaderStages::FRAGMENT, binding_types::texture_2d()),
                binding_types::entry(
                    2,
                    wgpu::ShaderStages::FRAGMENT,
                    binding_types::sampler(wgpu::SamplerBindingType::Filtering),
                ),
            ],
        });

        Self {
            layout,
            ubo: MaterialUBO::new(device),
            bind_group: None,
        }
    }

    /// Rebuilds the bind group around a new texture view.
    pub fn bind_texture(
        &mut self,
        device: &Device,
        view: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) {
        self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Material Bind Group"),
            layout: &self.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.ubo.binding_resource(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        }));
    }

    /// Uploads the parameters; skipped when nothing changed.
    pub fn update(&mut self, queue: &wgpu::Queue, params: &MaterialParams) {
        self.ubo.update_content(queue, MaterialUniform::from(params));
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.bind_group.as_ref()
    }

    pub fn clear(&mut self) {
        self.bind_group = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_style_is_double_sided() {
        for style in MaterialStyle::ALL {
            assert!(parameters(style).double_sided, "{}", style.name());
        }
    }

    #[test]
    fn transparent_styles() {
        for style in MaterialStyle::ALL {
            let params = parameters(style);
            match style {
                MaterialStyle::Hologram | MaterialStyle::Glass => {
                    assert!((0.7..=0.8).contains(&params.opacity));
                    assert!(params.is_transparent());
                }
                _ => assert_eq!(params.opacity, 1.0),
            }
        }
    }

    #[test]
    fn glowing_styles() {
        let hologram = parameters(MaterialStyle::Hologram);
        assert_eq!(hologram.emissive_color, [0.0, 1.0, 1.0]);
        assert!(hologram.emissive_intensity > 0.0);

        let neon = parameters(MaterialStyle::Neon);
        assert_eq!(neon.emissive_color, [0.0, 1.0, 0.0]);
        assert!(neon.emissive_intensity > 0.0);

        assert_eq!(parameters(MaterialStyle::Paper).emissive_intensity, 0.0);
    }

    #[test]
    fn surface_response() {
        let metal = parameters(MaterialStyle::Metal);
        assert!(metal.metalness > 0.8 && metal.roughness < 0.3);

        let paper = parameters(MaterialStyle::Paper);
        assert_eq!(paper.metalness, 0.0);
        assert!(paper.roughness > 0.8);

        let wood = parameters(MaterialStyle::Wood);
        assert!(wood.metalness < 0.2);
        assert!(wood.tint_color[0] > wood.tint_color[2]);

        let plastic = parameters(MaterialStyle::Plastic);
        assert!(plastic.clearcoat > 0.0 && plastic.clearcoat < 0.5);
    }

    #[test]
    fn uniform_packs_opacity_and_intensity() {
        let uniform = MaterialUniform::from(&parameters(MaterialStyle::Hologram));
        assert_eq!(uniform.tint[3], 0.8);
        assert_eq!(uniform.emissive[3], 0.5);
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
    }

    #[test]
    fn style_names_round_trip() {
        for style in MaterialStyle::ALL {
            assert_eq!(MaterialStyle::from_name(style.name()), Some(style));
        }
    }
}
