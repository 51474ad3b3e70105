use ash::vk;
use std::hash::Hash;

// Sampler descriptor
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct GfxSamplerDesc {
    pub mag_filter: vk::Filter,
    pub min_filter: vk::Filter,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
    pub address_mode_w: vk::SamplerAddressMode,
    pub max_anisotropy: u32,
    pub compare_op: Option<vk::CompareOp>,
    pub mipmap_mode: vk::SamplerMipmapMode,
}
impl Default for GfxSamplerDesc {
    fn default() -> Self {
        Self {
            mag_filter: vk::Filter::LINEAR,
            min_filter: vk::Filter::LINEAR,
            address_mode_u: vk::SamplerAddressMode::REPEAT,
            address_mode_v: vk::SamplerAddressMode::REPEAT,
            address_mode_w: vk::SamplerAddressMode::REPEAT,
            max_anisotropy: 0,
            compare_op: None,
            mipmap_mode: vk::SamplerMipmapMode::LINEAR,
        }
    }
}
impl GfxSamplerDesc {
    /// 最近邻采样，常用于读取整数纹理
    pub fn nearest() -> Self {
        Self {
            mag_filter: vk::Filter::NEAREST,
            min_filter: vk::Filter::NEAREST,
            mipmap_mode: vk::SamplerMipmapMode::NEAREST,
            ..Default::default()
        }
    }

    /// 深度比较采样，用于 shadow map
    pub fn shadow_compare() -> Self {
        Self {
            address_mode_u: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_v: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            address_mode_w: vk::SamplerAddressMode::CLAMP_TO_EDGE,
            compare_op: Some(vk::CompareOp::LESS_OR_EQUAL),
            ..Default::default()
        }
    }
}

/// 从 desc 创建 vk::Sampler
///
/// sampler 本体由外部的资源层持有，这里只负责 create info 的填充。
pub fn build_sampler_create_info(desc: &GfxSamplerDesc) -> vk::SamplerCreateInfo<'static> {
    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(desc.mag_filter)
        .min_filter(desc.min_filter)
        .address_mode_u(desc.address_mode_u)
        .address_mode_v(desc.address_mode_v)
        .address_mode_w(desc.address_mode_w)
        .mipmap_mode(desc.mipmap_mode)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(vk::BorderColor::INT_OPAQUE_BLACK);

    if desc.max_anisotropy > 0 {
        create_info = create_info.anisotropy_enable(true).max_anisotropy(desc.max_anisotropy as f32);
    } else {
        create_info = create_info.anisotropy_enable(false);
    }

    if let Some(compare_op) = desc.compare_op {
        create_info = create_info.compare_enable(true).compare_op(compare_op);
    } else {
        create_info = create_info.compare_enable(false);
    }

    create_info
}
