use ash::vk;

/// Image view 的描述
///
/// 不持有 vk 对象，仅描述 view 相对于所属 image 的解释方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageViewDesc {
    /// format 可以基于 vk::Image 重解释
    pub format: vk::Format,
    /// view type 可以基于 vk::Image 重解释
    pub view_type: vk::ImageViewType,
    /// aspect 可以基于 vk::Image 重解释
    pub aspect_mask: vk::ImageAspectFlags,
    /// base mip level 和 mip level count
    pub mip: (u8, u8),
    /// base layer 和 layer count
    pub layer: (u8, u8),
}
impl GfxImageViewDesc {
    pub fn new_2d(format: vk::Format, aspect: vk::ImageAspectFlags) -> Self {
        Self {
            format,
            view_type: vk::ImageViewType::TYPE_2D,
            aspect_mask: aspect,
            mip: (0, 1),
            layer: (0, 1),
        }
    }

    /// 创建完整的视图描述
    ///
    /// # 参数
    /// - `format`: 图像格式（可重解释）
    /// - `view_type`: 视图类型（2D, 3D, Cube, Array 等）
    /// - `aspect_mask`: 图像 aspect（COLOR, DEPTH, STENCIL）
    /// - `mip_range`: (base_mip_level, level_count)
    /// - `layer_range`: (base_array_layer, layer_count)
    pub fn new(
        format: vk::Format,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
        mip_range: (u8, u8),
        layer_range: (u8, u8),
    ) -> Self {
        Self {
            format,
            view_type,
            aspect_mask,
            mip: mip_range,
            layer: layer_range,
        }
    }

    /// 转换为 vk 的 subresource range
    #[inline]
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask,
            base_mip_level: self.mip.0 as u32,
            level_count: self.mip.1 as u32,
            base_array_layer: self.layer.0 as u32,
            layer_count: self.layer.1 as u32,
        }
    }
}

/// 对外部所有的 image view 的共享引用
///
/// 不负责创建和销毁 vk::ImageView；持有它的容器（例如 SRG 的绑定数组）
/// 不延长底层资源在 GPU 上的生命周期。身份由 vk::ImageView handle 决定。
pub struct GfxImageView {
    handle: vk::ImageView,
    /// view 所属的 image，用于 barrier 覆盖判断
    image: vk::Image,

    desc: GfxImageViewDesc,

    /// 所属 image 的 usage，绑定校验依据
    image_usage: vk::ImageUsageFlags,

    /// bindless 全局描述符表中的只读索引（SRV）
    bindless_srv: Option<u32>,
    /// bindless 全局描述符表中的读写索引（UAV）
    bindless_uav: Option<u32>,

    name: String,
}
// new & init
impl GfxImageView {
    pub fn from_handle(handle: vk::ImageView, image: vk::Image, desc: GfxImageViewDesc, name: impl AsRef<str>) -> Self {
        Self {
            handle,
            image,
            desc,
            image_usage: vk::ImageUsageFlags::SAMPLED,
            bindless_srv: None,
            bindless_uav: None,
            name: name.as_ref().to_string(),
        }
    }

    /// builder
    pub fn with_image_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.image_usage = usage;
        self
    }

    /// builder
    pub fn with_bindless_indices(mut self, srv: Option<u32>, uav: Option<u32>) -> Self {
        self.bindless_srv = srv;
        self.bindless_uav = uav;
        self
    }
}
// getters
impl GfxImageView {
    #[inline]
    pub fn handle(&self) -> vk::ImageView {
        self.handle
    }
    #[inline]
    pub fn image(&self) -> vk::Image {
        self.image
    }
    #[inline]
    pub fn desc(&self) -> &GfxImageViewDesc {
        &self.desc
    }
    #[inline]
    pub fn image_usage(&self) -> vk::ImageUsageFlags {
        self.image_usage
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// bindless 只读索引；未注册时为 None
    #[inline]
    pub fn bindless_read_index(&self) -> Option<u32> {
        self.bindless_srv
    }
    /// bindless 读写索引；未注册时为 None
    #[inline]
    pub fn bindless_read_write_index(&self) -> Option<u32> {
        self.bindless_uav
    }
}
impl std::fmt::Display for GfxImageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ImageView({}, {:?})", self.name, self.handle)
    }
}
