use ash::vk;

use crate::resources::image_view::GfxImageView;

/// barrier 使用的 src 和 dst 访问 mask
#[derive(Copy, Clone, Debug)]
pub struct GfxBarrierMask {
    pub src_stage: vk::PipelineStageFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_access: vk::AccessFlags2,
}

/// 便捷创建 image memory barrier 的结构体
#[derive(Copy, Clone)]
pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl Default for GfxImageBarrier {
    fn default() -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                old_layout: vk::ImageLayout::UNDEFINED,
                new_layout: vk::ImageLayout::UNDEFINED,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::empty(),
                    base_array_layer: 0,
                    layer_count: 1,
                    base_mip_level: 0,
                    level_count: 1,
                },
                ..Default::default()
            },
        }
    }
}

impl GfxImageBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'_> {
        &self.inner
    }

    /// builder
    #[inline]
    pub fn queue_family_transfer(mut self, src_queue_family_index: u32, dst_queue_family_index: u32) -> Self {
        self.inner.src_queue_family_index = src_queue_family_index;
        self.inner.dst_queue_family_index = dst_queue_family_index;
        self
    }

    /// builder
    #[inline]
    pub fn layout_transfer(mut self, old_layout: vk::ImageLayout, new_layout: vk::ImageLayout) -> Self {
        self.inner.old_layout = old_layout;
        self.inner.new_layout = new_layout;
        self
    }

    /// builder
    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = src_stage_mask;
        self.inner.src_access_mask = src_access_mask;
        self
    }

    /// builder
    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = dst_stage_mask;
        self.inner.dst_access_mask = dst_access_mask;
        self
    }

    /// builder
    /// layer 和 miplevel 都使用默认值
    #[inline]
    pub fn image_aspect_flag(mut self, aspect_mask: vk::ImageAspectFlags) -> Self {
        self.inner.subresource_range.aspect_mask = aspect_mask;
        self
    }

    /// builder
    #[inline]
    pub fn subresource_range(mut self, range: vk::ImageSubresourceRange) -> Self {
        self.inner.subresource_range = range;
        self
    }

    /// builder
    #[inline]
    pub fn image(mut self, image: vk::Image) -> Self {
        self.inner.image = image;
        self
    }

    #[inline]
    pub fn old_layout(&self) -> vk::ImageLayout {
        self.inner.old_layout
    }

    #[inline]
    pub fn new_layout(&self) -> vk::ImageLayout {
        self.inner.new_layout
    }

    /// barrier 的作用范围是否完整覆盖给定 view 的全部 subresource
    ///
    /// 只有完整覆盖的 barrier 才能决定 render pass 层面的 layout 转换；
    /// 部分覆盖的 barrier 由外层的资源屏障系统处理。
    pub fn covers(&self, view: &GfxImageView) -> bool {
        if self.inner.image != view.image() {
            return false;
        }

        let range = &self.inner.subresource_range;
        let view_range = view.desc().subresource_range();

        if !range.aspect_mask.contains(view_range.aspect_mask) {
            return false;
        }

        let mip_end = |r: &vk::ImageSubresourceRange| {
            if r.level_count == vk::REMAINING_MIP_LEVELS {
                u32::MAX
            } else {
                r.base_mip_level + r.level_count
            }
        };
        let layer_end = |r: &vk::ImageSubresourceRange| {
            if r.layer_count == vk::REMAINING_ARRAY_LAYERS {
                u32::MAX
            } else {
                r.base_array_layer + r.layer_count
            }
        };

        range.base_mip_level <= view_range.base_mip_level
            && mip_end(range) >= mip_end(&view_range)
            && range.base_array_layer <= view_range.base_array_layer
            && layer_end(range) >= layer_end(&view_range)
    }
}

#[derive(Copy, Clone)]
pub struct GfxBufferBarrier {
    inner: vk::BufferMemoryBarrier2<'static>,
}

impl Default for GfxBufferBarrier {
    fn default() -> Self {
        Self {
            inner: vk::BufferMemoryBarrier2 {
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                ..Default::default()
            },
        }
    }
}

impl GfxBufferBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::BufferMemoryBarrier2<'_> {
        &self.inner
    }

    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = src_stage_mask;
        self.inner.src_access_mask = src_access_mask;
        self
    }

    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = dst_stage_mask;
        self.inner.dst_access_mask = dst_access_mask;
        self
    }

    #[inline]
    pub fn mask(mut self, mask: GfxBarrierMask) -> Self {
        self.inner.src_stage_mask = mask.src_stage;
        self.inner.dst_stage_mask = mask.dst_stage;
        self.inner.src_access_mask = mask.src_access;
        self.inner.dst_access_mask = mask.dst_access;
        self
    }

    #[inline]
    pub fn buffer(mut self, buffer: vk::Buffer, offset: vk::DeviceSize, size: vk::DeviceSize) -> Self {
        self.inner.buffer = buffer;
        self.inner.offset = offset;
        self.inner.size = size;
        self
    }
}

/// 全局 memory barrier
#[derive(Copy, Clone, Default)]
pub struct GfxMemoryBarrier {
    inner: vk::MemoryBarrier2<'static>,
}

impl GfxMemoryBarrier {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn inner(&self) -> &vk::MemoryBarrier2<'_> {
        &self.inner
    }

    #[inline]
    pub fn src_mask(mut self, src_stage_mask: vk::PipelineStageFlags2, src_access_mask: vk::AccessFlags2) -> Self {
        self.inner.src_stage_mask = src_stage_mask;
        self.inner.src_access_mask = src_access_mask;
        self
    }

    #[inline]
    pub fn dst_mask(mut self, dst_stage_mask: vk::PipelineStageFlags2, dst_access_mask: vk::AccessFlags2) -> Self {
        self.inner.dst_stage_mask = dst_stage_mask;
        self.inner.dst_access_mask = dst_access_mask;
        self
    }
}

/// scope 前后生效的 barrier，按资源类别区分
#[derive(Copy, Clone)]
pub enum GfxBarrier {
    Image(GfxImageBarrier),
    Buffer(GfxBufferBarrier),
    Memory(GfxMemoryBarrier),
}

impl GfxBarrier {
    /// 提取 barrier 的 stage / access mask，与具体类别无关
    pub fn barrier_mask(&self) -> GfxBarrierMask {
        match self {
            GfxBarrier::Image(b) => GfxBarrierMask {
                src_stage: b.inner.src_stage_mask,
                dst_stage: b.inner.dst_stage_mask,
                src_access: b.inner.src_access_mask,
                dst_access: b.inner.dst_access_mask,
            },
            GfxBarrier::Buffer(b) => GfxBarrierMask {
                src_stage: b.inner.src_stage_mask,
                dst_stage: b.inner.dst_stage_mask,
                src_access: b.inner.src_access_mask,
                dst_access: b.inner.dst_access_mask,
            },
            GfxBarrier::Memory(b) => GfxBarrierMask {
                src_stage: b.inner.src_stage_mask,
                dst_stage: b.inner.dst_stage_mask,
                src_access: b.inner.src_access_mask,
                dst_access: b.inner.dst_access_mask,
            },
        }
    }
}
