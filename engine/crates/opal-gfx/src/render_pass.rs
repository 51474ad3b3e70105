//! Render pass / framebuffer 的描述符和原生对象封装
//!
//! 描述符是纯值类型，实现 Eq + Hash，原生对象按描述符相等性做池化复用。
//! clear value 不参与描述符（vk::ClearValue 是 union），由构建方平行维护。

use ash::vk;

use crate::error::GfxError;

/// 附件的 load / store 行为
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentLoadStoreAction {
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
}
impl Default for AttachmentLoadStoreAction {
    fn default() -> Self {
        Self {
            load_op: vk::AttachmentLoadOp::DONT_CARE,
            store_op: vk::AttachmentStoreOp::DONT_CARE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
        }
    }
}
impl AttachmentLoadStoreAction {
    /// clear 后写入，渲染目标最常见的组合
    pub fn clear_store() -> Self {
        Self {
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            ..Default::default()
        }
    }

    /// 保留已有内容并写入
    pub fn load_store() -> Self {
        Self {
            load_op: vk::AttachmentLoadOp::LOAD,
            store_op: vk::AttachmentStoreOp::STORE,
            ..Default::default()
        }
    }
}

/// renderpass 中的一个附件声明
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentBinding {
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_store: AttachmentLoadStoreAction,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
}

/// subpass 对某个附件的引用
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AttachmentRef {
    /// 附件在 [`RenderPassDescriptor::attachments`] 中的下标
    pub attachment: u32,
    /// 此 subpass 使用附件时的 layout
    pub layout: vk::ImageLayout,
}
impl AttachmentRef {
    #[inline]
    fn vk_ref(&self) -> vk::AttachmentReference {
        vk::AttachmentReference {
            attachment: self.attachment,
            layout: self.layout,
        }
    }
}

/// 单个 subpass 的描述
///
/// `resolve_targets` 与 `render_targets` 是平行数组：第 i 个 render target
/// 若有 resolve 目标，则记录在 `resolve_targets[i]`。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SubpassDescriptor {
    pub render_targets: Vec<AttachmentRef>,
    pub resolve_targets: Vec<Option<AttachmentRef>>,
    pub depth_stencil: Option<AttachmentRef>,
    pub subpass_inputs: Vec<AttachmentRef>,
    /// 此 subpass 不触碰、但必须保持内容的附件下标
    pub preserve_attachments: Vec<u32>,
}
impl SubpassDescriptor {
    #[inline]
    pub fn rendertarget_count(&self) -> usize {
        self.render_targets.len()
    }
    #[inline]
    pub fn subpass_input_count(&self) -> usize {
        self.subpass_inputs.len()
    }
}

/// subpass 之间的依赖
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubpassDependencyDesc {
    /// src subpass 下标，或 vk::SUBPASS_EXTERNAL
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: vk::PipelineStageFlags2,
    pub dst_stage_mask: vk::PipelineStageFlags2,
    pub src_access_mask: vk::AccessFlags2,
    pub dst_access_mask: vk::AccessFlags2,
    pub dependency_flags: vk::DependencyFlags,
}

/// renderpass 的完整描述，池化复用的 key
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct RenderPassDescriptor {
    pub attachments: Vec<AttachmentBinding>,
    pub subpasses: Vec<SubpassDescriptor>,
    pub dependencies: Vec<SubpassDependencyDesc>,
}

/// framebuffer 的完整描述，池化复用的 key
///
/// 不变量：第 N 个 image view 对应 renderpass 描述符中的第 N 个附件。
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct FramebufferDescriptor {
    pub attachments: Vec<vk::ImageView>,
    pub extent: vk::Extent2D,
    pub layers: u32,
}

/// sync2 的 stage mask 转为 renderpass dependency 使用的 v1 mask
///
/// 低 32 位的 bit 定义在两个版本之间一致，直接截断；
/// sync2 独有的高位 bit 映射回语义等价的 v1 bit，不能静默丢弃。
fn stage_mask_v1(flags: vk::PipelineStageFlags2) -> vk::PipelineStageFlags {
    let mut v1 = vk::PipelineStageFlags::from_raw(flags.as_raw() as u32);
    if flags.intersects(
        vk::PipelineStageFlags2::COPY
            | vk::PipelineStageFlags2::BLIT
            | vk::PipelineStageFlags2::RESOLVE
            | vk::PipelineStageFlags2::CLEAR,
    ) {
        v1 |= vk::PipelineStageFlags::TRANSFER;
    }
    if flags.intersects(vk::PipelineStageFlags2::INDEX_INPUT | vk::PipelineStageFlags2::VERTEX_ATTRIBUTE_INPUT) {
        v1 |= vk::PipelineStageFlags::VERTEX_INPUT;
    }
    if flags.contains(vk::PipelineStageFlags2::PRE_RASTERIZATION_SHADERS) {
        v1 |= vk::PipelineStageFlags::VERTEX_SHADER
            | vk::PipelineStageFlags::TESSELLATION_CONTROL_SHADER
            | vk::PipelineStageFlags::TESSELLATION_EVALUATION_SHADER
            | vk::PipelineStageFlags::GEOMETRY_SHADER;
    }
    v1
}

/// 语义同 [`stage_mask_v1`]
fn access_mask_v1(flags: vk::AccessFlags2) -> vk::AccessFlags {
    let mut v1 = vk::AccessFlags::from_raw(flags.as_raw() as u32);
    if flags.intersects(vk::AccessFlags2::SHADER_SAMPLED_READ | vk::AccessFlags2::SHADER_STORAGE_READ) {
        v1 |= vk::AccessFlags::SHADER_READ;
    }
    if flags.contains(vk::AccessFlags2::SHADER_STORAGE_WRITE) {
        v1 |= vk::AccessFlags::SHADER_WRITE;
    }
    v1
}

/// 原生 render pass 对象的封装
pub struct GfxRenderPass {
    handle: vk::RenderPass,

    desc: RenderPassDescriptor,

    name: String,
}
// new & init
impl GfxRenderPass {
    /// 按描述符创建原生 render pass
    pub fn new(device: &ash::Device, desc: &RenderPassDescriptor, name: impl AsRef<str>) -> Result<Self, GfxError> {
        let attachments: Vec<vk::AttachmentDescription> = desc
            .attachments
            .iter()
            .map(|binding| vk::AttachmentDescription {
                flags: vk::AttachmentDescriptionFlags::empty(),
                format: binding.format,
                samples: binding.samples,
                load_op: binding.load_store.load_op,
                store_op: binding.load_store.store_op,
                stencil_load_op: binding.load_store.stencil_load_op,
                stencil_store_op: binding.load_store.stencil_store_op,
                initial_layout: binding.initial_layout,
                final_layout: binding.final_layout,
            })
            .collect();

        // vk::SubpassDescription 通过指针引用 attachment reference 数组，
        // 先把所有数组收集到稳定的存储中
        struct SubpassRefs {
            color: Vec<vk::AttachmentReference>,
            resolve: Vec<vk::AttachmentReference>,
            input: Vec<vk::AttachmentReference>,
            depth: Option<vk::AttachmentReference>,
        }
        let ref_storage: Vec<SubpassRefs> = desc
            .subpasses
            .iter()
            .map(|subpass| {
                let color: Vec<_> = subpass.render_targets.iter().map(AttachmentRef::vk_ref).collect();
                // resolve 数组必须与 color 等长，空位用 ATTACHMENT_UNUSED
                let resolve: Vec<_> = if subpass.resolve_targets.iter().any(Option::is_some) {
                    subpass
                        .resolve_targets
                        .iter()
                        .map(|r| {
                            r.as_ref().map(AttachmentRef::vk_ref).unwrap_or(vk::AttachmentReference {
                                attachment: vk::ATTACHMENT_UNUSED,
                                layout: vk::ImageLayout::UNDEFINED,
                            })
                        })
                        .collect()
                } else {
                    Vec::new()
                };
                let input: Vec<_> = subpass.subpass_inputs.iter().map(AttachmentRef::vk_ref).collect();
                let depth = subpass.depth_stencil.as_ref().map(AttachmentRef::vk_ref);
                SubpassRefs {
                    color,
                    resolve,
                    input,
                    depth,
                }
            })
            .collect();

        let subpasses: Vec<vk::SubpassDescription> = ref_storage
            .iter()
            .zip(desc.subpasses.iter())
            .map(|(refs, subpass)| {
                let mut vk_subpass = vk::SubpassDescription::default()
                    .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
                    .color_attachments(&refs.color)
                    .input_attachments(&refs.input)
                    .preserve_attachments(&subpass.preserve_attachments);
                if !refs.resolve.is_empty() {
                    vk_subpass = vk_subpass.resolve_attachments(&refs.resolve);
                }
                if let Some(depth) = &refs.depth {
                    vk_subpass = vk_subpass.depth_stencil_attachment(depth);
                }
                vk_subpass
            })
            .collect();

        let dependencies: Vec<vk::SubpassDependency> = desc
            .dependencies
            .iter()
            .map(|dep| vk::SubpassDependency {
                src_subpass: dep.src_subpass,
                dst_subpass: dep.dst_subpass,
                src_stage_mask: stage_mask_v1(dep.src_stage_mask),
                dst_stage_mask: stage_mask_v1(dep.dst_stage_mask),
                src_access_mask: access_mask_v1(dep.src_access_mask),
                dst_access_mask: access_mask_v1(dep.dst_access_mask),
                dependency_flags: dep.dependency_flags,
            })
            .collect();

        let create_info = vk::RenderPassCreateInfo::default()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let handle = unsafe {
            device.create_render_pass(&create_info, None).map_err(GfxError::RenderPassCreation)?
        };

        Ok(Self {
            handle,
            desc: desc.clone(),
            name: name.as_ref().to_string(),
        })
    }

    /// 从已有 handle 封装，不接管创建
    pub fn from_handle(handle: vk::RenderPass, desc: RenderPassDescriptor, name: impl AsRef<str>) -> Self {
        Self {
            handle,
            desc,
            name: name.as_ref().to_string(),
        }
    }
}
// destroy
impl GfxRenderPass {
    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_render_pass(self.handle, None);
        }
        self.handle = vk::RenderPass::null();
    }
}
// getters
impl GfxRenderPass {
    #[inline]
    pub fn handle(&self) -> vk::RenderPass {
        self.handle
    }
    #[inline]
    pub fn desc(&self) -> &RenderPassDescriptor {
        &self.desc
    }
    #[inline]
    pub fn subpass_count(&self) -> usize {
        self.desc.subpasses.len()
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl std::fmt::Display for GfxRenderPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RenderPass({}, {:?})", self.name, self.handle)
    }
}

/// 原生 framebuffer 对象的封装
pub struct GfxFramebuffer {
    handle: vk::Framebuffer,

    desc: FramebufferDescriptor,

    name: String,
}
// new & init
impl GfxFramebuffer {
    /// 按描述符创建原生 framebuffer，绑定到给定 render pass
    pub fn new(
        device: &ash::Device,
        render_pass: vk::RenderPass,
        desc: &FramebufferDescriptor,
        name: impl AsRef<str>,
    ) -> Result<Self, GfxError> {
        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(&desc.attachments)
            .width(desc.extent.width)
            .height(desc.extent.height)
            .layers(desc.layers.max(1));

        let handle = unsafe {
            device.create_framebuffer(&create_info, None).map_err(GfxError::FramebufferCreation)?
        };

        Ok(Self {
            handle,
            desc: desc.clone(),
            name: name.as_ref().to_string(),
        })
    }

    /// 从已有 handle 封装，不接管创建
    pub fn from_handle(handle: vk::Framebuffer, desc: FramebufferDescriptor, name: impl AsRef<str>) -> Self {
        Self {
            handle,
            desc,
            name: name.as_ref().to_string(),
        }
    }
}
// destroy
impl GfxFramebuffer {
    pub fn destroy(&mut self, device: &ash::Device) {
        unsafe {
            device.destroy_framebuffer(self.handle, None);
        }
        self.handle = vk::Framebuffer::null();
    }
}
// getters
impl GfxFramebuffer {
    #[inline]
    pub fn handle(&self) -> vk::Framebuffer {
        self.handle
    }
    #[inline]
    pub fn desc(&self) -> &FramebufferDescriptor {
        &self.desc
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl std::fmt::Display for GfxFramebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Framebuffer({}, {:?})", self.name, self.handle)
    }
}
