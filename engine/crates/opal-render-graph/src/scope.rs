//! scope：frame graph 中的一个渲染节点
//!
//! scope 声明自己使用哪些附件、以什么方式使用，以及进出 scope 时
//! 生效的 barrier。render pass 构建时一个 scope 对应一个 subpass。

use std::sync::Arc;

use ash::vk;
use opal_gfx::commands::barrier::GfxBarrier;
use opal_gfx::render_pass::AttachmentLoadStoreAction;
use opal_gfx::resources::image_view::GfxImageView;

use crate::attachment::AttachmentHandle;

/// scope 对一个附件的使用方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeAttachmentUsage {
    Resolve,
    RenderTarget,
    DepthStencil,
    SubpassInput,
    /// 普通 shader 读写，不进入 renderpass 附件系统
    Shader,
    /// copy 源 / 目标，不进入 renderpass 附件系统
    Copy,
}
impl ScopeAttachmentUsage {
    /// 附件声明顺序的优先级，小者在前
    ///
    /// 与 pipeline state 声明 renderpass 兼容布局时的顺序一致；
    /// 不一致会导致 attachment index 错位，绑定静默出错。
    #[inline]
    pub fn priority(&self) -> u32 {
        match self {
            ScopeAttachmentUsage::Resolve => 0,
            ScopeAttachmentUsage::RenderTarget => 1,
            ScopeAttachmentUsage::DepthStencil => 2,
            ScopeAttachmentUsage::SubpassInput => 4,
            ScopeAttachmentUsage::Shader => 8,
            ScopeAttachmentUsage::Copy => 16,
        }
    }

    /// 是否参与 renderpass 附件系统
    ///
    /// Shader / Copy 走普通的资源绑定和 barrier，不产生附件声明
    #[inline]
    pub fn is_render_pass_usage(&self) -> bool {
        matches!(
            self,
            ScopeAttachmentUsage::Resolve
                | ScopeAttachmentUsage::RenderTarget
                | ScopeAttachmentUsage::DepthStencil
                | ScopeAttachmentUsage::SubpassInput
        )
    }

    /// 该 usage 在 subpass 内的自然 layout
    ///
    /// 没有 barrier 给出更精确的 layout 时作为 initial / final layout 兜底
    pub fn natural_layout(&self) -> vk::ImageLayout {
        match self {
            ScopeAttachmentUsage::Resolve | ScopeAttachmentUsage::RenderTarget => {
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
            }
            ScopeAttachmentUsage::DepthStencil => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            ScopeAttachmentUsage::SubpassInput => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            ScopeAttachmentUsage::Shader => vk::ImageLayout::GENERAL,
            ScopeAttachmentUsage::Copy => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        }
    }
}

/// scope 对一个附件的读写方向
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopeAttachmentAccess {
    Read,
    Write,
    ReadWrite,
}
impl ScopeAttachmentAccess {
    #[inline]
    pub fn writes(&self) -> bool {
        matches!(self, ScopeAttachmentAccess::Write | ScopeAttachmentAccess::ReadWrite)
    }
}

/// scope 对一个 image 附件的一次使用
///
/// 同一个附件可以同时以多种方式使用（比如既是 SubpassInput 又是
/// 其他 usage），每个 usage 在构建时展开为独立的条目。
#[derive(Clone)]
pub struct ImageScopeAttachment {
    pub attachment: AttachmentHandle,
    pub image_view: Arc<GfxImageView>,
    pub usages: Vec<ScopeAttachmentUsage>,
    pub load_store: AttachmentLoadStoreAction,
    pub clear_value: vk::ClearValue,
    /// usage 含 Resolve 时有效：本附件承接哪个 MSAA render target 的 resolve
    pub resolves_from: Option<AttachmentHandle>,
}
impl ImageScopeAttachment {
    pub fn new(attachment: AttachmentHandle, image_view: Arc<GfxImageView>, usage: ScopeAttachmentUsage) -> Self {
        Self {
            attachment,
            image_view,
            usages: vec![usage],
            load_store: AttachmentLoadStoreAction::default(),
            clear_value: vk::ClearValue::default(),
            resolves_from: None,
        }
    }

    /// builder
    pub fn with_usage(mut self, usage: ScopeAttachmentUsage) -> Self {
        self.usages.push(usage);
        self
    }

    /// builder
    pub fn with_load_store(mut self, load_store: AttachmentLoadStoreAction) -> Self {
        self.load_store = load_store;
        self
    }

    /// builder
    pub fn with_clear_value(mut self, clear_value: vk::ClearValue) -> Self {
        self.clear_value = clear_value;
        self
    }

    /// builder
    pub fn with_resolves_from(mut self, source: AttachmentHandle) -> Self {
        self.resolves_from = Some(source);
        self
    }
}

/// scope 对一个 buffer 附件的一次使用
///
/// buffer 不产生 renderpass 附件声明，只参与 subpass 间的依赖跟踪。
#[derive(Clone)]
pub struct BufferScopeAttachment {
    pub attachment: AttachmentHandle,
    pub buffer: vk::Buffer,
    pub access: ScopeAttachmentAccess,
}
impl BufferScopeAttachment {
    pub fn new(attachment: AttachmentHandle, buffer: vk::Buffer, access: ScopeAttachmentAccess) -> Self {
        Self {
            attachment,
            buffer,
            access,
        }
    }
}

/// 一个渲染 scope 的完整声明
pub struct Scope {
    name: String,

    image_attachments: Vec<ImageScopeAttachment>,
    buffer_attachments: Vec<BufferScopeAttachment>,

    /// 进入 scope 前生效的 barrier，initial layout 推断的依据
    prologue_barriers: Vec<GfxBarrier>,
    /// 离开 scope 后生效的 barrier，final layout 推断的依据
    epilogue_barriers: Vec<GfxBarrier>,
}
// new & init
impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image_attachments: Vec::new(),
            buffer_attachments: Vec::new(),
            prologue_barriers: Vec::new(),
            epilogue_barriers: Vec::new(),
        }
    }

    pub fn add_image_attachment(&mut self, attachment: ImageScopeAttachment) {
        self.image_attachments.push(attachment);
    }

    pub fn add_buffer_attachment(&mut self, attachment: BufferScopeAttachment) {
        self.buffer_attachments.push(attachment);
    }

    pub fn add_prologue_barrier(&mut self, barrier: GfxBarrier) {
        self.prologue_barriers.push(barrier);
    }

    pub fn add_epilogue_barrier(&mut self, barrier: GfxBarrier) {
        self.epilogue_barriers.push(barrier);
    }
}
// getters
impl Scope {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
    #[inline]
    pub fn image_attachments(&self) -> &[ImageScopeAttachment] {
        &self.image_attachments
    }
    #[inline]
    pub fn buffer_attachments(&self) -> &[BufferScopeAttachment] {
        &self.buffer_attachments
    }
    #[inline]
    pub fn prologue_barriers(&self) -> &[GfxBarrier] {
        &self.prologue_barriers
    }
    #[inline]
    pub fn epilogue_barriers(&self) -> &[GfxBarrier] {
        &self.epilogue_barriers
    }
}
impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Scope({}, {} images, {} buffers)", self.name, self.image_attachments.len(), self.buffer_attachments.len())
    }
}
