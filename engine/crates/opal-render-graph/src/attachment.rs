//! frame attachment：资源跨整个 frame graph 的持久描述
//!
//! 与 scope attachment 区分：后者是某个 scope 对资源的一次具体使用。

use ash::vk;
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// frame attachment 的稳定句柄，跨 scope 标识同一个物理附件
    pub struct AttachmentHandle;
}

/// 一个 image 附件跨整帧的描述
#[derive(Clone, Debug)]
pub struct FrameAttachment {
    pub name: String,
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
}
impl FrameAttachment {
    pub fn new(name: impl Into<String>, format: vk::Format) -> Self {
        Self {
            name: name.into(),
            format,
            samples: vk::SampleCountFlags::TYPE_1,
        }
    }

    /// builder
    pub fn with_samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }
}

/// frame attachment 注册表
///
/// 句柄在整帧内稳定，render pass 构建按句柄查询格式和采样数。
pub struct AttachmentDatabase {
    attachments: SlotMap<AttachmentHandle, FrameAttachment>,
}
// new & init
impl AttachmentDatabase {
    pub fn new() -> Self {
        Self {
            attachments: SlotMap::with_key(),
        }
    }

    pub fn register(&mut self, attachment: FrameAttachment) -> AttachmentHandle {
        self.attachments.insert(attachment)
    }
}
impl Default for AttachmentDatabase {
    fn default() -> Self {
        Self::new()
    }
}
// getters
impl AttachmentDatabase {
    /// 句柄失效属于调用方错误
    #[inline]
    pub fn get(&self, handle: AttachmentHandle) -> &FrameAttachment {
        &self.attachments[handle]
    }

    #[inline]
    pub fn try_get(&self, handle: AttachmentHandle) -> Option<&FrameAttachment> {
        self.attachments.get(handle)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }
}
