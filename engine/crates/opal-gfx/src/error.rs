use ash::vk;

/// GFX 层的失败类别
///
/// 只有原生对象获取会失败；绑定层面的校验失败通过 bool 返回值传递。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfxError {
    RenderPassCreation(vk::Result),
    FramebufferCreation(vk::Result),
}

impl std::fmt::Display for GfxError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GfxError::RenderPassCreation(result) => write!(f, "failed to create render pass: {result:?}"),
            GfxError::FramebufferCreation(result) => write!(f, "failed to create framebuffer: {result:?}"),
        }
    }
}

impl std::error::Error for GfxError {}
