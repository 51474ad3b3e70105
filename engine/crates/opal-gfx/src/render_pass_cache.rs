//! 原生 render pass / framebuffer 的池化获取
//!
//! 按描述符相等性 create-or-reuse；声明式 frame graph 每帧重建描述符，
//! 原生对象在这里跨帧复用。

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GfxError;
use crate::render_pass::{FramebufferDescriptor, GfxFramebuffer, GfxRenderPass, RenderPassDescriptor};

/// 原生对象的创建入口
///
/// 真实后端由 [`VkRenderPassFactory`] 实现；测试可以注入桩实现。
pub trait RenderPassFactory {
    fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> Result<GfxRenderPass, GfxError>;

    fn create_framebuffer(
        &mut self,
        render_pass: &GfxRenderPass,
        desc: &FramebufferDescriptor,
    ) -> Result<GfxFramebuffer, GfxError>;
}

/// ash 设备支持的 factory
pub struct VkRenderPassFactory {
    device: ash::Device,
}
impl VkRenderPassFactory {
    pub fn new(device: ash::Device) -> Self {
        Self { device }
    }
}
impl RenderPassFactory for VkRenderPassFactory {
    fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> Result<GfxRenderPass, GfxError> {
        GfxRenderPass::new(&self.device, desc, "pooled-render-pass")
    }

    fn create_framebuffer(
        &mut self,
        render_pass: &GfxRenderPass,
        desc: &FramebufferDescriptor,
    ) -> Result<GfxFramebuffer, GfxError> {
        GfxFramebuffer::new(&self.device, render_pass.handle(), desc, "pooled-framebuffer")
    }
}

/// 池化缓存
///
/// framebuffer 以自身描述符为 key；调用方保证同一个 framebuffer 描述符
/// 只和互相兼容的 render pass 一起使用。
pub struct GfxRenderPassCache {
    render_passes: HashMap<RenderPassDescriptor, Arc<GfxRenderPass>>,
    framebuffers: HashMap<FramebufferDescriptor, Arc<GfxFramebuffer>>,
}
// new & init
impl GfxRenderPassCache {
    pub fn new() -> Self {
        Self {
            render_passes: HashMap::new(),
            framebuffers: HashMap::new(),
        }
    }
}
impl Default for GfxRenderPassCache {
    fn default() -> Self {
        Self::new()
    }
}
// acquire
impl GfxRenderPassCache {
    /// create-or-reuse 一个 render pass
    pub fn acquire_render_pass<F: RenderPassFactory>(
        &mut self,
        factory: &mut F,
        desc: &RenderPassDescriptor,
    ) -> Result<Arc<GfxRenderPass>, GfxError> {
        if let Some(render_pass) = self.render_passes.get(desc) {
            return Ok(render_pass.clone());
        }

        let render_pass = Arc::new(factory.create_render_pass(desc)?);
        log::info!(
            "render pass cache miss: {} attachments, {} subpasses",
            desc.attachments.len(),
            desc.subpasses.len()
        );
        self.render_passes.insert(desc.clone(), render_pass.clone());
        Ok(render_pass)
    }

    /// create-or-reuse 一个 framebuffer
    pub fn acquire_framebuffer<F: RenderPassFactory>(
        &mut self,
        factory: &mut F,
        render_pass: &Arc<GfxRenderPass>,
        desc: &FramebufferDescriptor,
    ) -> Result<Arc<GfxFramebuffer>, GfxError> {
        if let Some(framebuffer) = self.framebuffers.get(desc) {
            return Ok(framebuffer.clone());
        }

        let framebuffer = Arc::new(factory.create_framebuffer(render_pass, desc)?);
        self.framebuffers.insert(desc.clone(), framebuffer.clone());
        Ok(framebuffer)
    }
}
// destroy
impl GfxRenderPassCache {
    /// 释放所有缓存的原生对象
    ///
    /// 必须在设备 idle 后调用
    pub fn destroy(&mut self, device: &ash::Device) {
        for (_, render_pass) in self.render_passes.drain() {
            if let Ok(mut render_pass) = Arc::try_unwrap(render_pass) {
                render_pass.destroy(device);
            }
        }
        for (_, framebuffer) in self.framebuffers.drain() {
            if let Ok(mut framebuffer) = Arc::try_unwrap(framebuffer) {
                framebuffer.destroy(device);
            }
        }
    }
}
