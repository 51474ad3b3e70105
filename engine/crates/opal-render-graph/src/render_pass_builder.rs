//! 把线性的 scope 序列构建为 renderpass + framebuffer
//!
//! 每个 scope 对应一个 subpass，按执行顺序逐个加入；附件按
//! (attachment, usage) 展平后以固定优先级声明：
//! Resolve < RenderTarget < DepthStencil < SubpassInput（稳定排序，
//! 同优先级保持声明顺序）。跨 subpass 重复使用的附件复用同一个
//! attachment index。`end` 计算 preserve 列表后从池化缓存获取原生对象。
//!
//! builder 单次使用：`add_scope_attachments` 按 subpass 顺序调用若干次，
//! `end` 消耗 builder，没有回头路。实例不做内部同步。

use std::collections::HashMap;
use std::sync::Arc;

use ash::vk;
use itertools::Itertools;
use opal_gfx::commands::barrier::GfxBarrier;
use opal_gfx::error::GfxError;
use opal_gfx::render_pass::{
    AttachmentBinding, AttachmentRef, FramebufferDescriptor, GfxFramebuffer, GfxRenderPass, RenderPassDescriptor,
    SubpassDependencyDesc, SubpassDescriptor,
};
use opal_gfx::render_pass_cache::{GfxRenderPassCache, RenderPassFactory};

use crate::attachment::{AttachmentDatabase, AttachmentHandle};
use crate::scope::{ImageScopeAttachment, Scope, ScopeAttachmentUsage};

/// `end` 的产物：一次 renderpass 执行所需的全部对象
#[derive(Default)]
pub struct RenderPassContext {
    pub render_pass: Option<Arc<GfxRenderPass>>,
    pub framebuffer: Option<Arc<GfxFramebuffer>>,
    /// 与 renderpass 附件同序
    pub clear_values: Vec<vk::ClearValue>,
}
impl RenderPassContext {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.render_pass.is_some() && self.framebuffer.is_some()
    }
}

/// scope 的 prologue barrier 里找完整覆盖该 view 的第一条 image barrier
///
/// 没有则回落到 usage 的自然 layout：image 进入 renderpass 前已经在
/// 正确的 layout 上，不需要记录转换。
fn initial_layout(scope: &Scope, attachment: &ImageScopeAttachment, usage: ScopeAttachmentUsage) -> vk::ImageLayout {
    scope
        .prologue_barriers()
        .iter()
        .find_map(|barrier| match barrier {
            GfxBarrier::Image(image_barrier) if image_barrier.covers(&attachment.image_view) => {
                Some(image_barrier.old_layout())
            }
            _ => None,
        })
        .unwrap_or_else(|| usage.natural_layout())
}

/// epilogue barrier 逆序找完整覆盖的最后一条 image barrier
fn final_layout(scope: &Scope, attachment: &ImageScopeAttachment, usage: ScopeAttachmentUsage) -> vk::ImageLayout {
    scope
        .epilogue_barriers()
        .iter()
        .rev()
        .find_map(|barrier| match barrier {
            GfxBarrier::Image(image_barrier) if image_barrier.covers(&attachment.image_view) => {
                Some(image_barrier.new_layout())
            }
            _ => None,
        })
        .unwrap_or_else(|| usage.natural_layout())
}

/// renderpass 构建器，单次使用
pub struct RenderPassBuilder<'a> {
    database: &'a AttachmentDatabase,

    render_pass_desc: RenderPassDescriptor,

    // framebuffer 的 view 列表、clear value 列表与附件声明严格同序
    framebuffer_attachments: Vec<vk::ImageView>,
    clear_values: Vec<vk::ClearValue>,
    extent: vk::Extent2D,
    layers: u32,

    /// attachment 句柄 -> 已分配的 attachment index，跨 subpass 去重
    attachments_map: HashMap<AttachmentHandle, u32>,
    /// 每个 subpass 一个 bitset，标记实际触碰的 attachment index
    used_attachments_per_subpass: Vec<u64>,
    /// image view -> 最近引用它的 subpass，隐式 subpass input 依赖用
    last_subpass_resource_use: HashMap<vk::ImageView, usize>,
    /// buffer -> (最近使用的 subpass, 读写方向)
    last_subpass_buffer_use: HashMap<vk::Buffer, (usize, crate::scope::ScopeAttachmentAccess)>,
}
// new & init
impl<'a> RenderPassBuilder<'a> {
    pub fn new(database: &'a AttachmentDatabase, extent: vk::Extent2D, layers: u32) -> Self {
        Self {
            database,
            render_pass_desc: RenderPassDescriptor::default(),
            framebuffer_attachments: Vec::new(),
            clear_values: Vec::new(),
            extent,
            layers,
            attachments_map: HashMap::new(),
            used_attachments_per_subpass: Vec::new(),
            last_subpass_resource_use: HashMap::new(),
            last_subpass_buffer_use: HashMap::new(),
        }
    }
}
// add scopes
impl RenderPassBuilder<'_> {
    /// 把一个 scope 加入为下一个 subpass
    ///
    /// 调用方契约：必须按 subpass 的实际执行顺序调用，
    /// 依赖和 layout 推断都假定这一点。
    pub fn add_scope_attachments(&mut self, scope: &Scope) {
        let _span = tracy_client::span!("render_pass_builder_add_scope");

        let subpass_index = self.render_pass_desc.subpasses.len();
        log::debug!("subpass {subpass_index}: scope '{}'", scope.name());
        self.render_pass_desc.subpasses.push(SubpassDescriptor::default());
        self.used_attachments_per_subpass.push(0);

        // (attachment, usage) 展平；Shader / Copy 不进入附件系统
        let entries: Vec<(&ImageScopeAttachment, ScopeAttachmentUsage)> = scope
            .image_attachments()
            .iter()
            .flat_map(|attachment| attachment.usages.iter().map(move |usage| (attachment, *usage)))
            .filter(|(_, usage)| usage.is_render_pass_usage())
            .sorted_by_key(|(_, usage)| usage.priority())
            .collect();

        // 第一遍只处理 Resolve：key 是被 resolve 的 render target，
        // 第二遍处理 RenderTarget 时据此填充平行的 resolve 数组。
        // 两遍处理把 "Resolve 必须先于 RenderTarget" 的约束显式化。
        let mut resolve_map: HashMap<AttachmentHandle, AttachmentRef> = HashMap::new();
        for (attachment, usage) in &entries {
            if *usage != ScopeAttachmentUsage::Resolve {
                continue;
            }
            let index = self.declare_attachment(scope, attachment, *usage);
            let source = attachment.resolves_from.unwrap_or_else(|| {
                panic!("scope '{}': resolve attachment without a source render target", scope.name())
            });
            resolve_map.insert(
                source,
                AttachmentRef {
                    attachment: index,
                    layout: usage.natural_layout(),
                },
            );
            self.record_use(subpass_index, index, attachment);
        }

        for (attachment, usage) in &entries {
            match usage {
                // 已在第一遍处理
                ScopeAttachmentUsage::Resolve => continue,
                ScopeAttachmentUsage::RenderTarget => {
                    let index = self.declare_attachment(scope, attachment, *usage);
                    let attachment_ref = AttachmentRef {
                        attachment: index,
                        layout: usage.natural_layout(),
                    };
                    let resolve_ref = resolve_map.get(&attachment.attachment).copied();
                    let subpass = &mut self.render_pass_desc.subpasses[subpass_index];
                    subpass.render_targets.push(attachment_ref);
                    subpass.resolve_targets.push(resolve_ref);
                    self.record_use(subpass_index, index, attachment);
                }
                ScopeAttachmentUsage::DepthStencil => {
                    let index = self.declare_attachment(scope, attachment, *usage);
                    // 每个 subpass 只有一个槽位，重复声明时后写覆盖
                    self.render_pass_desc.subpasses[subpass_index].depth_stencil = Some(AttachmentRef {
                        attachment: index,
                        layout: usage.natural_layout(),
                    });
                    self.record_use(subpass_index, index, attachment);
                }
                ScopeAttachmentUsage::SubpassInput => {
                    // declare_attachment 对未生产过的 subpass input 直接 panic
                    let index = self.declare_attachment(scope, attachment, *usage);

                    // 生产者 subpass 到本 subpass 的隐式依赖
                    if let Some(&producer) = self.last_subpass_resource_use.get(&attachment.image_view.handle()) {
                        if producer != subpass_index {
                            self.render_pass_desc.dependencies.push(SubpassDependencyDesc {
                                src_subpass: producer as u32,
                                dst_subpass: subpass_index as u32,
                                src_stage_mask: vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT
                                    | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS,
                                dst_stage_mask: vk::PipelineStageFlags2::FRAGMENT_SHADER,
                                src_access_mask: vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
                                    | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                                dst_access_mask: vk::AccessFlags2::INPUT_ATTACHMENT_READ,
                                dependency_flags: vk::DependencyFlags::BY_REGION,
                            });
                        }
                    }

                    self.render_pass_desc.subpasses[subpass_index].subpass_inputs.push(AttachmentRef {
                        attachment: index,
                        layout: usage.natural_layout(),
                    });
                    self.record_use(subpass_index, index, attachment);
                }
                ScopeAttachmentUsage::Shader | ScopeAttachmentUsage::Copy => unreachable!(),
            }
        }

        // buffer 附件不产生附件声明，只做 subpass 间的依赖跟踪
        for buffer_attachment in scope.buffer_attachments() {
            if let Some(&(producer, producer_access)) = self.last_subpass_buffer_use.get(&buffer_attachment.buffer) {
                let hazard = producer_access.writes() || buffer_attachment.access.writes();
                if producer != subpass_index && hazard {
                    self.render_pass_desc.dependencies.push(SubpassDependencyDesc {
                        src_subpass: producer as u32,
                        dst_subpass: subpass_index as u32,
                        src_stage_mask: vk::PipelineStageFlags2::ALL_GRAPHICS,
                        dst_stage_mask: vk::PipelineStageFlags2::ALL_GRAPHICS,
                        src_access_mask: if producer_access.writes() {
                            vk::AccessFlags2::SHADER_WRITE
                        } else {
                            vk::AccessFlags2::SHADER_READ
                        },
                        dst_access_mask: if buffer_attachment.access.writes() {
                            vk::AccessFlags2::SHADER_WRITE
                        } else {
                            vk::AccessFlags2::SHADER_READ
                        },
                        // buffer 依赖不能限定在 framebuffer 局部
                        dependency_flags: vk::DependencyFlags::empty(),
                    });
                }
            }
            self.last_subpass_buffer_use.insert(buffer_attachment.buffer, (subpass_index, buffer_attachment.access));
        }
    }

    /// 按通用 barrier 追加一条 subpass 间依赖
    pub fn add_subpass_dependency(&mut self, src_subpass: u32, dst_subpass: u32, barrier: &GfxBarrier) {
        let mask = barrier.barrier_mask();
        // 只有 image 屏障的依赖可以限定在 framebuffer 局部
        let dependency_flags = match barrier {
            GfxBarrier::Image(_) => vk::DependencyFlags::BY_REGION,
            GfxBarrier::Buffer(_) | GfxBarrier::Memory(_) => vk::DependencyFlags::empty(),
        };
        self.render_pass_desc.dependencies.push(SubpassDependencyDesc {
            src_subpass,
            dst_subpass,
            src_stage_mask: mask.src_stage,
            dst_stage_mask: mask.dst_stage,
            src_access_mask: mask.src_access,
            dst_access_mask: mask.dst_access,
            dependency_flags,
        });
    }

    /// 查到已分配的 index 就复用，否则分配新 index 并追加附件声明
    ///
    /// 复用路径上会改写 final layout：附件的最终 layout 跟随最后一次实际使用。
    fn declare_attachment(&mut self, scope: &Scope, attachment: &ImageScopeAttachment, usage: ScopeAttachmentUsage) -> u32 {
        if let Some(&index) = self.attachments_map.get(&attachment.attachment) {
            self.render_pass_desc.attachments[index as usize].final_layout = final_layout(scope, attachment, usage);
            return index;
        }

        // subpass input 读的附件必须由更早的 subpass 生产过，
        // 走到这里说明调用方的 render graph 已经畸形
        assert!(
            usage != ScopeAttachmentUsage::SubpassInput,
            "scope '{}': subpass input reads an attachment no earlier subpass produced",
            scope.name()
        );

        let index = self.render_pass_desc.attachments.len() as u32;
        // 每个 subpass 的 used 位集是 64 bit
        assert!(index < u64::BITS, "too many attachments in one renderpass");

        let frame_attachment = self.database.get(attachment.attachment);
        self.render_pass_desc.attachments.push(AttachmentBinding {
            format: frame_attachment.format,
            samples: frame_attachment.samples,
            load_store: attachment.load_store,
            initial_layout: initial_layout(scope, attachment, usage),
            final_layout: final_layout(scope, attachment, usage),
        });
        self.framebuffer_attachments.push(attachment.image_view.handle());
        self.clear_values.push(attachment.clear_value);
        self.attachments_map.insert(attachment.attachment, index);
        index
    }

    fn record_use(&mut self, subpass_index: usize, index: u32, attachment: &ImageScopeAttachment) {
        self.used_attachments_per_subpass[subpass_index] |= 1u64 << index;
        self.last_subpass_resource_use.insert(attachment.image_view.handle(), subpass_index);
    }
}
// end
impl RenderPassBuilder<'_> {
    /// 结束构建：补全 preserve 列表并获取原生对象
    ///
    /// 获取失败对本次构建是致命的，直接向上传播；
    /// 调用方应将其视为该帧 pipeline 的失败，这里不做重试。
    pub fn end<F: RenderPassFactory>(
        mut self,
        cache: &mut GfxRenderPassCache,
        factory: &mut F,
    ) -> Result<RenderPassContext, GfxError> {
        let _span = tracy_client::span!("render_pass_builder_end");

        // subpass 没有触碰的附件必须显式 preserve，
        // 否则实现可以认为其内容允许丢弃
        let attachment_count = self.render_pass_desc.attachments.len() as u32;
        for (subpass_index, subpass) in self.render_pass_desc.subpasses.iter_mut().enumerate() {
            let used = self.used_attachments_per_subpass[subpass_index];
            for index in 0..attachment_count {
                if used & (1u64 << index) == 0 {
                    subpass.preserve_attachments.push(index);
                }
            }
        }

        let render_pass = cache.acquire_render_pass(factory, &self.render_pass_desc)?;
        let framebuffer_desc = FramebufferDescriptor {
            attachments: self.framebuffer_attachments,
            extent: self.extent,
            layers: self.layers,
        };
        let framebuffer = cache.acquire_framebuffer(factory, &render_pass, &framebuffer_desc)?;

        Ok(RenderPassContext {
            render_pass: Some(render_pass),
            framebuffer: Some(framebuffer),
            clear_values: self.clear_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;
    use opal_gfx::commands::barrier::GfxImageBarrier;
    use opal_gfx::render_pass::AttachmentLoadStoreAction;
    use opal_gfx::resources::image_view::{GfxImageView, GfxImageViewDesc};

    use super::*;
    use crate::attachment::FrameAttachment;
    use crate::scope::{BufferScopeAttachment, ScopeAttachmentAccess};

    static INIT: std::sync::Once = std::sync::Once::new();

    /// span! 需要运行中的 tracy client；顺便接上日志输出
    fn init() {
        tracy_client::Client::start();
        INIT.call_once(opal_crate_tools::init_log::init_log);
    }

    /// 不触碰设备的 factory，统计创建次数
    #[derive(Default)]
    struct StubFactory {
        render_pass_created: usize,
        framebuffer_created: usize,
    }
    impl RenderPassFactory for StubFactory {
        fn create_render_pass(&mut self, desc: &RenderPassDescriptor) -> Result<GfxRenderPass, GfxError> {
            self.render_pass_created += 1;
            Ok(GfxRenderPass::from_handle(
                vk::RenderPass::from_raw(self.render_pass_created as u64),
                desc.clone(),
                "stub-render-pass",
            ))
        }

        fn create_framebuffer(
            &mut self,
            _render_pass: &GfxRenderPass,
            desc: &FramebufferDescriptor,
        ) -> Result<GfxFramebuffer, GfxError> {
            self.framebuffer_created += 1;
            Ok(GfxFramebuffer::from_handle(
                vk::Framebuffer::from_raw(self.framebuffer_created as u64),
                desc.clone(),
                "stub-framebuffer",
            ))
        }
    }

    fn color_view(raw: u64) -> Arc<GfxImageView> {
        Arc::new(GfxImageView::from_handle(
            vk::ImageView::from_raw(raw),
            vk::Image::from_raw(raw),
            GfxImageViewDesc::new_2d(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR),
            format!("view-{raw}"),
        ))
    }

    fn extent() -> vk::Extent2D {
        vk::Extent2D {
            width: 800,
            height: 600,
        }
    }

    #[test]
    fn test_single_subpass_end_to_end() {
        init();
        let mut database = AttachmentDatabase::new();
        let color = database.register(FrameAttachment::new("color", vk::Format::R8G8B8A8_UNORM));

        let mut scope = Scope::new("forward");
        scope.add_image_attachment(
            ImageScopeAttachment::new(color, color_view(1), ScopeAttachmentUsage::RenderTarget)
                .with_load_store(AttachmentLoadStoreAction::clear_store()),
        );

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&scope);

        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();
        let context = builder.end(&mut cache, &mut factory).unwrap();

        assert!(context.is_valid());
        let render_pass = context.render_pass.unwrap();
        assert_eq!(render_pass.desc().attachments.len(), 1);
        assert_eq!(render_pass.desc().attachments[0].load_store, AttachmentLoadStoreAction::clear_store());
        assert_eq!(render_pass.desc().subpasses.len(), 1);
        assert_eq!(render_pass.desc().subpasses[0].rendertarget_count(), 1);
        assert!(render_pass.desc().subpasses[0].depth_stencil.is_none());
        // framebuffer 的 view 列表与附件声明同序等长
        assert_eq!(context.framebuffer.unwrap().desc().attachments.len(), 1);
        assert_eq!(context.clear_values.len(), 1);
    }

    #[test]
    fn test_attachment_dedup_and_subpass_input() {
        init();
        let mut database = AttachmentDatabase::new();
        let gbuffer = database.register(FrameAttachment::new("gbuffer", vk::Format::R8G8B8A8_UNORM));
        let lit = database.register(FrameAttachment::new("lit", vk::Format::R16G16B16A16_SFLOAT));
        let gbuffer_view = color_view(1);

        let mut produce = Scope::new("gbuffer");
        produce.add_image_attachment(ImageScopeAttachment::new(
            gbuffer,
            gbuffer_view.clone(),
            ScopeAttachmentUsage::RenderTarget,
        ));

        let mut consume = Scope::new("lighting");
        consume.add_image_attachment(ImageScopeAttachment::new(lit, color_view(2), ScopeAttachmentUsage::RenderTarget));
        consume.add_image_attachment(ImageScopeAttachment::new(
            gbuffer,
            gbuffer_view,
            ScopeAttachmentUsage::SubpassInput,
        ));

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&produce);
        builder.add_scope_attachments(&consume);

        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();
        let context = builder.end(&mut cache, &mut factory).unwrap();
        let desc = context.render_pass.as_ref().unwrap().desc().clone();

        // gbuffer 只声明一次，subpass 1 的 input 引用 subpass 0 的同一个 index
        assert_eq!(desc.attachments.len(), 2);
        assert_eq!(desc.subpasses[1].subpass_input_count(), 1);
        assert_eq!(desc.subpasses[1].subpass_inputs[0].attachment, desc.subpasses[0].render_targets[0].attachment);
        // subpass 0 没碰 lit，preserve 它；subpass 1 两个都碰了
        let lit_index = desc.subpasses[1].render_targets[0].attachment;
        assert_eq!(desc.subpasses[0].preserve_attachments, vec![lit_index]);
        assert!(desc.subpasses[1].preserve_attachments.is_empty());
        // 生产者到消费者的隐式依赖
        assert!(desc.dependencies.iter().any(|dep| {
            dep.src_subpass == 0 && dep.dst_subpass == 1 && dep.dependency_flags == vk::DependencyFlags::BY_REGION
        }));
    }

    #[test]
    fn test_preserve_attachment_in_untouched_middle_subpass() {
        init();
        let mut database = AttachmentDatabase::new();
        let a = database.register(FrameAttachment::new("a", vk::Format::R8G8B8A8_UNORM));
        let b = database.register(FrameAttachment::new("b", vk::Format::R8G8B8A8_UNORM));
        let a_view = color_view(1);

        let mut scope0 = Scope::new("s0");
        scope0.add_image_attachment(ImageScopeAttachment::new(a, a_view.clone(), ScopeAttachmentUsage::RenderTarget));
        let mut scope1 = Scope::new("s1");
        scope1.add_image_attachment(ImageScopeAttachment::new(b, color_view(2), ScopeAttachmentUsage::RenderTarget));
        let mut scope2 = Scope::new("s2");
        scope2.add_image_attachment(ImageScopeAttachment::new(a, a_view, ScopeAttachmentUsage::SubpassInput));
        scope2.add_image_attachment(ImageScopeAttachment::new(b, color_view(2), ScopeAttachmentUsage::RenderTarget));

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&scope0);
        builder.add_scope_attachments(&scope1);
        builder.add_scope_attachments(&scope2);

        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();
        let context = builder.end(&mut cache, &mut factory).unwrap();
        let desc = context.render_pass.as_ref().unwrap().desc().clone();

        // 中间的 subpass 1 没碰 a，必须 preserve 它
        let a_index = desc.subpasses[0].render_targets[0].attachment;
        assert!(desc.subpasses[1].preserve_attachments.contains(&a_index));
        assert!(desc.subpasses[2].preserve_attachments.is_empty());
    }

    #[test]
    fn test_resolve_render_target_pairing() {
        init();
        let mut database = AttachmentDatabase::new();
        let msaa = database.register(
            FrameAttachment::new("msaa-color", vk::Format::R8G8B8A8_UNORM).with_samples(vk::SampleCountFlags::TYPE_4),
        );
        let resolved = database.register(FrameAttachment::new("resolved", vk::Format::R8G8B8A8_UNORM));

        let mut scope = Scope::new("msaa-forward");
        scope.add_image_attachment(ImageScopeAttachment::new(msaa, color_view(1), ScopeAttachmentUsage::RenderTarget));
        scope.add_image_attachment(
            ImageScopeAttachment::new(resolved, color_view(2), ScopeAttachmentUsage::Resolve).with_resolves_from(msaa),
        );

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&scope);

        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();
        let context = builder.end(&mut cache, &mut factory).unwrap();
        let desc = context.render_pass.as_ref().unwrap().desc().clone();

        // Resolve 先声明，拿到 index 0；render target 的平行 resolve 槽位指向它
        assert_eq!(desc.attachments.len(), 2);
        assert_eq!(desc.attachments[0].samples, vk::SampleCountFlags::TYPE_1);
        assert_eq!(desc.attachments[1].samples, vk::SampleCountFlags::TYPE_4);
        let subpass = &desc.subpasses[0];
        assert_eq!(subpass.render_targets.len(), 1);
        assert_eq!(subpass.resolve_targets.len(), 1);
        assert_eq!(subpass.resolve_targets[0].unwrap().attachment, 0);
        assert_eq!(subpass.render_targets[0].attachment, 1);
    }

    #[test]
    fn test_layout_inference_from_scope_barriers() {
        init();
        let mut database = AttachmentDatabase::new();
        let color = database.register(FrameAttachment::new("color", vk::Format::R8G8B8A8_UNORM));
        let view = color_view(1);

        let full_range = vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 0,
            level_count: vk::REMAINING_MIP_LEVELS,
            base_array_layer: 0,
            layer_count: vk::REMAINING_ARRAY_LAYERS,
        };

        let mut scope = Scope::new("tonemap");
        scope.add_image_attachment(ImageScopeAttachment::new(color, view, ScopeAttachmentUsage::RenderTarget));
        // 其他 image 上的 barrier 不参与推断
        scope.add_prologue_barrier(GfxBarrier::Image(
            GfxImageBarrier::new()
                .image(vk::Image::from_raw(0x99))
                .subresource_range(full_range)
                .layout_transfer(vk::ImageLayout::GENERAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
        ));
        scope.add_prologue_barrier(GfxBarrier::Image(
            GfxImageBarrier::new()
                .image(vk::Image::from_raw(1))
                .subresource_range(full_range)
                .layout_transfer(vk::ImageLayout::UNDEFINED, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL),
        ));
        scope.add_epilogue_barrier(GfxBarrier::Image(
            GfxImageBarrier::new()
                .image(vk::Image::from_raw(1))
                .subresource_range(full_range)
                .layout_transfer(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        ));

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&scope);

        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();
        let context = builder.end(&mut cache, &mut factory).unwrap();
        let binding = context.render_pass.as_ref().unwrap().desc().attachments[0];

        assert_eq!(binding.initial_layout, vk::ImageLayout::UNDEFINED);
        assert_eq!(binding.final_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    }

    #[test]
    fn test_natural_layout_without_barriers() {
        init();
        let mut database = AttachmentDatabase::new();
        let depth = database.register(FrameAttachment::new("depth", vk::Format::D32_SFLOAT));

        let depth_view = Arc::new(GfxImageView::from_handle(
            vk::ImageView::from_raw(1),
            vk::Image::from_raw(1),
            GfxImageViewDesc::new_2d(vk::Format::D32_SFLOAT, vk::ImageAspectFlags::DEPTH),
            "depth-view",
        ));
        let mut scope = Scope::new("depth-prepass");
        scope.add_image_attachment(ImageScopeAttachment::new(depth, depth_view, ScopeAttachmentUsage::DepthStencil));

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&scope);

        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();
        let context = builder.end(&mut cache, &mut factory).unwrap();
        let desc = context.render_pass.as_ref().unwrap().desc().clone();

        // 没有 barrier 时回落到 usage 的自然 layout
        assert_eq!(desc.attachments[0].initial_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(desc.attachments[0].final_layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        assert_eq!(
            desc.subpasses[0].depth_stencil.unwrap().layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
    }

    #[test]
    fn test_pooled_render_pass_reused_across_builds() {
        init();
        let mut database = AttachmentDatabase::new();
        let color = database.register(FrameAttachment::new("color", vk::Format::R8G8B8A8_UNORM));
        let mut cache = GfxRenderPassCache::new();
        let mut factory = StubFactory::default();

        let build = |cache: &mut GfxRenderPassCache, factory: &mut StubFactory, database: &AttachmentDatabase| {
            let mut scope = Scope::new("forward");
            scope.add_image_attachment(ImageScopeAttachment::new(
                color,
                color_view(1),
                ScopeAttachmentUsage::RenderTarget,
            ));
            let mut builder = RenderPassBuilder::new(database, extent(), 1);
            builder.add_scope_attachments(&scope);
            builder.end(cache, factory).unwrap()
        };

        let first = build(&mut cache, &mut factory, &database);
        let second = build(&mut cache, &mut factory, &database);

        // 描述符相同，原生对象跨帧复用
        assert!(Arc::ptr_eq(first.render_pass.as_ref().unwrap(), second.render_pass.as_ref().unwrap()));
        assert!(Arc::ptr_eq(first.framebuffer.as_ref().unwrap(), second.framebuffer.as_ref().unwrap()));
        assert_eq!(factory.render_pass_created, 1);
        assert_eq!(factory.framebuffer_created, 1);
    }

    #[test]
    fn test_explicit_subpass_dependency_from_barrier() {
        let database = AttachmentDatabase::new();
        let mut builder = RenderPassBuilder::new(&database, extent(), 1);

        let barrier = GfxBarrier::Image(
            GfxImageBarrier::new()
                .src_mask(vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE)
                .dst_mask(vk::PipelineStageFlags2::FRAGMENT_SHADER, vk::AccessFlags2::INPUT_ATTACHMENT_READ),
        );
        builder.add_subpass_dependency(0, 1, &barrier);

        let dep = builder.render_pass_desc.dependencies[0];
        assert_eq!(dep.src_subpass, 0);
        assert_eq!(dep.dst_subpass, 1);
        assert_eq!(dep.src_access_mask, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE);
        assert_eq!(dep.dst_access_mask, vk::AccessFlags2::INPUT_ATTACHMENT_READ);
        // image barrier 的依赖限定在 framebuffer 局部
        assert_eq!(dep.dependency_flags, vk::DependencyFlags::BY_REGION);
    }

    #[test]
    fn test_buffer_hazard_adds_dependency() {
        init();
        let mut database = AttachmentDatabase::new();
        let color = database.register(FrameAttachment::new("color", vk::Format::R8G8B8A8_UNORM));
        let lights = database.register(FrameAttachment::new("lights", vk::Format::UNDEFINED));
        let buffer = vk::Buffer::from_raw(0x42);

        let mut writer = Scope::new("cull");
        writer.add_image_attachment(ImageScopeAttachment::new(color, color_view(1), ScopeAttachmentUsage::RenderTarget));
        writer.add_buffer_attachment(BufferScopeAttachment::new(lights, buffer, ScopeAttachmentAccess::Write));

        let mut reader = Scope::new("shade");
        reader.add_image_attachment(ImageScopeAttachment::new(color, color_view(1), ScopeAttachmentUsage::RenderTarget));
        reader.add_buffer_attachment(BufferScopeAttachment::new(lights, buffer, ScopeAttachmentAccess::Read));

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&writer);
        builder.add_scope_attachments(&reader);

        // 写后读产生一条非 framebuffer 局部的依赖
        assert!(builder.render_pass_desc.dependencies.iter().any(|dep| {
            dep.src_subpass == 0
                && dep.dst_subpass == 1
                && dep.src_access_mask == vk::AccessFlags2::SHADER_WRITE
                && dep.dependency_flags == vk::DependencyFlags::empty()
        }));
    }

    #[test]
    #[should_panic]
    fn test_subpass_input_without_producer_panics() {
        init();
        let mut database = AttachmentDatabase::new();
        let orphan = database.register(FrameAttachment::new("orphan", vk::Format::R8G8B8A8_UNORM));

        let mut scope = Scope::new("bad");
        scope.add_image_attachment(ImageScopeAttachment::new(orphan, color_view(1), ScopeAttachmentUsage::SubpassInput));

        let mut builder = RenderPassBuilder::new(&database, extent(), 1);
        builder.add_scope_attachments(&scope);
    }
}
