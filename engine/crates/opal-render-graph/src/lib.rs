//! 声明式 frame graph 到原生 render pass 的构建
//!
//! frame graph 把一帧的渲染拆成若干 scope，每个 scope 声明自己对附件的
//! 使用方式和前后的 barrier。本 crate 负责其中的 render pass 构建环节：
//!
//! - **attachment**: frame attachment 注册表，资源跨整帧的持久描述
//! - **scope**: 一个 scope 内的附件使用声明（usage、load/store、barrier）
//! - **render_pass_builder**: 把线性的 scope 序列转换为
//!   renderpass + framebuffer 描述符对，附件去重、layout 推断、
//!   preserve 列表计算，最后从池化缓存获取原生对象

pub mod attachment;
pub mod render_pass_builder;
pub mod scope;

pub use attachment::{AttachmentDatabase, AttachmentHandle, FrameAttachment};
pub use render_pass_builder::{RenderPassBuilder, RenderPassContext};
pub use scope::{BufferScopeAttachment, ImageScopeAttachment, Scope, ScopeAttachmentAccess, ScopeAttachmentUsage};
