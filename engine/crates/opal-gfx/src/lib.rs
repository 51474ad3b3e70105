//! Opal GFX 层
//!
//! 提供与设备无关的 Vulkan 值类型（view 描述、sampler 描述、barrier 描述），
//! 以及 render pass / framebuffer 的描述符和原生对象封装。
//!
//! 此层不持有全局设备；需要创建原生对象的入口显式接收 `ash::Device`。

pub mod commands;
pub mod error;
pub mod render_pass;
pub mod render_pass_cache;
pub mod resources;
pub mod sampler;
