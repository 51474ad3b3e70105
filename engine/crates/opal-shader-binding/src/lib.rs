//! Shader Resource Group（SRG）绑定模型
//!
//! SRG 是以 layout 为类型的一组 shader 可见绑定（image / buffer / sampler /
//! constant），作为整体绑定到 pipeline。本 crate 提供：
//!
//! - **layout**：每个 shader 输入槽位的声明（区间、数量、访问方式）
//! - **srg_data**：绑定数据容器，跟踪哪些资源类别自上次 compile 后被修改
//! - **views**：单设备 / 多设备两种实例化共享同一套容器逻辑
//! - **constants**：constant 字节块
//!
//! compile（把脏类别上传到 GPU 可见的描述符表示）由外部执行，
//! 通过 update mask 协议知道哪些类别需要重新上传。

mod bindless;
mod constants;
mod layout;
mod srg_data;
mod views;

// Re-exports
pub use bindless::{BindlessResourceViews, INVALID_BINDLESS_INDEX};
pub use constants::SrgConstantsData;
pub use layout::{
    Interval, ShaderInputBufferAccess, ShaderInputBufferDescriptor, ShaderInputBufferIndex,
    ShaderInputBufferType, ShaderInputBufferUnboundedArrayDescriptor, ShaderInputBufferUnboundedArrayIndex,
    ShaderInputConstantDescriptor, ShaderInputConstantIndex, ShaderInputImageAccess, ShaderInputImageDescriptor,
    ShaderInputImageIndex, ShaderInputImageType, ShaderInputImageUnboundedArrayDescriptor,
    ShaderInputImageUnboundedArrayIndex, ShaderInputSamplerDescriptor, ShaderInputSamplerIndex,
    ShaderResourceGroupLayout, SrgLayoutBuilder,
};
pub use srg_data::{ShaderResourceGroupData, SrgResourceType, SrgUpdateMask};
pub use views::{
    MultiDeviceBinding, MultiDeviceBufferView, MultiDeviceImageView, SingleDeviceBinding, SrgBindingTypes,
    SrgBufferViewAccess, SrgImageViewAccess,
};

/// 单设备直连路径的 SRG 数据
pub type SingleDeviceSrgData = ShaderResourceGroupData<SingleDeviceBinding>;
/// 多 GPU 感知路径的 SRG 数据
pub type MultiDeviceSrgData = ShaderResourceGroupData<MultiDeviceBinding>;
