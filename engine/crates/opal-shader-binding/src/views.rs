//! 单设备 / 多设备两种绑定实例化
//!
//! 容器逻辑只实现一次（[`crate::ShaderResourceGroupData`] 对类型参数泛化），
//! 两条路径只在持有的 view 类型上不同，避免两份手写实现之间产生漂移。

use std::sync::Arc;

use ash::vk;
use opal_gfx::resources::buffer_view::{GfxBufferView, GfxMemoryLocation};
use opal_gfx::resources::image_view::GfxImageView;

use crate::layout::{ShaderInputBufferAccess, ShaderInputBufferType, ShaderInputImageAccess, ShaderInputImageType};

/// SRG 持有的 image view 必须提供的能力
pub trait SrgImageViewAccess {
    /// 与输入声明的类型 / 用途兼容性校验
    ///
    /// 有界数组和 unbounded 数组输入共用同一套校验
    fn is_compatible(&self, access: ShaderInputImageAccess, image_type: ShaderInputImageType) -> bool;

    /// bindless 只读索引
    fn bindless_read_index(&self) -> Option<u32>;
    /// bindless 读写索引
    fn bindless_read_write_index(&self) -> Option<u32>;
}

/// SRG 持有的 buffer view 必须提供的能力
pub trait SrgBufferViewAccess {
    fn is_compatible(&self, access: ShaderInputBufferAccess, buffer_type: ShaderInputBufferType) -> bool;

    fn bindless_read_index(&self) -> Option<u32>;
    fn bindless_read_write_index(&self) -> Option<u32>;

    /// 所在内存类别，bindless 间接 buffer 的前置条件用
    fn memory_location(&self) -> GfxMemoryLocation;
}

/// 把 SRG 容器对 view 类型泛化的入口
pub trait SrgBindingTypes {
    type ImageView: SrgImageViewAccess + Clone;
    type BufferView: SrgBufferViewAccess + Clone;
}

fn image_view_compatible(view: &GfxImageView, access: ShaderInputImageAccess, image_type: ShaderInputImageType) -> bool {
    if !image_type.matches(view.desc().view_type) {
        return false;
    }
    match access {
        ShaderInputImageAccess::Read => view.image_usage().contains(vk::ImageUsageFlags::SAMPLED),
        ShaderInputImageAccess::ReadWrite => view.image_usage().contains(vk::ImageUsageFlags::STORAGE),
    }
}

fn buffer_view_compatible(view: &GfxBufferView, access: ShaderInputBufferAccess, buffer_type: ShaderInputBufferType) -> bool {
    let usage_ok = match buffer_type {
        ShaderInputBufferType::Constant => view.usage().contains(vk::BufferUsageFlags::UNIFORM_BUFFER),
        ShaderInputBufferType::Structured | ShaderInputBufferType::Raw => {
            view.usage().contains(vk::BufferUsageFlags::STORAGE_BUFFER)
        }
    };
    // uniform buffer 天然只读，ReadWrite 声明必须落在 storage buffer 上
    let access_ok = match access {
        ShaderInputBufferAccess::Read => true,
        ShaderInputBufferAccess::ReadWrite => buffer_type != ShaderInputBufferType::Constant,
    };
    usage_ok && access_ok
}

// ============ 单设备路径 ============

impl SrgImageViewAccess for Arc<GfxImageView> {
    fn is_compatible(&self, access: ShaderInputImageAccess, image_type: ShaderInputImageType) -> bool {
        image_view_compatible(self, access, image_type)
    }

    #[inline]
    fn bindless_read_index(&self) -> Option<u32> {
        GfxImageView::bindless_read_index(self)
    }
    #[inline]
    fn bindless_read_write_index(&self) -> Option<u32> {
        GfxImageView::bindless_read_write_index(self)
    }
}

impl SrgBufferViewAccess for Arc<GfxBufferView> {
    fn is_compatible(&self, access: ShaderInputBufferAccess, buffer_type: ShaderInputBufferType) -> bool {
        buffer_view_compatible(self, access, buffer_type)
    }

    #[inline]
    fn bindless_read_index(&self) -> Option<u32> {
        GfxBufferView::bindless_read_index(self)
    }
    #[inline]
    fn bindless_read_write_index(&self) -> Option<u32> {
        GfxBufferView::bindless_read_write_index(self)
    }
    #[inline]
    fn memory_location(&self) -> GfxMemoryLocation {
        GfxBufferView::memory_location(self)
    }
}

/// 单设备直连绑定
#[derive(Clone, Copy, Debug)]
pub struct SingleDeviceBinding;
impl SrgBindingTypes for SingleDeviceBinding {
    type ImageView = Arc<GfxImageView>;
    type BufferView = Arc<GfxBufferView>;
}

// ============ 多设备路径 ============

/// 每个设备一份的 image view
///
/// 下标即设备下标。bindless 索引要求各设备一致，由资源层保证。
pub struct MultiDeviceImageView {
    device_views: Vec<Arc<GfxImageView>>,
}
impl MultiDeviceImageView {
    pub fn new(device_views: Vec<Arc<GfxImageView>>) -> Self {
        debug_assert!(!device_views.is_empty());
        Self { device_views }
    }

    #[inline]
    pub fn device_view(&self, device_index: usize) -> &Arc<GfxImageView> {
        &self.device_views[device_index]
    }
    #[inline]
    pub fn device_count(&self) -> usize {
        self.device_views.len()
    }
}

impl SrgImageViewAccess for Arc<MultiDeviceImageView> {
    fn is_compatible(&self, access: ShaderInputImageAccess, image_type: ShaderInputImageType) -> bool {
        self.device_views.iter().all(|view| image_view_compatible(view, access, image_type))
    }

    fn bindless_read_index(&self) -> Option<u32> {
        let index = self.device_views[0].bindless_read_index();
        debug_assert!(self.device_views.iter().all(|view| view.bindless_read_index() == index));
        index
    }

    fn bindless_read_write_index(&self) -> Option<u32> {
        let index = self.device_views[0].bindless_read_write_index();
        debug_assert!(self.device_views.iter().all(|view| view.bindless_read_write_index() == index));
        index
    }
}

/// 每个设备一份的 buffer view
pub struct MultiDeviceBufferView {
    device_views: Vec<Arc<GfxBufferView>>,
}
impl MultiDeviceBufferView {
    pub fn new(device_views: Vec<Arc<GfxBufferView>>) -> Self {
        debug_assert!(!device_views.is_empty());
        Self { device_views }
    }

    #[inline]
    pub fn device_view(&self, device_index: usize) -> &Arc<GfxBufferView> {
        &self.device_views[device_index]
    }
    #[inline]
    pub fn device_count(&self) -> usize {
        self.device_views.len()
    }
}

impl SrgBufferViewAccess for Arc<MultiDeviceBufferView> {
    fn is_compatible(&self, access: ShaderInputBufferAccess, buffer_type: ShaderInputBufferType) -> bool {
        self.device_views.iter().all(|view| buffer_view_compatible(view, access, buffer_type))
    }

    fn bindless_read_index(&self) -> Option<u32> {
        let index = self.device_views[0].bindless_read_index();
        debug_assert!(self.device_views.iter().all(|view| view.bindless_read_index() == index));
        index
    }

    fn bindless_read_write_index(&self) -> Option<u32> {
        let index = self.device_views[0].bindless_read_write_index();
        debug_assert!(self.device_views.iter().all(|view| view.bindless_read_write_index() == index));
        index
    }

    fn memory_location(&self) -> GfxMemoryLocation {
        let location = self.device_views[0].memory_location();
        debug_assert!(self.device_views.iter().all(|view| view.memory_location() == location));
        location
    }
}

/// 多 GPU 感知绑定
#[derive(Clone, Copy, Debug)]
pub struct MultiDeviceBinding;
impl SrgBindingTypes for MultiDeviceBinding {
    type ImageView = Arc<MultiDeviceImageView>;
    type BufferView = Arc<MultiDeviceBufferView>;
}
