//! SRG 绑定数据容器
//!
//! 按 layout 分配三个类别的扁平数组（image / buffer / sampler），外加
//! unbounded 数组侧表、constant 字节块和 bindless 间接索引记录。
//! 每次 set 都会把所属类别标脏；compile 步骤据此只重传被修改的类别。
//!
//! 校验策略：整批的区间越界检查先行，失败则整个调用不落盘；
//! 逐元素的兼容性校验相互独立，无效元素不写入但不阻塞其余元素，
//! 因为调用方常常绑定"稀疏"数组，个别槽位有意留空。

use std::collections::HashMap;
use std::sync::Arc;

use opal_gfx::resources::buffer_view::GfxMemoryLocation;
use opal_gfx::sampler::GfxSamplerDesc;

use crate::bindless::{BindlessResourceViews, INVALID_BINDLESS_INDEX};
use crate::constants::SrgConstantsData;
use crate::layout::{
    ShaderInputBufferIndex, ShaderInputBufferUnboundedArrayIndex, ShaderInputConstantIndex, ShaderInputImageIndex,
    ShaderInputImageUnboundedArrayIndex, ShaderInputSamplerIndex, ShaderResourceGroupLayout,
};
use crate::views::{SrgBindingTypes, SrgBufferViewAccess, SrgImageViewAccess};

/// 需要单独 compile 的资源类别
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum SrgResourceType {
    ImageView = 1 << 0,
    BufferView = 1 << 1,
    Sampler = 1 << 2,
    ConstantData = 1 << 3,
    ImageViewUnboundedArray = 1 << 4,
    BufferViewUnboundedArray = 1 << 5,
}

/// 每个资源类别一个 bit 的脏标记
///
/// set 路径只置位；compile 完成后由调用方 [`ShaderResourceGroupData::reset_update_mask`] 清零。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SrgUpdateMask(u32);
impl SrgUpdateMask {
    #[inline]
    pub fn insert(&mut self, resource_type: SrgResourceType) {
        self.0 |= resource_type as u32;
    }

    #[inline]
    pub fn insert_mask(&mut self, mask: SrgUpdateMask) {
        self.0 |= mask.0;
    }

    #[inline]
    pub fn contains(&self, resource_type: SrgResourceType) -> bool {
        self.0 & resource_type as u32 != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// 一个 SRG 实例的当前绑定状态
///
/// 对 view 类型泛化：单设备与多设备路径共享全部容器逻辑，
/// 见 [`crate::SingleDeviceSrgData`] / [`crate::MultiDeviceSrgData`]。
pub struct ShaderResourceGroupData<T: SrgBindingTypes> {
    layout: Arc<ShaderResourceGroupLayout>,

    /// 逐元素兼容性校验开关；构造时显式传入，热路径可以关掉
    validation: bool,

    // 三个类别的扁平数组，长度恒等于 layout 的 group size
    image_views: Vec<Option<T::ImageView>>,
    buffer_views: Vec<Option<T::BufferView>>,
    samplers: Vec<GfxSamplerDesc>,

    // unbounded 数组侧表，每次 set 整体替换
    unbounded_image_views: Vec<T::ImageView>,
    unbounded_buffer_views: Vec<T::BufferView>,

    constants: SrgConstantsData,

    /// (间接 buffer 输入, array index) -> 该间接 buffer 覆盖的 view 集合
    bindless_views: HashMap<(ShaderInputBufferIndex, u32), BindlessResourceViews<T>>,

    update_mask: SrgUpdateMask,
}
// new & init
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    pub fn new(layout: Arc<ShaderResourceGroupLayout>, validation: bool) -> Self {
        let image_count = layout.group_size_for_images() as usize;
        let buffer_count = layout.group_size_for_buffers() as usize;
        let sampler_count = layout.group_size_for_samplers() as usize;
        let constants = SrgConstantsData::new(layout.clone());
        Self {
            layout,
            validation,
            image_views: vec![None; image_count],
            buffer_views: vec![None; buffer_count],
            samplers: vec![GfxSamplerDesc::default(); sampler_count],
            unbounded_image_views: Vec::new(),
            unbounded_buffer_views: Vec::new(),
            constants,
            bindless_views: HashMap::new(),
            update_mask: SrgUpdateMask::default(),
        }
    }

    #[inline]
    pub fn layout(&self) -> &Arc<ShaderResourceGroupLayout> {
        &self.layout
    }
}
// image view setters
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    /// 单元素版本，`None` 在校验开启时视为无效元素
    pub fn set_image_view(
        &mut self,
        index: ShaderInputImageIndex,
        view: Option<&T::ImageView>,
        array_index: u32,
    ) -> bool {
        let view = view.cloned();
        self.set_image_view_array(index, std::slice::from_ref(&view), array_index)
    }

    /// 批量绑定连续的数组元素
    ///
    /// 整批越界则不落盘直接返回 false；否则逐元素独立校验，
    /// 仅有效元素写入，全部有效才返回 true。
    /// 只要提供了元素（无论有效与否）就标脏 image 类别。
    pub fn set_image_view_array(
        &mut self,
        index: ShaderInputImageIndex,
        views: &[Option<T::ImageView>],
        array_index: u32,
    ) -> bool {
        if views.is_empty() {
            return true;
        }
        // array_index 来自调用方，加法回绕会落到别的输入的区间里
        let Some(last_index) = array_index.checked_add(views.len() as u32 - 1) else {
            log::error!(
                "srg[{}]: set_image_view_array array range overflows, input {index:?}, array_index {array_index}",
                self.layout.name()
            );
            return false;
        };
        if !self.layout.validate_access_image(index, last_index) {
            log::error!(
                "srg[{}]: set_image_view_array out of range, input {index:?}, array range [{array_index}, {last_index}]",
                self.layout.name()
            );
            return false;
        }

        let layout = self.layout.clone();
        let input = layout.image_input(index);
        let base = (layout.interval_for_image(index).min + array_index) as usize;

        self.update_mask.insert(SrgResourceType::ImageView);

        let mut all_valid = true;
        for (i, view) in views.iter().enumerate() {
            if !self.validation {
                self.image_views[base + i] = view.clone();
                continue;
            }
            match view {
                Some(view) if view.is_compatible(input.access, input.image_type) => {
                    self.image_views[base + i] = Some(view.clone());
                }
                _ => {
                    log::error!(
                        "srg[{}]: image view at element {} is null or incompatible with input '{}'",
                        layout.name(),
                        array_index as usize + i,
                        input.name
                    );
                    all_valid = false;
                }
            }
        }
        all_valid
    }

    /// 整体替换一个 unbounded 数组的侧表
    pub fn set_image_view_unbounded_array(
        &mut self,
        index: ShaderInputImageUnboundedArrayIndex,
        views: &[T::ImageView],
    ) -> bool {
        if !self.layout.validate_access_image_unbounded(index) {
            log::error!("srg[{}]: invalid unbounded image array input {index:?}", self.layout.name());
            return false;
        }

        let layout = self.layout.clone();
        let input = layout.image_unbounded_input(index);

        // 先清空再追加，不做合并
        self.unbounded_image_views.clear();
        if views.is_empty() {
            return true;
        }
        self.update_mask.insert(SrgResourceType::ImageViewUnboundedArray);

        let mut all_valid = true;
        for view in views {
            if !self.validation || view.is_compatible(input.access, input.image_type) {
                self.unbounded_image_views.push(view.clone());
            } else {
                log::error!(
                    "srg[{}]: image view incompatible with unbounded array input '{}'",
                    layout.name(),
                    input.name
                );
                all_valid = false;
            }
        }
        all_valid
    }
}
// buffer view setters
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    pub fn set_buffer_view(
        &mut self,
        index: ShaderInputBufferIndex,
        view: Option<&T::BufferView>,
        array_index: u32,
    ) -> bool {
        let view = view.cloned();
        self.set_buffer_view_array(index, std::slice::from_ref(&view), array_index)
    }

    /// 语义同 [`Self::set_image_view_array`]
    pub fn set_buffer_view_array(
        &mut self,
        index: ShaderInputBufferIndex,
        views: &[Option<T::BufferView>],
        array_index: u32,
    ) -> bool {
        if views.is_empty() {
            return true;
        }
        let Some(last_index) = array_index.checked_add(views.len() as u32 - 1) else {
            log::error!(
                "srg[{}]: set_buffer_view_array array range overflows, input {index:?}, array_index {array_index}",
                self.layout.name()
            );
            return false;
        };
        if !self.layout.validate_access_buffer(index, last_index) {
            log::error!(
                "srg[{}]: set_buffer_view_array out of range, input {index:?}, array range [{array_index}, {last_index}]",
                self.layout.name()
            );
            return false;
        }

        let layout = self.layout.clone();
        let input = layout.buffer_input(index);
        let base = (layout.interval_for_buffer(index).min + array_index) as usize;

        self.update_mask.insert(SrgResourceType::BufferView);

        let mut all_valid = true;
        for (i, view) in views.iter().enumerate() {
            if !self.validation {
                self.buffer_views[base + i] = view.clone();
                continue;
            }
            match view {
                Some(view) if view.is_compatible(input.access, input.buffer_type) => {
                    self.buffer_views[base + i] = Some(view.clone());
                }
                _ => {
                    log::error!(
                        "srg[{}]: buffer view at element {} is null or incompatible with input '{}'",
                        layout.name(),
                        array_index as usize + i,
                        input.name
                    );
                    all_valid = false;
                }
            }
        }
        all_valid
    }

    pub fn set_buffer_view_unbounded_array(
        &mut self,
        index: ShaderInputBufferUnboundedArrayIndex,
        views: &[T::BufferView],
    ) -> bool {
        if !self.layout.validate_access_buffer_unbounded(index) {
            log::error!("srg[{}]: invalid unbounded buffer array input {index:?}", self.layout.name());
            return false;
        }

        let layout = self.layout.clone();
        let input = layout.buffer_unbounded_input(index);

        self.unbounded_buffer_views.clear();
        if views.is_empty() {
            return true;
        }
        self.update_mask.insert(SrgResourceType::BufferViewUnboundedArray);

        let mut all_valid = true;
        for view in views {
            if !self.validation || view.is_compatible(input.access, input.buffer_type) {
                self.unbounded_buffer_views.push(view.clone());
            } else {
                log::error!(
                    "srg[{}]: buffer view incompatible with unbounded array input '{}'",
                    layout.name(),
                    input.name
                );
                all_valid = false;
            }
        }
        all_valid
    }
}
// sampler setters
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    pub fn set_sampler(&mut self, index: ShaderInputSamplerIndex, sampler: &GfxSamplerDesc, array_index: u32) -> bool {
        self.set_sampler_array(index, std::slice::from_ref(sampler), array_index)
    }

    /// sampler 是值类型，只做区间检查，不做逐元素校验
    pub fn set_sampler_array(
        &mut self,
        index: ShaderInputSamplerIndex,
        samplers: &[GfxSamplerDesc],
        array_index: u32,
    ) -> bool {
        if samplers.is_empty() {
            return true;
        }
        let Some(last_index) = array_index.checked_add(samplers.len() as u32 - 1) else {
            log::error!(
                "srg[{}]: set_sampler_array array range overflows, input {index:?}, array_index {array_index}",
                self.layout.name()
            );
            return false;
        };
        if !self.layout.validate_access_sampler(index, last_index) {
            log::error!(
                "srg[{}]: set_sampler_array out of range, input {index:?}, array range [{array_index}, {last_index}]",
                self.layout.name()
            );
            return false;
        }

        let base = (self.layout.interval_for_sampler(index).min + array_index) as usize;
        self.update_mask.insert(SrgResourceType::Sampler);
        self.samplers[base..base + samplers.len()].clone_from_slice(samplers);
        true
    }
}
// constant setters
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    /// 在一个 constant 输入内写入一段字节
    ///
    /// 无论写入是否成功都标脏 constant 类别：先检查再标脏省不下什么
    pub fn set_constant_raw(&mut self, index: ShaderInputConstantIndex, bytes: &[u8], byte_offset: u32) -> bool {
        self.update_mask.insert(SrgResourceType::ConstantData);
        self.constants.set_constant_raw(index, bytes, byte_offset)
    }

    /// 写入一个 POD 值，大小必须与输入声明一致
    pub fn set_constant<V: bytemuck::NoUninit>(&mut self, index: ShaderInputConstantIndex, value: &V) -> bool {
        self.update_mask.insert(SrgResourceType::ConstantData);
        self.constants.set_constant(index, value)
    }

    /// 绕过输入声明，直接写整个字节块
    pub fn set_constant_data(&mut self, bytes: &[u8], byte_offset: u32) -> bool {
        self.update_mask.insert(SrgResourceType::ConstantData);
        self.constants.set_constant_data(bytes, byte_offset)
    }
}
// bindless
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    /// 为一个间接索引 buffer 记录一组 bindless view
    ///
    /// 每个 view 的 bindless 索引（只读取 read 索引，否则取 read-write 索引）
    /// 写入 `out_indices` 的对应位置；未注册 bindless 的 view 写入
    /// [`INVALID_BINDLESS_INDEX`] 并返回 false。间接 buffer 本身走普通的
    /// [`Self::set_buffer_view`] 路径绑定到 `indirect_index` 槽位。
    ///
    /// 前置条件（断言）：`is_read_only` 与 `views` 等长；间接 buffer 必须在
    /// 设备内存上，索引写入后不能因逐帧重分配而失效。
    pub fn set_bindless_image_views(
        &mut self,
        indirect_index: ShaderInputBufferIndex,
        indirect_buffer: &T::BufferView,
        views: &[T::ImageView],
        out_indices: &mut [u32],
        is_read_only: &[bool],
        array_index: u32,
    ) -> bool {
        let _span = tracy_client::span!("srg_set_bindless_image_views");

        assert_eq!(views.len(), is_read_only.len(), "is_read_only must be parallel to views");
        assert_eq!(
            indirect_buffer.memory_location(),
            GfxMemoryLocation::DeviceLocal,
            "bindless indirect buffer must live in device memory"
        );

        let mut all_resolved = true;
        for (i, view) in views.iter().enumerate() {
            let bindless_index = if is_read_only[i] { view.bindless_read_index() } else { view.bindless_read_write_index() };
            let bindless_index = bindless_index.unwrap_or_else(|| {
                log::error!("srg[{}]: image view at element {i} has no bindless index", self.layout.name());
                all_resolved = false;
                INVALID_BINDLESS_INDEX
            });
            // out_indices 过短视为调用方错误，多余的索引不写出
            debug_assert!(i < out_indices.len(), "out_indices shorter than views");
            if let Some(slot) = out_indices.get_mut(i) {
                *slot = bindless_index;
            }
        }

        // 同一 key 上的旧记录整体替换
        self.bindless_views.insert((indirect_index, array_index), BindlessResourceViews::Image(views.to_vec()));

        let indirect_bound = self.set_buffer_view(indirect_index, Some(indirect_buffer), array_index);
        all_resolved && indirect_bound
    }

    /// buffer 版本，语义同 [`Self::set_bindless_image_views`]
    pub fn set_bindless_buffer_views(
        &mut self,
        indirect_index: ShaderInputBufferIndex,
        indirect_buffer: &T::BufferView,
        views: &[T::BufferView],
        out_indices: &mut [u32],
        is_read_only: &[bool],
        array_index: u32,
    ) -> bool {
        let _span = tracy_client::span!("srg_set_bindless_buffer_views");

        assert_eq!(views.len(), is_read_only.len(), "is_read_only must be parallel to views");
        assert_eq!(
            indirect_buffer.memory_location(),
            GfxMemoryLocation::DeviceLocal,
            "bindless indirect buffer must live in device memory"
        );

        let mut all_resolved = true;
        for (i, view) in views.iter().enumerate() {
            let bindless_index = if is_read_only[i] { view.bindless_read_index() } else { view.bindless_read_write_index() };
            let bindless_index = bindless_index.unwrap_or_else(|| {
                log::error!("srg[{}]: buffer view at element {i} has no bindless index", self.layout.name());
                all_resolved = false;
                INVALID_BINDLESS_INDEX
            });
            debug_assert!(i < out_indices.len(), "out_indices shorter than views");
            if let Some(slot) = out_indices.get_mut(i) {
                *slot = bindless_index;
            }
        }

        self.bindless_views.insert((indirect_index, array_index), BindlessResourceViews::Buffer(views.to_vec()));

        let indirect_bound = self.set_buffer_view(indirect_index, Some(indirect_buffer), array_index);
        all_resolved && indirect_bound
    }

    /// compile 步骤遍历用
    #[inline]
    pub fn bindless_views(&self) -> &HashMap<(ShaderInputBufferIndex, u32), BindlessResourceViews<T>> {
        &self.bindless_views
    }
}
// getters
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    /// 索引非法时返回 None，调用方视为未绑定
    pub fn image_view(&self, index: ShaderInputImageIndex, array_index: u32) -> Option<&T::ImageView> {
        if !self.layout.validate_access_image(index, array_index) {
            return None;
        }
        self.image_views[(self.layout.interval_for_image(index).min + array_index) as usize].as_ref()
    }

    /// 一个输入对应的连续元素区间；索引非法时返回空切片
    ///
    /// 返回的切片内容会被后续同类别 set 修改，不要跨 set 持有
    pub fn image_view_array(&self, index: ShaderInputImageIndex) -> &[Option<T::ImageView>] {
        if !self.layout.validate_access_image(index, 0) {
            return &[];
        }
        let interval = self.layout.interval_for_image(index);
        &self.image_views[interval.min as usize..interval.max as usize]
    }

    pub fn buffer_view(&self, index: ShaderInputBufferIndex, array_index: u32) -> Option<&T::BufferView> {
        if !self.layout.validate_access_buffer(index, array_index) {
            return None;
        }
        self.buffer_views[(self.layout.interval_for_buffer(index).min + array_index) as usize].as_ref()
    }

    pub fn buffer_view_array(&self, index: ShaderInputBufferIndex) -> &[Option<T::BufferView>] {
        if !self.layout.validate_access_buffer(index, 0) {
            return &[];
        }
        let interval = self.layout.interval_for_buffer(index);
        &self.buffer_views[interval.min as usize..interval.max as usize]
    }

    /// 索引非法时返回默认 sampler
    pub fn sampler(&self, index: ShaderInputSamplerIndex, array_index: u32) -> GfxSamplerDesc {
        if !self.layout.validate_access_sampler(index, array_index) {
            return GfxSamplerDesc::default();
        }
        self.samplers[(self.layout.interval_for_sampler(index).min + array_index) as usize]
    }

    pub fn sampler_array(&self, index: ShaderInputSamplerIndex) -> &[GfxSamplerDesc] {
        if !self.layout.validate_access_sampler(index, 0) {
            return &[];
        }
        let interval = self.layout.interval_for_sampler(index);
        &self.samplers[interval.min as usize..interval.max as usize]
    }

    #[inline]
    pub fn image_view_unbounded_array(&self) -> &[T::ImageView] {
        &self.unbounded_image_views
    }

    #[inline]
    pub fn buffer_view_unbounded_array(&self) -> &[T::BufferView] {
        &self.unbounded_buffer_views
    }

    #[inline]
    pub fn constants(&self) -> &SrgConstantsData {
        &self.constants
    }
}
// update mask & reset
impl<T: SrgBindingTypes> ShaderResourceGroupData<T> {
    /// 把所有 image / buffer 槽位（含 unbounded 侧表和 bindless 记录）清空
    ///
    /// 不触碰 sampler、constant 和脏掩码
    pub fn reset_views(&mut self) {
        self.image_views.fill(None);
        self.buffer_views.fill(None);
        self.unbounded_image_views.clear();
        self.unbounded_buffer_views.clear();
        self.bindless_views.clear();
    }

    #[inline]
    pub fn update_mask(&self) -> SrgUpdateMask {
        self.update_mask
    }

    /// 外部手动标脏若干类别（比如资源热重载后强制重传）
    #[inline]
    pub fn enable_resource_type_compilation(&mut self, mask: SrgUpdateMask) {
        self.update_mask.insert_mask(mask);
    }

    /// compile 完成后调用
    #[inline]
    pub fn reset_update_mask(&mut self) {
        self.update_mask.reset();
    }
}

#[cfg(test)]
mod tests {
    use ash::vk;
    use ash::vk::Handle;
    use opal_gfx::resources::buffer_view::{GfxBufferView, GfxBufferViewDesc};
    use opal_gfx::resources::image_view::{GfxImageView, GfxImageViewDesc};

    use super::*;
    use crate::layout::{
        ShaderInputBufferAccess, ShaderInputBufferType, ShaderInputImageAccess, ShaderInputImageType,
        SrgLayoutBuilder,
    };

    struct TestLayout {
        layout: Arc<ShaderResourceGroupLayout>,
        albedo: ShaderInputImageIndex,
        cascades: ShaderInputImageIndex,
        lights: ShaderInputBufferIndex,
        indirect: ShaderInputBufferIndex,
        samplers: ShaderInputSamplerIndex,
        exposure: ShaderInputConstantIndex,
        material_textures: ShaderInputImageUnboundedArrayIndex,
        light_grids: ShaderInputBufferUnboundedArrayIndex,
    }

    fn test_layout() -> TestLayout {
        let mut builder = SrgLayoutBuilder::new();
        let albedo = builder.add_image("albedo", 1, ShaderInputImageAccess::Read, ShaderInputImageType::Image2D);
        let cascades =
            builder.add_image("shadow_cascades", 4, ShaderInputImageAccess::Read, ShaderInputImageType::Image2D);
        let lights = builder.add_buffer("lights", 1, ShaderInputBufferAccess::Read, ShaderInputBufferType::Structured);
        let indirect =
            builder.add_buffer("material_indices", 1, ShaderInputBufferAccess::Read, ShaderInputBufferType::Structured);
        let samplers = builder.add_sampler("samplers", 2);
        let exposure = builder.add_constant("exposure", 0, 4);
        let material_textures = builder.add_image_unbounded_array(
            "material_textures",
            ShaderInputImageAccess::Read,
            ShaderInputImageType::Image2D,
        );
        let light_grids = builder.add_buffer_unbounded_array(
            "light_grids",
            ShaderInputBufferAccess::Read,
            ShaderInputBufferType::Structured,
        );
        TestLayout {
            layout: Arc::new(builder.build("test-srg")),
            albedo,
            cascades,
            lights,
            indirect,
            samplers,
            exposure,
            material_textures,
            light_grids,
        }
    }

    /// 可采样的 2D image view，handle 只作 identity 用
    fn sampled_view(raw: u64) -> Arc<GfxImageView> {
        Arc::new(GfxImageView::from_handle(
            vk::ImageView::from_raw(raw),
            vk::Image::from_raw(raw),
            GfxImageViewDesc::new_2d(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR),
            format!("image-{raw}"),
        ))
    }

    /// 缺少 SAMPLED usage，对 Read 输入不兼容
    fn transfer_only_view(raw: u64) -> Arc<GfxImageView> {
        Arc::new(
            GfxImageView::from_handle(
                vk::ImageView::from_raw(raw),
                vk::Image::from_raw(raw),
                GfxImageViewDesc::new_2d(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR),
                format!("image-{raw}"),
            )
            .with_image_usage(vk::ImageUsageFlags::TRANSFER_SRC),
        )
    }

    fn storage_buffer(raw: u64, memory: GfxMemoryLocation) -> Arc<GfxBufferView> {
        Arc::new(
            GfxBufferView::from_handle(vk::Buffer::from_raw(raw), GfxBufferViewDesc::whole(), memory, format!("buffer-{raw}"))
                .with_usage(vk::BufferUsageFlags::STORAGE_BUFFER),
        )
    }

    fn srg(validation: bool) -> (TestLayout, SingleDeviceSrgDataForTest) {
        let layout = test_layout();
        let data = ShaderResourceGroupData::new(layout.layout.clone(), validation);
        (layout, data)
    }

    type SingleDeviceSrgDataForTest = ShaderResourceGroupData<crate::views::SingleDeviceBinding>;

    #[test]
    fn test_set_get_round_trip() {
        let (l, mut srg) = srg(true);
        let view = sampled_view(1);
        let buffer = storage_buffer(2, GfxMemoryLocation::DeviceLocal);

        assert!(srg.set_image_view(l.albedo, Some(&view), 0));
        assert!(srg.set_buffer_view(l.lights, Some(&buffer), 0));
        assert!(srg.set_sampler(l.samplers, &GfxSamplerDesc::nearest(), 1));

        // 读回的是同一个 view（identity）
        assert!(Arc::ptr_eq(srg.image_view(l.albedo, 0).unwrap(), &view));
        assert!(Arc::ptr_eq(srg.buffer_view(l.lights, 0).unwrap(), &buffer));
        assert_eq!(srg.sampler(l.samplers, 1), GfxSamplerDesc::nearest());
        // 未写过的槽位保持未绑定 / 默认值
        assert!(srg.image_view(l.cascades, 0).is_none());
        assert_eq!(srg.sampler(l.samplers, 0), GfxSamplerDesc::default());
    }

    #[test]
    fn test_out_of_range_batch_rejected_before_write() {
        let (l, mut srg) = srg(true);
        let views = vec![Some(sampled_view(1)), Some(sampled_view(2))];

        // cascades 有 4 个元素，array_index 3 起步放不下 2 个
        assert!(!srg.set_image_view_array(l.cascades, &views, 3));
        // 整批拒绝：不落盘也不标脏
        assert!(srg.image_view(l.cascades, 3).is_none());
        assert!(srg.update_mask().is_empty());
    }

    #[test]
    fn test_partial_failure_writes_valid_elements() {
        let (l, mut srg) = srg(true);
        let views = vec![
            Some(sampled_view(1)),
            Some(transfer_only_view(2)),
            None,
            Some(sampled_view(4)),
        ];

        // 4 个元素里 2 个无效：整体返回 false
        assert!(!srg.set_image_view_array(l.cascades, &views, 0));
        // 有效元素照常写入
        assert!(srg.image_view(l.cascades, 0).is_some());
        assert!(srg.image_view(l.cascades, 1).is_none());
        assert!(srg.image_view(l.cascades, 2).is_none());
        assert!(srg.image_view(l.cascades, 3).is_some());
        // 只要提供了元素就标脏
        assert!(srg.update_mask().contains(SrgResourceType::ImageView));
    }

    #[test]
    fn test_validation_disabled_writes_everything() {
        let (l, mut srg) = srg(false);
        let views = vec![Some(transfer_only_view(1)), None];

        // 校验关闭时不做逐元素检查，原样落盘
        assert!(srg.set_image_view_array(l.cascades, &views, 0));
        assert!(srg.image_view(l.cascades, 0).is_some());
        assert!(srg.image_view(l.cascades, 1).is_none());
        // 区间检查不受校验开关影响
        assert!(!srg.set_image_view(l.cascades, Some(&sampled_view(3)), 4));
    }

    #[test]
    fn test_dirty_mask_monotonic_until_reset() {
        let (l, mut srg) = srg(true);

        assert!(srg.update_mask().is_empty());
        srg.set_image_view(l.albedo, Some(&sampled_view(1)), 0);
        assert!(srg.update_mask().contains(SrgResourceType::ImageView));

        // 后续失败的调用不会清掉已置位的 bit
        srg.set_image_view(l.albedo, Some(&transfer_only_view(2)), 0);
        srg.set_constant(l.exposure, &1.5f32);
        assert!(srg.update_mask().contains(SrgResourceType::ImageView));
        assert!(srg.update_mask().contains(SrgResourceType::ConstantData));

        srg.reset_update_mask();
        assert!(srg.update_mask().is_empty());
    }

    #[test]
    fn test_constant_set_marks_dirty_even_on_failure() {
        let (l, mut srg) = srg(true);

        // 8 字节写入 4 字节输入，写入失败但类别仍标脏
        assert!(!srg.set_constant(l.exposure, &1.5f64));
        assert!(srg.update_mask().contains(SrgResourceType::ConstantData));
    }

    #[test]
    fn test_reset_views_idempotent() {
        // span! 需要运行中的 tracy client
        tracy_client::Client::start();
        let (l, mut srg) = srg(true);
        srg.set_image_view(l.albedo, Some(&sampled_view(1)), 0);
        srg.set_sampler(l.samplers, &GfxSamplerDesc::nearest(), 0);
        srg.set_constant(l.exposure, &1.5f32);
        srg.set_image_view_unbounded_array(l.material_textures, &[sampled_view(2)]);

        let indirect = storage_buffer(100, GfxMemoryLocation::DeviceLocal);
        let bindless_view = Arc::new(
            GfxImageView::from_handle(
                vk::ImageView::from_raw(3),
                vk::Image::from_raw(3),
                GfxImageViewDesc::new_2d(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR),
                "bindless".to_string(),
            )
            .with_bindless_indices(Some(7), None),
        );
        let mut out_indices = [0u32; 1];
        assert!(srg.set_bindless_image_views(l.indirect, &indirect, &[bindless_view], &mut out_indices, &[true], 0));
        assert!(!srg.bindless_views().is_empty());
        let mask_before = srg.update_mask();

        srg.reset_views();
        srg.reset_views();

        // view 槽位和 bindless 记录清空，sampler / constant / 脏掩码不受影响
        assert!(srg.image_view(l.albedo, 0).is_none());
        assert!(srg.buffer_view(l.indirect, 0).is_none());
        assert!(srg.image_view_unbounded_array().is_empty());
        assert!(srg.bindless_views().is_empty());
        assert_eq!(srg.sampler(l.samplers, 0), GfxSamplerDesc::nearest());
        assert_eq!(srg.constants().constant_bytes(l.exposure), 1.5f32.to_ne_bytes());
        assert_eq!(srg.update_mask(), mask_before);
    }

    #[test]
    fn test_unbounded_array_replaced_not_merged() {
        let (l, mut srg) = srg(true);

        assert!(srg.set_image_view_unbounded_array(l.material_textures, &[sampled_view(1), sampled_view(2)]));
        assert_eq!(srg.image_view_unbounded_array().len(), 2);

        // 再次 set 整体替换，不是追加
        let replacement = sampled_view(3);
        assert!(srg.set_image_view_unbounded_array(l.material_textures, &[replacement.clone()]));
        assert_eq!(srg.image_view_unbounded_array().len(), 1);
        assert!(Arc::ptr_eq(&srg.image_view_unbounded_array()[0], &replacement));
    }

    #[test]
    fn test_buffer_unbounded_array_replaced_not_merged() {
        let (l, mut srg) = srg(true);

        assert!(srg.set_buffer_view_unbounded_array(
            l.light_grids,
            &[
                storage_buffer(1, GfxMemoryLocation::DeviceLocal),
                storage_buffer(2, GfxMemoryLocation::DeviceLocal)
            ]
        ));
        assert_eq!(srg.buffer_view_unbounded_array().len(), 2);
        assert!(srg.update_mask().contains(SrgResourceType::BufferViewUnboundedArray));

        // 再次 set 整体替换；无效元素（缺 STORAGE usage）跳过不落盘
        let replacement = storage_buffer(3, GfxMemoryLocation::DeviceLocal);
        let transfer_only = Arc::new(
            GfxBufferView::from_handle(
                vk::Buffer::from_raw(4),
                GfxBufferViewDesc::whole(),
                GfxMemoryLocation::DeviceLocal,
                "transfer-only".to_string(),
            )
            .with_usage(vk::BufferUsageFlags::TRANSFER_SRC),
        );
        assert!(!srg.set_buffer_view_unbounded_array(l.light_grids, &[replacement.clone(), transfer_only]));
        assert_eq!(srg.buffer_view_unbounded_array().len(), 1);
        assert!(Arc::ptr_eq(&srg.buffer_view_unbounded_array()[0], &replacement));
    }

    #[test]
    fn test_array_index_overflow_rejected() {
        let (l, mut srg) = srg(true);
        let views = vec![Some(sampled_view(1)), Some(sampled_view(2))];

        // array_index 接近 u32::MAX 时区间检查不能回绕，必须整批拒绝
        assert!(!srg.set_image_view_array(l.cascades, &views, u32::MAX));
        assert!(!srg.set_buffer_view_array(
            l.lights,
            &[
                Some(storage_buffer(3, GfxMemoryLocation::DeviceLocal)),
                Some(storage_buffer(4, GfxMemoryLocation::DeviceLocal))
            ],
            u32::MAX
        ));
        assert!(!srg.set_sampler_array(l.samplers, &[GfxSamplerDesc::default(); 2], u32::MAX));
        // 不落盘也不标脏
        assert!(srg.image_view(l.cascades, 0).is_none());
        assert!(srg.buffer_view(l.lights, 0).is_none());
        assert!(srg.update_mask().is_empty());
    }

    #[test]
    fn test_getters_return_sentinel_on_invalid_index() {
        let (_, srg) = srg(true);
        let bogus_image = ShaderInputImageIndex(42);
        let bogus_sampler = ShaderInputSamplerIndex(42);

        assert!(srg.image_view(bogus_image, 0).is_none());
        assert!(srg.image_view_array(bogus_image).is_empty());
        assert_eq!(srg.sampler(bogus_sampler, 0), GfxSamplerDesc::default());
    }

    #[test]
    fn test_bindless_views_replace_and_resolve_indices() {
        // span! 需要运行中的 tracy client
        tracy_client::Client::start();
        let (l, mut srg) = srg(true);
        let indirect = storage_buffer(100, GfxMemoryLocation::DeviceLocal);

        let srv_view = Arc::new(
            GfxImageView::from_handle(
                vk::ImageView::from_raw(1),
                vk::Image::from_raw(1),
                GfxImageViewDesc::new_2d(vk::Format::R8G8B8A8_UNORM, vk::ImageAspectFlags::COLOR),
                "srv".to_string(),
            )
            .with_bindless_indices(Some(7), Some(8)),
        );
        let unregistered = sampled_view(2);

        let mut out_indices = [0u32; 2];
        let resolved = srg.set_bindless_image_views(
            l.indirect,
            &indirect,
            &[srv_view.clone(), unregistered],
            &mut out_indices,
            &[true, true],
            0,
        );

        // 未注册 bindless 的 view 写入哨兵值并使整体返回 false
        assert!(!resolved);
        assert_eq!(out_indices, [7, INVALID_BINDLESS_INDEX]);
        // 间接 buffer 本身经普通路径绑定
        assert!(Arc::ptr_eq(srg.buffer_view(l.indirect, 0).unwrap(), &indirect));
        assert_eq!(srg.bindless_views().get(&(l.indirect, 0)).unwrap().len(), 2);

        // 同一 key 再次 set 整体替换
        let mut out = [0u32; 1];
        assert!(srg.set_bindless_image_views(l.indirect, &indirect, &[srv_view.clone()], &mut out, &[false], 0));
        assert_eq!(out, [8]);
        assert_eq!(srg.bindless_views().len(), 1);
        assert_eq!(srg.bindless_views().get(&(l.indirect, 0)).unwrap().len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_bindless_host_visible_indirect_buffer_asserts() {
        tracy_client::Client::start();
        let (l, mut srg) = srg(true);
        // 间接 buffer 必须在设备内存上
        let indirect = storage_buffer(100, GfxMemoryLocation::HostVisible);
        let mut out = [0u32; 1];
        srg.set_bindless_image_views(l.indirect, &indirect, &[sampled_view(1)], &mut out, &[true], 0);
    }

    #[test]
    fn test_multi_device_views_share_container_logic() {
        use crate::views::{MultiDeviceBinding, MultiDeviceImageView};

        let layout = test_layout();
        let mut srg = ShaderResourceGroupData::<MultiDeviceBinding>::new(layout.layout.clone(), true);

        let view = Arc::new(MultiDeviceImageView::new(vec![sampled_view(1), sampled_view(2)]));
        assert!(srg.set_image_view(layout.albedo, Some(&view), 0));
        assert!(Arc::ptr_eq(srg.image_view(layout.albedo, 0).unwrap(), &view));

        // 任一设备的 view 不兼容则整个多设备 view 不兼容
        let mixed = Arc::new(MultiDeviceImageView::new(vec![sampled_view(3), transfer_only_view(4)]));
        assert!(!srg.set_image_view(layout.albedo, Some(&mixed), 0));
    }
}
