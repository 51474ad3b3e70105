//! SRG layout：shader 输入槽位的声明
//!
//! layout 描述每个类别（image / buffer / sampler / constant）的输入：
//! 名称、元素数量、访问方式，以及每个输入在类别扁平数组中的区间。
//! 输入索引只在其所属 layout 内有效，跨 layout 使用属于调用方错误。

use ash::vk;

/// 类别扁平数组中的一段左闭右开区间 `[min, max)`
///
/// 不变量：同一类别内不同输入的区间互不重叠，
/// 扁平数组长度等于各输入元素数量之和。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Interval {
    pub min: u32,
    pub max: u32,
}
impl Interval {
    #[inline]
    pub fn new(min: u32, max: u32) -> Self {
        debug_assert!(min <= max);
        Self { min, max }
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.max - self.min
    }
}

/// image 输入的访问方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderInputImageAccess {
    /// 采样读取（SRV）
    Read,
    /// storage 读写（UAV）
    ReadWrite,
}

/// image 输入期望的 view 维度
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderInputImageType {
    Image1D,
    Image2D,
    Image2DArray,
    Image3D,
    ImageCube,
}
impl ShaderInputImageType {
    /// 与 vk view type 的匹配
    pub fn matches(&self, view_type: vk::ImageViewType) -> bool {
        matches!(
            (self, view_type),
            (ShaderInputImageType::Image1D, vk::ImageViewType::TYPE_1D)
                | (ShaderInputImageType::Image2D, vk::ImageViewType::TYPE_2D)
                | (ShaderInputImageType::Image2DArray, vk::ImageViewType::TYPE_2D_ARRAY)
                | (ShaderInputImageType::Image3D, vk::ImageViewType::TYPE_3D)
                | (ShaderInputImageType::ImageCube, vk::ImageViewType::CUBE)
        )
    }
}

/// buffer 输入的访问方式
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderInputBufferAccess {
    Read,
    ReadWrite,
}

/// buffer 输入的种类
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderInputBufferType {
    /// uniform buffer
    Constant,
    /// structured buffer
    Structured,
    /// byte address buffer
    Raw,
}

/// 一个 image 输入的声明
#[derive(Clone, Debug)]
pub struct ShaderInputImageDescriptor {
    pub name: String,
    /// 数组元素数量
    pub count: u32,
    pub access: ShaderInputImageAccess,
    pub image_type: ShaderInputImageType,
}

/// 一个 buffer 输入的声明
#[derive(Clone, Debug)]
pub struct ShaderInputBufferDescriptor {
    pub name: String,
    pub count: u32,
    pub access: ShaderInputBufferAccess,
    pub buffer_type: ShaderInputBufferType,
}

/// 一个 sampler 输入的声明
#[derive(Clone, Debug)]
pub struct ShaderInputSamplerDescriptor {
    pub name: String,
    pub count: u32,
}

/// 一个 constant 输入的声明：constant 字节块中的一段
#[derive(Clone, Debug)]
pub struct ShaderInputConstantDescriptor {
    pub name: String,
    pub byte_offset: u32,
    pub byte_count: u32,
}

/// unbounded image 数组输入的声明（无固定元素数量）
#[derive(Clone, Debug)]
pub struct ShaderInputImageUnboundedArrayDescriptor {
    pub name: String,
    pub access: ShaderInputImageAccess,
    pub image_type: ShaderInputImageType,
}

/// unbounded buffer 数组输入的声明
#[derive(Clone, Debug)]
pub struct ShaderInputBufferUnboundedArrayDescriptor {
    pub name: String,
    pub access: ShaderInputBufferAccess,
    pub buffer_type: ShaderInputBufferType,
}

/// image 输入索引，仅在所属 layout 内有效
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInputImageIndex(pub u32);
impl ShaderInputImageIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// buffer 输入索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInputBufferIndex(pub u32);
impl ShaderInputBufferIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// sampler 输入索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInputSamplerIndex(pub u32);
impl ShaderInputSamplerIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// constant 输入索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInputConstantIndex(pub u32);
impl ShaderInputConstantIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// unbounded image 数组输入索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInputImageUnboundedArrayIndex(pub u32);
impl ShaderInputImageUnboundedArrayIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// unbounded buffer 数组输入索引
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShaderInputBufferUnboundedArrayIndex(pub u32);
impl ShaderInputBufferUnboundedArrayIndex {
    #[inline]
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// SRG layout
///
/// 由 [`SrgLayoutBuilder`] 构建后不可变；SRG 数据容器按它分配扁平数组。
pub struct ShaderResourceGroupLayout {
    name: String,

    images: Vec<ShaderInputImageDescriptor>,
    buffers: Vec<ShaderInputBufferDescriptor>,
    samplers: Vec<ShaderInputSamplerDescriptor>,
    constants: Vec<ShaderInputConstantDescriptor>,
    image_unbounded_arrays: Vec<ShaderInputImageUnboundedArrayDescriptor>,
    buffer_unbounded_arrays: Vec<ShaderInputBufferUnboundedArrayDescriptor>,

    // build() 时按声明顺序预计算
    image_intervals: Vec<Interval>,
    buffer_intervals: Vec<Interval>,
    sampler_intervals: Vec<Interval>,

    image_group_size: u32,
    buffer_group_size: u32,
    sampler_group_size: u32,
    constants_size: u32,
}
// getters
impl ShaderResourceGroupLayout {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// image 类别扁平数组的总长度
    #[inline]
    pub fn group_size_for_images(&self) -> u32 {
        self.image_group_size
    }
    #[inline]
    pub fn group_size_for_buffers(&self) -> u32 {
        self.buffer_group_size
    }
    #[inline]
    pub fn group_size_for_samplers(&self) -> u32 {
        self.sampler_group_size
    }
    /// constant 字节块的总大小
    #[inline]
    pub fn constants_size(&self) -> u32 {
        self.constants_size
    }
}
// image inputs
impl ShaderResourceGroupLayout {
    /// index + array_index 是否落在声明的区间内
    pub fn validate_access_image(&self, index: ShaderInputImageIndex, array_index: u32) -> bool {
        match self.images.get(index.index()) {
            Some(desc) => array_index < desc.count,
            None => false,
        }
    }

    /// 输入对应的扁平数组区间
    ///
    /// 调用前必须通过 validate
    #[inline]
    pub fn interval_for_image(&self, index: ShaderInputImageIndex) -> Interval {
        self.image_intervals[index.index()]
    }

    #[inline]
    pub fn image_input(&self, index: ShaderInputImageIndex) -> &ShaderInputImageDescriptor {
        &self.images[index.index()]
    }

    pub fn find_image_input(&self, name: &str) -> Option<ShaderInputImageIndex> {
        self.images.iter().position(|desc| desc.name == name).map(|i| ShaderInputImageIndex(i as u32))
    }
}
// buffer inputs
impl ShaderResourceGroupLayout {
    pub fn validate_access_buffer(&self, index: ShaderInputBufferIndex, array_index: u32) -> bool {
        match self.buffers.get(index.index()) {
            Some(desc) => array_index < desc.count,
            None => false,
        }
    }

    #[inline]
    pub fn interval_for_buffer(&self, index: ShaderInputBufferIndex) -> Interval {
        self.buffer_intervals[index.index()]
    }

    #[inline]
    pub fn buffer_input(&self, index: ShaderInputBufferIndex) -> &ShaderInputBufferDescriptor {
        &self.buffers[index.index()]
    }

    pub fn find_buffer_input(&self, name: &str) -> Option<ShaderInputBufferIndex> {
        self.buffers.iter().position(|desc| desc.name == name).map(|i| ShaderInputBufferIndex(i as u32))
    }
}
// sampler inputs
impl ShaderResourceGroupLayout {
    pub fn validate_access_sampler(&self, index: ShaderInputSamplerIndex, array_index: u32) -> bool {
        match self.samplers.get(index.index()) {
            Some(desc) => array_index < desc.count,
            None => false,
        }
    }

    #[inline]
    pub fn interval_for_sampler(&self, index: ShaderInputSamplerIndex) -> Interval {
        self.sampler_intervals[index.index()]
    }

    #[inline]
    pub fn sampler_input(&self, index: ShaderInputSamplerIndex) -> &ShaderInputSamplerDescriptor {
        &self.samplers[index.index()]
    }

    pub fn find_sampler_input(&self, name: &str) -> Option<ShaderInputSamplerIndex> {
        self.samplers.iter().position(|desc| desc.name == name).map(|i| ShaderInputSamplerIndex(i as u32))
    }
}
// constant inputs
impl ShaderResourceGroupLayout {
    pub fn validate_access_constant(&self, index: ShaderInputConstantIndex) -> bool {
        index.index() < self.constants.len()
    }

    #[inline]
    pub fn constant_input(&self, index: ShaderInputConstantIndex) -> &ShaderInputConstantDescriptor {
        &self.constants[index.index()]
    }

    pub fn find_constant_input(&self, name: &str) -> Option<ShaderInputConstantIndex> {
        self.constants.iter().position(|desc| desc.name == name).map(|i| ShaderInputConstantIndex(i as u32))
    }
}
// unbounded array inputs
impl ShaderResourceGroupLayout {
    pub fn validate_access_image_unbounded(&self, index: ShaderInputImageUnboundedArrayIndex) -> bool {
        index.index() < self.image_unbounded_arrays.len()
    }

    #[inline]
    pub fn image_unbounded_input(
        &self,
        index: ShaderInputImageUnboundedArrayIndex,
    ) -> &ShaderInputImageUnboundedArrayDescriptor {
        &self.image_unbounded_arrays[index.index()]
    }

    pub fn validate_access_buffer_unbounded(&self, index: ShaderInputBufferUnboundedArrayIndex) -> bool {
        index.index() < self.buffer_unbounded_arrays.len()
    }

    #[inline]
    pub fn buffer_unbounded_input(
        &self,
        index: ShaderInputBufferUnboundedArrayIndex,
    ) -> &ShaderInputBufferUnboundedArrayDescriptor {
        &self.buffer_unbounded_arrays[index.index()]
    }
}

/// SRG layout 构建器
///
/// 按声明顺序分配输入索引和区间。
pub struct SrgLayoutBuilder {
    images: Vec<ShaderInputImageDescriptor>,
    buffers: Vec<ShaderInputBufferDescriptor>,
    samplers: Vec<ShaderInputSamplerDescriptor>,
    constants: Vec<ShaderInputConstantDescriptor>,
    image_unbounded_arrays: Vec<ShaderInputImageUnboundedArrayDescriptor>,
    buffer_unbounded_arrays: Vec<ShaderInputBufferUnboundedArrayDescriptor>,
}
impl SrgLayoutBuilder {
    pub fn new() -> Self {
        Self {
            images: Vec::new(),
            buffers: Vec::new(),
            samplers: Vec::new(),
            constants: Vec::new(),
            image_unbounded_arrays: Vec::new(),
            buffer_unbounded_arrays: Vec::new(),
        }
    }

    pub fn add_image(
        &mut self,
        name: impl Into<String>,
        count: u32,
        access: ShaderInputImageAccess,
        image_type: ShaderInputImageType,
    ) -> ShaderInputImageIndex {
        debug_assert!(count > 0);
        self.images.push(ShaderInputImageDescriptor {
            name: name.into(),
            count,
            access,
            image_type,
        });
        ShaderInputImageIndex(self.images.len() as u32 - 1)
    }

    pub fn add_buffer(
        &mut self,
        name: impl Into<String>,
        count: u32,
        access: ShaderInputBufferAccess,
        buffer_type: ShaderInputBufferType,
    ) -> ShaderInputBufferIndex {
        debug_assert!(count > 0);
        self.buffers.push(ShaderInputBufferDescriptor {
            name: name.into(),
            count,
            access,
            buffer_type,
        });
        ShaderInputBufferIndex(self.buffers.len() as u32 - 1)
    }

    pub fn add_sampler(&mut self, name: impl Into<String>, count: u32) -> ShaderInputSamplerIndex {
        debug_assert!(count > 0);
        self.samplers.push(ShaderInputSamplerDescriptor {
            name: name.into(),
            count,
        });
        ShaderInputSamplerIndex(self.samplers.len() as u32 - 1)
    }

    /// constant 区间由调用方给定 offset；重叠属于调用方错误
    pub fn add_constant(
        &mut self,
        name: impl Into<String>,
        byte_offset: u32,
        byte_count: u32,
    ) -> ShaderInputConstantIndex {
        debug_assert!(byte_count > 0);
        self.constants.push(ShaderInputConstantDescriptor {
            name: name.into(),
            byte_offset,
            byte_count,
        });
        ShaderInputConstantIndex(self.constants.len() as u32 - 1)
    }

    pub fn add_image_unbounded_array(
        &mut self,
        name: impl Into<String>,
        access: ShaderInputImageAccess,
        image_type: ShaderInputImageType,
    ) -> ShaderInputImageUnboundedArrayIndex {
        self.image_unbounded_arrays.push(ShaderInputImageUnboundedArrayDescriptor {
            name: name.into(),
            access,
            image_type,
        });
        ShaderInputImageUnboundedArrayIndex(self.image_unbounded_arrays.len() as u32 - 1)
    }

    pub fn add_buffer_unbounded_array(
        &mut self,
        name: impl Into<String>,
        access: ShaderInputBufferAccess,
        buffer_type: ShaderInputBufferType,
    ) -> ShaderInputBufferUnboundedArrayIndex {
        self.buffer_unbounded_arrays.push(ShaderInputBufferUnboundedArrayDescriptor {
            name: name.into(),
            access,
            buffer_type,
        });
        ShaderInputBufferUnboundedArrayIndex(self.buffer_unbounded_arrays.len() as u32 - 1)
    }

    pub fn build(self, name: impl Into<String>) -> ShaderResourceGroupLayout {
        fn build_intervals(counts: impl Iterator<Item = u32>) -> (Vec<Interval>, u32) {
            let mut intervals = Vec::new();
            let mut offset = 0u32;
            for count in counts {
                intervals.push(Interval::new(offset, offset + count));
                offset += count;
            }
            (intervals, offset)
        }

        let (image_intervals, image_group_size) = build_intervals(self.images.iter().map(|d| d.count));
        let (buffer_intervals, buffer_group_size) = build_intervals(self.buffers.iter().map(|d| d.count));
        let (sampler_intervals, sampler_group_size) = build_intervals(self.samplers.iter().map(|d| d.count));

        let constants_size = self.constants.iter().map(|d| d.byte_offset + d.byte_count).max().unwrap_or(0);

        ShaderResourceGroupLayout {
            name: name.into(),
            images: self.images,
            buffers: self.buffers,
            samplers: self.samplers,
            constants: self.constants,
            image_unbounded_arrays: self.image_unbounded_arrays,
            buffer_unbounded_arrays: self.buffer_unbounded_arrays,
            image_intervals,
            buffer_intervals,
            sampler_intervals,
            image_group_size,
            buffer_group_size,
            sampler_group_size,
            constants_size,
        }
    }
}
impl Default for SrgLayoutBuilder {
    fn default() -> Self {
        Self::new()
    }
}
