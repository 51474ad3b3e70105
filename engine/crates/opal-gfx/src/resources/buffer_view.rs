use ash::vk;

/// buffer 所在内存的类别
///
/// bindless 间接索引 buffer 要求 DeviceLocal：host 侧按帧轮转的内存
/// 会导致写入的索引在下一帧失效。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GfxMemoryLocation {
    /// 设备内存，生命周期内地址稳定
    DeviceLocal,
    /// host 可见内存，通常按帧多缓冲
    HostVisible,
}

/// Buffer view 的描述：buffer 内的一段区间
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxBufferViewDesc {
    pub offset: vk::DeviceSize,
    /// WHOLE_SIZE 表示到 buffer 末尾
    pub range: vk::DeviceSize,
}
impl GfxBufferViewDesc {
    pub fn whole() -> Self {
        Self {
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }

    pub fn new(offset: vk::DeviceSize, range: vk::DeviceSize) -> Self {
        Self { offset, range }
    }
}

/// 对外部所有的 buffer 区间的共享引用
///
/// 与 [`GfxImageView`](crate::resources::image_view::GfxImageView) 一样，
/// 持有方不延长底层 buffer 的生命周期。
pub struct GfxBufferView {
    handle: vk::Buffer,

    desc: GfxBufferViewDesc,

    memory: GfxMemoryLocation,

    /// buffer 的 usage，绑定校验依据
    usage: vk::BufferUsageFlags,

    bindless_srv: Option<u32>,
    bindless_uav: Option<u32>,

    name: String,
}
// new & init
impl GfxBufferView {
    pub fn from_handle(
        handle: vk::Buffer,
        desc: GfxBufferViewDesc,
        memory: GfxMemoryLocation,
        name: impl AsRef<str>,
    ) -> Self {
        Self {
            handle,
            desc,
            memory,
            usage: vk::BufferUsageFlags::UNIFORM_BUFFER,
            bindless_srv: None,
            bindless_uav: None,
            name: name.as_ref().to_string(),
        }
    }

    /// builder
    pub fn with_usage(mut self, usage: vk::BufferUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    /// builder
    pub fn with_bindless_indices(mut self, srv: Option<u32>, uav: Option<u32>) -> Self {
        self.bindless_srv = srv;
        self.bindless_uav = uav;
        self
    }
}
// getters
impl GfxBufferView {
    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }
    #[inline]
    pub fn desc(&self) -> &GfxBufferViewDesc {
        &self.desc
    }
    #[inline]
    pub fn memory_location(&self) -> GfxMemoryLocation {
        self.memory
    }
    #[inline]
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn bindless_read_index(&self) -> Option<u32> {
        self.bindless_srv
    }
    #[inline]
    pub fn bindless_read_write_index(&self) -> Option<u32> {
        self.bindless_uav
    }
}
impl std::fmt::Display for GfxBufferView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BufferView({}, {:?})", self.name, self.handle)
    }
}
