//! bindless 间接索引相关类型
//!
//! 一组 view 的 bindless 索引被写入一个间接索引 buffer，shader 通过
//! 索引访问全局描述符表。记录以 (间接 buffer 输入, array index) 为 key，
//! 每次设置整体替换，不做合并。

use crate::views::SrgBindingTypes;

/// bindless 索引未注册时写入的哨兵值
pub const INVALID_BINDLESS_INDEX: u32 = u32::MAX;

/// 为一个间接索引 buffer 记录的 view 集合
pub enum BindlessResourceViews<T: SrgBindingTypes> {
    Image(Vec<T::ImageView>),
    Buffer(Vec<T::BufferView>),
}

impl<T: SrgBindingTypes> BindlessResourceViews<T> {
    pub fn len(&self) -> usize {
        match self {
            BindlessResourceViews::Image(views) => views.len(),
            BindlessResourceViews::Buffer(views) => views.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
