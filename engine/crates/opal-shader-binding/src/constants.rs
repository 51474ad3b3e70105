//! SRG 的 constant 字节块
//!
//! 大小在构建时按 layout 固定；写入按 constant 输入声明的区间校验。

use std::sync::Arc;

use crate::layout::{ShaderInputConstantIndex, ShaderResourceGroupLayout};

pub struct SrgConstantsData {
    layout: Arc<ShaderResourceGroupLayout>,

    /// 长度恒等于 layout.constants_size()
    bytes: Vec<u8>,
}
// new & init
impl SrgConstantsData {
    pub fn new(layout: Arc<ShaderResourceGroupLayout>) -> Self {
        let size = layout.constants_size() as usize;
        Self {
            layout,
            bytes: vec![0; size],
        }
    }
}
// setters
impl SrgConstantsData {
    /// 在一个 constant 输入内写入一段字节
    ///
    /// `byte_offset` 相对于该输入的起始位置。区间越界时不写入，返回 false。
    pub fn set_constant_raw(&mut self, index: ShaderInputConstantIndex, bytes: &[u8], byte_offset: u32) -> bool {
        if !self.layout.validate_access_constant(index) {
            log::error!("set_constant_raw: invalid constant input index {index:?}");
            return false;
        }

        let input = self.layout.constant_input(index);
        let byte_count = bytes.len() as u32;
        // offset 回绕等同越界
        if byte_offset.checked_add(byte_count).is_none_or(|end| end > input.byte_count) {
            log::error!(
                "set_constant_raw: write of {byte_count} bytes at offset {byte_offset} exceeds input '{}' ({} bytes)",
                input.name,
                input.byte_count
            );
            return false;
        }

        let start = (input.byte_offset + byte_offset) as usize;
        self.bytes[start..start + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// 写入一个 POD 值，大小必须与输入声明一致
    pub fn set_constant<T: bytemuck::NoUninit>(&mut self, index: ShaderInputConstantIndex, value: &T) -> bool {
        if !self.layout.validate_access_constant(index) {
            log::error!("set_constant: invalid constant input index {index:?}");
            return false;
        }

        let input = self.layout.constant_input(index);
        let bytes = bytemuck::bytes_of(value);
        if bytes.len() as u32 != input.byte_count {
            log::error!(
                "set_constant: type size {} does not match input '{}' ({} bytes)",
                bytes.len(),
                input.name,
                input.byte_count
            );
            return false;
        }

        self.set_constant_raw(index, bytes, 0)
    }

    /// 绕过输入声明，直接在整个字节块上写入
    pub fn set_constant_data(&mut self, bytes: &[u8], byte_offset: u32) -> bool {
        let end = byte_offset as usize + bytes.len();
        if end > self.bytes.len() {
            log::error!(
                "set_constant_data: write of {} bytes at offset {byte_offset} exceeds blob ({} bytes)",
                bytes.len(),
                self.bytes.len()
            );
            return false;
        }

        self.bytes[byte_offset as usize..end].copy_from_slice(bytes);
        true
    }
}
// getters
impl SrgConstantsData {
    /// 整个字节块，compile 上传用
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// 一个 constant 输入对应的字节区间；索引非法时返回空切片
    pub fn constant_bytes(&self, index: ShaderInputConstantIndex) -> &[u8] {
        if !self.layout.validate_access_constant(index) {
            return &[];
        }
        let input = self.layout.constant_input(index);
        &self.bytes[input.byte_offset as usize..(input.byte_offset + input.byte_count) as usize]
    }
}
