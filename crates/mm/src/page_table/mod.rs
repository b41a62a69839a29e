//! 页表模块
//!
//! 内存核心不直接解析页表格式，只通过 [`PageTable`] trait
//! 请求“把一段物理内存以给定权限映射到一段虚拟地址”。
//! 具体的页表实现（多级页表、TLB 刷新等）由各架构提供。

use core::fmt;

use crate::address::{Paddr, Vaddr};
use crate::memory_space::VmrPerm;

/// 分页操作中可能发生的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 虚拟地址已被映射
    AlreadyMapped,
    /// 提供了无效的地址（未对齐或超出地址空间）
    InvalidAddress,
    /// 中间级页表分配失败
    OutOfMemory,
}

impl fmt::Display for PagingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            PagingError::AlreadyMapped => "address already mapped",
            PagingError::InvalidAddress => "invalid address",
            PagingError::OutOfMemory => "out of memory for page-table pages",
        };
        f.write_str(msg)
    }
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;

/// 页表接口
///
/// 此 trait 定义了内存核心对页表的全部需求，由具体架构实现。
pub trait PageTable {
    /// 把 `[pa, pa + len)` 以 `perm` 权限映射到 `[va, va + len)`
    ///
    /// `va`、`pa` 与 `len` 均按页对齐。
    fn map_range(&mut self, va: Vaddr, pa: Paddr, len: usize, perm: VmrPerm) -> PagingResult<()>;

    /// 查询 `va` 所在页的映射，返回 `va` 对应的物理地址与权限
    fn query(&self, va: Vaddr) -> Option<(Paddr, VmrPerm)>;
}
