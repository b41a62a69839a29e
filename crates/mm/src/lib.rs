//! 物理内存核心
//!
//! 提供伙伴系统物理页分配器，以及把首次访问匿名区域引发的转换错误
//! 解析为新映射的缺页处理路径。
//!
//! # 架构解耦
//!
//! 通过 trait 抽象与架构特定组件解耦：
//! - [`ArchMmOps`]: 内核虚拟地址与物理地址的转换
//! - [`PageTable`]: 页表的映射与查询
//! - [`FaultContext`]: 触发缺页的执行上下文
//!
//! 使用前必须调用 [`register_arch_ops`] 注册实现，
//! 并为 `sync` crate 注册中断控制实现。

#![no_std]

extern crate alloc;

mod arch_ops;

pub mod address;
pub mod buddy;
pub mod config;
pub mod fault;
pub mod memory_space;
pub mod page_table;

#[cfg(test)]
mod test_env;

pub use arch_ops::{ArchMmOps, arch_ops, register_arch_ops};
pub use config::{BUDDY_MAX_ORDER, PAGE_SHIFT, PAGE_SIZE};

// Re-export 常用类型
pub use address::{AlignOps, Paddr, UsizeConvert, Vaddr};
pub use buddy::{BuddyError, BuddyStats, LockedPool, Page, PageGuard, PageId, PhysMemPool};
pub use fault::{ENOMAPPING, FaultContext, FaultError, do_page_fault, handle_trans_fault};
pub use memory_space::{PhysMemObject, PmoType, VmRegion, VmSpace, VmrPerm};
pub use page_table::{PageTable, PagingError, PagingResult};
