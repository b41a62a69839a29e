//! 内存管理相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `mm` crate（避免循环依赖）。
//! `mm` crate 在 `cfg(test)` 下为这些类型实现其 `ArchMmOps` trait。

/// Mock 的内存管理架构操作
///
/// 采用“恒等映射”（vaddr == paddr），使测试可以直接把宿主机堆内存当作物理内存池。
pub struct MockMmOps;

impl MockMmOps {
    pub const fn new() -> Self {
        Self
    }

    /// 将内核虚拟地址转换为物理地址（恒等映射）
    pub fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
        vaddr
    }
}

/// 全局 Mock 实例
pub static MOCK_MM_OPS: MockMmOps = MockMmOps::new();
