//! 虚拟内存区域与物理内存对象

use alloc::sync::Arc;
use bitflags::bitflags;

use crate::address::Vaddr;

bitflags! {
    /// 虚拟内存区域的访问权限
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct VmrPerm: u64 {
        /// 可读
        const READ = 1 << 0;
        /// 可写
        const WRITE = 1 << 1;
        /// 可执行
        const EXEC = 1 << 2;
        /// 设备内存
        const DEVICE = 1 << 3;
    }
}

/// 物理内存对象（后备存储）的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PmoType {
    /// 匿名内存，首次访问时按需分配零页
    Anonym,
    /// 创建时即已分配好物理内存的数据对象
    Data,
    /// 共享内存
    Shm,
    /// 设备 MMIO
    Device,
}

/// 物理内存对象
///
/// 缺页处理只关心它的类型；页的实际记录方式不在内存核心中实现。
#[derive(Debug)]
pub struct PhysMemObject {
    pmo_type: PmoType,
    size: usize,
}

impl PhysMemObject {
    /// 创建一个物理内存对象
    pub fn new(pmo_type: PmoType, size: usize) -> Self {
        PhysMemObject { pmo_type, size }
    }

    /// 对象类型
    pub fn pmo_type(&self) -> PmoType {
        self.pmo_type
    }

    /// 对象大小（字节）
    pub fn size(&self) -> usize {
        self.size
    }
}

/// 地址空间中一段权限一致、由同一物理内存对象支撑的连续虚拟地址范围
#[derive(Debug, Clone)]
pub struct VmRegion {
    start: Vaddr,
    size: usize,
    perm: VmrPerm,
    pmo: Arc<PhysMemObject>,
}

impl VmRegion {
    /// 创建一个虚拟内存区域
    pub fn new(start: Vaddr, size: usize, perm: VmrPerm, pmo: Arc<PhysMemObject>) -> Self {
        VmRegion {
            start,
            size,
            perm,
            pmo,
        }
    }

    /// 区域起始地址
    pub fn start(&self) -> Vaddr {
        self.start
    }

    /// 区域大小（字节）
    pub fn size(&self) -> usize {
        self.size
    }

    /// 区域结束地址（不包含）
    pub fn end(&self) -> Vaddr {
        self.start.add(self.size)
    }

    /// 区域权限
    pub fn perm(&self) -> VmrPerm {
        self.perm
    }

    /// 支撑该区域的物理内存对象
    pub fn pmo(&self) -> &Arc<PhysMemObject> {
        &self.pmo
    }

    /// `va` 是否落在区域内
    pub fn contains(&self, va: Vaddr) -> bool {
        va >= self.start && va < self.end()
    }

    /// 两个区域是否重叠
    pub fn overlaps(&self, other: &VmRegion) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}
