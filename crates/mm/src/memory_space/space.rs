//! 地址空间核心实现

use alloc::collections::btree_map::BTreeMap;

use super::region::{VmRegion, VmrPerm};
use crate::address::{AlignOps, Paddr, UsizeConvert, Vaddr};
use crate::config::PAGE_SIZE;
use crate::page_table::{PageTable, PagingError, PagingResult};

/// 表示一个地址空间的结构体
#[derive(Debug)]
pub struct VmSpace<PT: PageTable> {
    /// 与此地址空间关联的页表
    page_table: PT,

    /// 按起始地址排序的虚拟内存区域
    regions: BTreeMap<Vaddr, VmRegion>,
}

impl<PT: PageTable> VmSpace<PT> {
    /// 用给定页表创建一个没有任何区域的地址空间
    pub fn new(page_table: PT) -> Self {
        VmSpace {
            page_table,
            regions: BTreeMap::new(),
        }
    }

    /// 返回页表的引用
    pub fn page_table(&self) -> &PT {
        &self.page_table
    }

    /// 遍历所有区域
    pub fn regions(&self) -> impl Iterator<Item = &VmRegion> {
        self.regions.values()
    }

    /// 插入一个新的区域并检测重叠。
    ///
    /// 区域必须按页对齐且非空；只登记区域，不建立任何页表映射。
    pub fn add_region(&mut self, region: VmRegion) -> PagingResult<()> {
        if region.size() == 0
            || !region.start().is_aligned(PAGE_SIZE)
            || region.size() % PAGE_SIZE != 0
        {
            return Err(PagingError::InvalidAddress);
        }
        region
            .start()
            .as_usize()
            .checked_add(region.size())
            .ok_or(PagingError::InvalidAddress)?;

        let prev = self.regions.range(..region.start()).next_back();
        let next = self.regions.range(region.start()..).next();
        if prev.into_iter().chain(next).any(|(_, r)| r.overlaps(&region)) {
            return Err(PagingError::AlreadyMapped);
        }

        self.regions.insert(region.start(), region);
        Ok(())
    }

    /// 移除起始于 `start` 的区域。
    ///
    /// 已建立的页表映射保持不变，由调用者负责解除。
    pub fn remove_region(&mut self, start: Vaddr) -> Option<VmRegion> {
        self.regions.remove(&start)
    }

    /// 查找覆盖 `va` 的区域
    pub fn find_region(&self, va: Vaddr) -> Option<&VmRegion> {
        self.regions
            .range(..=va)
            .next_back()
            .map(|(_, region)| region)
            .filter(|region| region.contains(va))
    }

    /// 在本地址空间的页表中建立映射
    pub fn map_range(
        &mut self,
        va: Vaddr,
        pa: Paddr,
        len: usize,
        perm: VmrPerm,
    ) -> PagingResult<()> {
        self.page_table.map_range(va, pa, len, perm)
    }

    /// 翻译虚拟地址到物理地址
    pub fn translate(&self, va: Vaddr) -> Option<Paddr> {
        self.page_table.query(va).map(|(pa, _)| pa)
    }
}
