//! 宿主机单元测试环境
//!
//! 提供记录映射的页表替身，以及用宿主机堆内存充当物理内存的测试内存池。

extern crate test_support;

use alloc::boxed::Box;
use alloc::collections::btree_map::BTreeMap;
use alloc::vec;

use crate::address::{AlignOps, Paddr, UsizeConvert, Vaddr};
use crate::buddy::{Page, PhysMemPool};
use crate::config::PAGE_SIZE;
use crate::memory_space::VmrPerm;
use crate::page_table::{PageTable, PagingError, PagingResult};

/// 只记录映射关系的页表
#[derive(Debug, Default)]
pub struct MockPageTable {
    mappings: BTreeMap<Vaddr, (Paddr, VmrPerm)>,
    fail_with: Option<PagingError>,
    pub map_calls: usize,
}

impl MockPageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后的每次 map_range 都以 `err` 失败
    pub fn failing(err: PagingError) -> Self {
        MockPageTable {
            fail_with: Some(err),
            ..Self::default()
        }
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }
}

impl PageTable for MockPageTable {
    fn map_range(&mut self, va: Vaddr, pa: Paddr, len: usize, perm: VmrPerm) -> PagingResult<()> {
        self.map_calls += 1;
        if let Some(err) = self.fail_with {
            return Err(err);
        }
        if !va.is_aligned(PAGE_SIZE) || !pa.is_aligned(PAGE_SIZE) || len % PAGE_SIZE != 0 {
            return Err(PagingError::InvalidAddress);
        }
        if (0..len)
            .step_by(PAGE_SIZE)
            .any(|off| self.mappings.contains_key(&va.add(off)))
        {
            return Err(PagingError::AlreadyMapped);
        }
        for off in (0..len).step_by(PAGE_SIZE) {
            self.mappings.insert(va.add(off), (pa.add(off), perm));
        }
        Ok(())
    }

    fn query(&self, va: Vaddr) -> Option<(Paddr, VmrPerm)> {
        self.mappings
            .get(&va.align_down(PAGE_SIZE))
            .map(|&(pa, perm)| (pa.add(va.offset_in(PAGE_SIZE)), perm))
    }
}

struct TestIrq;

impl sync::ArchOps for TestIrq {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        unsafe { test_support::mock::arch::MOCK_ARCH_OPS.read_and_disable_interrupts() }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        unsafe { test_support::mock::arch::MOCK_ARCH_OPS.restore_interrupts(flags) }
    }
}

static TEST_IRQ: TestIrq = TestIrq;

/// 注册自旋锁所需的中断控制替身
pub fn init() {
    // SAFETY: 每次注册的都是同一个静态实例
    unsafe { sync::register_arch_ops(&TEST_IRQ) };
}

/// 用泄漏的宿主机堆内存构造一个 `page_num` 页的内存池
pub fn leak_pool<const PAGE_SHIFT: usize, const MAX_ORDER: usize>(
    page_num: usize,
) -> PhysMemPool<'static, PAGE_SHIFT, MAX_ORDER> {
    init();
    let page_size = 1 << PAGE_SHIFT;
    let arena: &'static mut [u8] =
        Box::leak(vec![0xa5u8; (page_num + 1) * page_size].into_boxed_slice());
    let start = Vaddr::new(arena.as_mut_ptr() as usize).align_up(page_size);
    let metadata: &'static mut [Page] =
        Box::leak(vec![Page::default(); page_num].into_boxed_slice());
    PhysMemPool::init(metadata, start, page_num)
}

/// 把 `va` 起始的一页读成字节切片
pub fn page_bytes(va: Vaddr) -> &'static [u8] {
    // SAFETY: 测试内存池的内存来自泄漏的堆分配，永不释放
    unsafe { core::slice::from_raw_parts(va.as_usize() as *const u8, PAGE_SIZE) }
}
