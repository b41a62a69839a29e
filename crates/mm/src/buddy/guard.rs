//! 共享内存池与 RAII 页块

use sync::SpinLock;

use super::{PageId, PhysMemPool};
use crate::address::Vaddr;
use crate::config;

/// 由自旋锁保护的内存池，内核中所有分配/释放都经由它完成。
pub type LockedPool<
    'a,
    const PAGE_SHIFT: usize = { config::PAGE_SHIFT },
    const MAX_ORDER: usize = { config::BUDDY_MAX_ORDER },
> = SpinLock<PhysMemPool<'a, PAGE_SHIFT, MAX_ORDER>>;

/// 已分配页块的跟踪器。
/// 实现了 RAII 模式：Drop 时自动把页块归还给所属的内存池，
/// 调用 [`PageGuard::leak`] 后所有权永久交给调用者。
pub struct PageGuard<'p, 'a, const PAGE_SHIFT: usize, const MAX_ORDER: usize> {
    pool: &'p LockedPool<'a, PAGE_SHIFT, MAX_ORDER>,
    page: PageId,
    addr: Vaddr,
    order: usize,
}

impl<'p, 'a, const PAGE_SHIFT: usize, const MAX_ORDER: usize>
    PageGuard<'p, 'a, PAGE_SHIFT, MAX_ORDER>
{
    /// 从 `pool` 分配一个 `order` 阶的块，池耗尽时返回 `None`。
    pub fn alloc(pool: &'p LockedPool<'a, PAGE_SHIFT, MAX_ORDER>, order: usize) -> Option<Self> {
        let mut inner = pool.lock();
        let page = inner.alloc_pages(order)?;
        let addr = inner.page_to_virt(page);
        drop(inner);
        Some(PageGuard {
            pool,
            page,
            addr,
            order,
        })
    }

    /// 分配一个 `order` 阶的块并清零。
    pub fn alloc_zeroed(
        pool: &'p LockedPool<'a, PAGE_SHIFT, MAX_ORDER>,
        order: usize,
    ) -> Option<Self> {
        let guard = Self::alloc(pool, order)?;
        // SAFETY: 块已从空闲链表摘下，由本 guard 独占；池内地址均可直接访问
        unsafe {
            core::ptr::write_bytes(guard.addr.as_mut_ptr::<u8>(), 0, guard.size());
        }
        Some(guard)
    }

    /// 块的首页
    pub fn page(&self) -> PageId {
        self.page
    }

    /// 块的起始地址
    pub fn addr(&self) -> Vaddr {
        self.addr
    }

    /// 块的阶数
    pub fn order(&self) -> usize {
        self.order
    }

    /// 块的字节数
    pub fn size(&self) -> usize {
        PhysMemPool::<'a, PAGE_SHIFT, MAX_ORDER>::PAGE_SIZE << self.order
    }

    /// 放弃自动回收，返回块的首页。
    pub fn leak(self) -> PageId {
        let page = self.page;
        core::mem::forget(self);
        page
    }
}

impl<const PAGE_SHIFT: usize, const MAX_ORDER: usize> Drop
    for PageGuard<'_, '_, PAGE_SHIFT, MAX_ORDER>
{
    /// 自动归还页块。
    fn drop(&mut self) {
        // 失败时 free_pages 已记录警告
        let _ = self.pool.lock().free_pages(self.page);
    }
}
