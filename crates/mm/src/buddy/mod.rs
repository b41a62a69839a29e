//! 伙伴系统物理页分配器
//!
//! 一个 [`PhysMemPool`] 管理一段连续的物理内存（以内核直接映射区地址表示）：
//!
//! ```text
//! | 页元数据数组 (Page[]) | 对齐填充 | 可用内存 [start_addr, start_addr + mem_size) |
//! ```
//!
//! ## 分配策略
//!
//! - 每个阶 `k` 维护一条空闲链表，链表中每个元素是一个 `1 << k` 页的空闲块，
//!   块的起始页号总是 `1 << k` 的整数倍。
//! - 分配：从请求的阶向上找到第一条非空链表，取表头块，
//!   逐次对半拆分，后半块作为伙伴挂回低一阶的链表，直到降到请求的阶。
//! - 释放：把块挂回本阶链表后尝试与伙伴合并，伙伴空闲且同阶时
//!   以低地址块为准升一阶，直到无法合并或到达最高阶。
//! - 伙伴地址：块在池内的偏移异或 `1 << (order + PAGE_SHIFT)`。
//!
//! ## 初始化
//!
//! 初始化时先把所有页标记为已分配的 0 阶页，再按升序逐页释放，
//! 由合并逻辑构建出初始的最大对齐块。初始化与运行期释放走同一条路径。
//!
//! ## 并发
//!
//! [`PhysMemPool`] 本身不加锁，共享时必须包在 [`LockedPool`] 中，
//! 每次分配/释放都在自旋锁（关中断）保护下完成。

mod free_list;
mod guard;
mod page;


pub use free_list::{FreeList, FreeListIter};
pub use guard::{LockedPool, PageGuard};
pub use page::{Page, PageId};

use core::fmt;

use crate::address::{AlignOps, UsizeConvert, Vaddr};
use crate::config;

/// 伙伴分配器的契约错误
///
/// 都意味着调用者的 bug 或元数据被破坏，只会记录警告并中止当前操作，不会让内核崩溃。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuddyError {
    /// 释放一个未分配的页
    DoubleFree(usize),
    /// 页号超出池的范围
    OutOfPool(usize),
    /// 页位于某个块内部，不是块的首页
    NotBlockHead(usize),
    /// 对已分配的块执行拆分或合并
    Allocated(usize),
    /// 块不在其阶对应的空闲链表中
    NotInFreeList(usize),
    /// 请求的阶不小于最大阶
    InvalidOrder(usize),
}

impl fmt::Display for BuddyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuddyError::DoubleFree(idx) => write!(f, "page {} is not allocated", idx),
            BuddyError::OutOfPool(idx) => write!(f, "page {} is outside the pool", idx),
            BuddyError::NotBlockHead(idx) => write!(f, "page {} is not the head of a block", idx),
            BuddyError::Allocated(idx) => write!(f, "block at page {} is allocated", idx),
            BuddyError::NotInFreeList(idx) => {
                write!(f, "block at page {} is missing from its free list", idx)
            }
            BuddyError::InvalidOrder(order) => write!(f, "order {} is out of range", order),
        }
    }
}

/// 分配器当前状态的快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuddyStats {
    /// 池中总页数
    pub total_pages: usize,
    /// 空闲页数
    pub free_pages: usize,
    /// 非空空闲链表中的最高阶
    pub largest_free_order: Option<usize>,
}

/// 物理内存池
///
/// 页大小与阶数上限作为类型参数，不同参数的池可以共存。
pub struct PhysMemPool<
    'a,
    const PAGE_SHIFT: usize = { config::PAGE_SHIFT },
    const MAX_ORDER: usize = { config::BUDDY_MAX_ORDER },
> {
    /// 可用内存的起始地址
    start_addr: Vaddr,
    /// 每个物理页帧一项元数据
    pages: &'a mut [Page],
    /// 可用内存字节数，恒等于 `pages.len() << PAGE_SHIFT`
    mem_size: usize,
    free_lists: [FreeList; MAX_ORDER],
}

impl<'a, const PAGE_SHIFT: usize, const MAX_ORDER: usize> PhysMemPool<'a, PAGE_SHIFT, MAX_ORDER> {
    /// 页大小的位数
    pub const PAGE_SHIFT: usize = PAGE_SHIFT;
    /// 页大小
    pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;
    /// 阶数上限（不含）
    pub const MAX_ORDER: usize = MAX_ORDER;

    /// 初始化内存池。
    ///
    /// # 参数
    ///
    /// * `metadata` - 预留的页元数据存储，至少 `page_num` 项
    /// * `start_addr` - 可用内存起始地址
    /// * `page_num` - 可用内存页数
    ///
    /// # Panics
    ///
    /// 起始地址未按页对齐、元数据存储不足或阶数参数非法时 panic。
    pub fn init(metadata: &'a mut [Page], start_addr: Vaddr, page_num: usize) -> Self {
        assert!(
            MAX_ORDER > 0 && PAGE_SHIFT + MAX_ORDER < usize::BITS as usize,
            "buddy: invalid parameters (page shift {}, max order {})",
            PAGE_SHIFT,
            MAX_ORDER
        );
        assert!(
            start_addr.is_aligned(Self::PAGE_SIZE),
            "buddy: pool start {:#x} is not page aligned",
            start_addr
        );
        assert!(
            metadata.len() >= page_num,
            "buddy: metadata holds {} pages, {} required",
            metadata.len(),
            page_num
        );

        let pages = &mut metadata[..page_num];
        pages.fill(Page::default());
        for page in pages.iter_mut() {
            page.allocated = true;
            page.head = true;
            page.order = 0;
        }

        let mut pool = PhysMemPool {
            start_addr,
            pages,
            mem_size: page_num << PAGE_SHIFT,
            free_lists: [FreeList::EMPTY; MAX_ORDER],
        };

        for idx in 0..page_num {
            let freed = pool.free_pages(PageId(idx));
            debug_assert!(freed.is_ok(), "buddy: seeding page {} failed: {:?}", idx, freed);
        }

        log::info!(
            "buddy: pool [{:#x}, {:#x}) initialized with {} pages",
            start_addr,
            start_addr.add(pool.mem_size),
            page_num
        );
        pool
    }

    /// 分配 `1 << order` 个连续页。
    ///
    /// 从 `order` 开始向上寻找第一条非空的空闲链表并取其表头块，
    /// 没有足够大的空闲块时返回 `None`。
    pub fn alloc_pages(&mut self, order: usize) -> Option<PageId> {
        if order >= MAX_ORDER {
            log::warn!("buddy: alloc_pages: {}", BuddyError::InvalidOrder(order));
            return None;
        }

        let Some(cur_order) = (order..MAX_ORDER).find(|&o| self.free_lists[o].nr_free > 0) else {
            log::warn!("buddy: no free chunk for order {}", order);
            return None;
        };

        let head = self.free_lists[cur_order].head?;
        match self.split_page(order, head) {
            Ok(page) => {
                self.pages[page.0].allocated = true;
                Some(page)
            }
            Err(err) => {
                log::warn!("buddy: alloc_pages: split failed: {}", err);
                None
            }
        }
    }

    /// 把块归还给伙伴系统并尽可能与伙伴合并。
    ///
    /// 重复释放、释放块内页或越界的页会被拒绝：记录警告并保持池不变。
    pub fn free_pages(&mut self, page: PageId) -> Result<(), BuddyError> {
        let result = self.release(page);
        if let Err(err) = result {
            log::warn!("buddy: free_pages rejected: {}", err);
        }
        result
    }

    fn release(&mut self, page: PageId) -> Result<(), BuddyError> {
        let meta = self
            .pages
            .get_mut(page.0)
            .ok_or(BuddyError::OutOfPool(page.0))?;
        // 已并入伙伴块的页不再是首页，重复释放它同样被拒绝
        if !meta.head {
            return Err(BuddyError::NotBlockHead(page.0));
        }
        if !meta.allocated {
            return Err(BuddyError::DoubleFree(page.0));
        }
        meta.allocated = false;
        self.list_add(page);
        self.merge_page(page)?;
        Ok(())
    }

    /// 把空闲块 `page` 拆分到 `order` 阶，返回拆出的低地址块。
    fn split_page(&mut self, order: usize, page: PageId) -> Result<PageId, BuddyError> {
        if self.pages[page.0].allocated {
            return Err(BuddyError::Allocated(page.0));
        }
        self.list_del(page)?;

        while self.pages[page.0].order > order {
            let half = self.pages[page.0].order - 1;
            self.pages[page.0].order = half;
            // 后半块成为低一阶的空闲伙伴
            if let Some(buddy) = self.buddy_of(page) {
                let meta = &mut self.pages[buddy.0];
                meta.allocated = false;
                meta.head = true;
                meta.order = half;
                self.list_add(buddy);
            }
        }
        Ok(page)
    }

    /// 把空闲块 `page` 与其伙伴逐级合并，返回最终留在空闲链表中的块。
    fn merge_page(&mut self, page: PageId) -> Result<PageId, BuddyError> {
        if self.pages[page.0].allocated {
            return Err(BuddyError::Allocated(page.0));
        }
        self.list_del(page)?;

        let mut cur = page;
        while self.pages[cur.0].order < MAX_ORDER - 1 {
            let Some(buddy) = self.buddy_of(cur) else {
                break;
            };
            let buddy_meta = self.pages[buddy.0];
            if buddy_meta.allocated || buddy_meta.order != self.pages[cur.0].order {
                break;
            }
            self.list_del(buddy)?;

            let (low, high) = if buddy < cur { (buddy, cur) } else { (cur, buddy) };
            // 高地址一半成为块内页，不再单独可用
            self.pages[high.0].allocated = true;
            self.pages[high.0].head = false;
            self.pages[low.0].order += 1;
            cur = low;
        }

        self.list_add(cur);
        Ok(cur)
    }

    /// 与 `page` 同阶的伙伴块；伙伴落在池外时返回 `None`。
    fn buddy_of(&self, page: PageId) -> Option<PageId> {
        let order = self.pages[page.0].order;
        let offset = page.0 << PAGE_SHIFT;
        let buddy_offset = offset ^ (1 << (order + PAGE_SHIFT));
        if buddy_offset >= self.mem_size {
            return None;
        }
        Some(PageId(buddy_offset >> PAGE_SHIFT))
    }

    fn list_add(&mut self, page: PageId) {
        let order = self.pages[page.0].order;
        self.free_lists[order].push(&mut *self.pages, page);
    }

    fn list_del(&mut self, page: PageId) -> Result<(), BuddyError> {
        let order = self.pages[page.0].order;
        self.free_lists[order].remove(&mut *self.pages, page)
    }

    /// 页对应的起始地址
    pub fn page_to_virt(&self, page: PageId) -> Vaddr {
        self.start_addr.add(page.0 << PAGE_SHIFT)
    }

    /// 地址所在页。
    ///
    /// 只对池内地址有意义，池外地址由调用者负责排除（见 [`Self::contains`]）。
    pub fn virt_to_page(&self, addr: Vaddr) -> PageId {
        debug_assert!(self.contains(addr), "buddy: {:#x} is outside the pool", addr);
        PageId((addr.as_usize() - self.start_addr.as_usize()) >> PAGE_SHIFT)
    }

    /// 地址是否落在池内
    pub fn contains(&self, addr: Vaddr) -> bool {
        addr >= self.start_addr && addr.as_usize() - self.start_addr.as_usize() < self.mem_size
    }

    /// 所有空闲块的总字节数
    pub fn total_free_bytes(&self) -> usize {
        let mut total_size = 0;
        for (order, list) in self.free_lists.iter().enumerate() {
            let order_size = Self::PAGE_SIZE << order;
            total_size += list.nr_free * order_size;
            log::debug!(
                "buddy memory chunk order: {}, size: {:#x}, num: {}",
                order,
                order_size,
                list.nr_free
            );
        }
        total_size
    }

    /// 空闲页数
    pub fn free_page_count(&self) -> usize {
        self.free_lists
            .iter()
            .enumerate()
            .map(|(order, list)| list.nr_free << order)
            .sum()
    }

    /// 池中总页数
    pub fn total_pages(&self) -> usize {
        self.pages.len()
    }

    /// 可用内存字节数
    pub fn mem_size(&self) -> usize {
        self.mem_size
    }

    /// 可用内存起始地址
    pub fn start_addr(&self) -> Vaddr {
        self.start_addr
    }

    /// 第 `order` 阶空闲链表中的块数
    pub fn nr_free(&self, order: usize) -> usize {
        self.free_lists[order].nr_free
    }

    /// 遍历第 `order` 阶空闲链表
    pub fn free_list(&self, order: usize) -> FreeListIter<'_> {
        self.free_lists[order].iter(&*self.pages)
    }

    /// 页元数据
    pub fn page(&self, page: PageId) -> Option<&Page> {
        self.pages.get(page.0)
    }

    /// 获取分配器的当前状态
    pub fn stats(&self) -> BuddyStats {
        BuddyStats {
            total_pages: self.total_pages(),
            free_pages: self.free_page_count(),
            largest_free_order: (0..MAX_ORDER).rev().find(|&o| self.free_lists[o].nr_free > 0),
        }
    }
}
