//! 物理页元数据

/// 页元数据数组中的下标，一一对应池中的一个物理页帧。
///
/// 页元数据与地址之间只做下标换算，不保存互相指向的指针。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageId(pub(super) usize);

impl PageId {
    /// 页帧在池中的序号
    pub const fn index(self) -> usize {
        self.0
    }
}

/// 空闲链表中的双向链接
#[derive(Debug, Clone, Copy, Default)]
pub(super) struct Link {
    pub(super) prev: Option<PageId>,
    pub(super) next: Option<PageId>,
}

/// 单个物理页帧的元数据
///
/// 只有空闲块的首页会挂在空闲链表上并标记为未分配；
/// 块内其余页以及已分配块中的页都标记为已分配。
/// `head` 区分块的首页与块内页，只有已分配块的首页可以被释放。
#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub(super) order: usize,
    pub(super) allocated: bool,
    pub(super) head: bool,
    pub(super) node: Link,
}

impl Page {
    /// 以该页为首页的块的阶数
    pub fn order(&self) -> usize {
        self.order
    }

    /// 是否已分配（或属于某个块的非首页）
    pub fn is_allocated(&self) -> bool {
        self.allocated
    }

    /// 是否为某个块（空闲或已分配）的首页
    pub fn is_head(&self) -> bool {
        self.head
    }
}
