//! 按阶组织的空闲链表
//!
//! 链接节点保存在 [`Page`] 元数据中，链表本身只记录表头与块数。

use super::page::{Link, Page, PageId};
use super::BuddyError;

/// 某一阶的空闲链表
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeList {
    pub(super) head: Option<PageId>,
    pub(super) nr_free: usize,
}

impl FreeList {
    /// 空链表
    pub const EMPTY: Self = FreeList {
        head: None,
        nr_free: 0,
    };

    /// 链表中的空闲块数
    pub fn nr_free(&self) -> usize {
        self.nr_free
    }

    /// 把 `id` 插入表头
    pub(super) fn push(&mut self, pages: &mut [Page], id: PageId) {
        pages[id.0].node.prev = None;
        pages[id.0].node.next = self.head;
        if let Some(head) = self.head {
            pages[head.0].node.prev = Some(id);
        }
        self.head = Some(id);
        self.nr_free += 1;
    }

    /// 把 `id` 从链表中摘下
    pub(super) fn remove(&mut self, pages: &mut [Page], id: PageId) -> Result<(), BuddyError> {
        let Link { prev, next } = pages[id.0].node;
        match prev {
            Some(prev) => pages[prev.0].node.next = next,
            None if self.head == Some(id) => self.head = next,
            None => return Err(BuddyError::NotInFreeList(id.0)),
        }
        if let Some(next) = next {
            pages[next.0].node.prev = prev;
        }
        pages[id.0].node = Link::default();
        self.nr_free -= 1;
        Ok(())
    }

    /// 按链表顺序遍历空闲块首页
    pub(super) fn iter<'a>(&self, pages: &'a [Page]) -> FreeListIter<'a> {
        FreeListIter {
            pages,
            cur: self.head,
        }
    }
}

/// 空闲链表迭代器
pub struct FreeListIter<'a> {
    pages: &'a [Page],
    cur: Option<PageId>,
}

impl Iterator for FreeListIter<'_> {
    type Item = PageId;

    fn next(&mut self) -> Option<PageId> {
        let cur = self.cur?;
        self.cur = self.pages[cur.0].node.next;
        Some(cur)
    }
}
