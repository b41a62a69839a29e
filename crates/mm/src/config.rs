//! 内存管理配置常量
//!
//! 伙伴分配器把页大小与最大阶数作为自身类型的 const 参数，
//! 这里给出内核默认使用的取值。

/// 页大小的位数
pub const PAGE_SHIFT: usize = 12;

/// 页大小（4 KiB）
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

/// 伙伴系统的阶数上限（不含），最大块为 `PAGE_SIZE << (BUDDY_MAX_ORDER - 1)`
pub const BUDDY_MAX_ORDER: usize = 14;
