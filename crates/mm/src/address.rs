//! 地址模块
//!
//! 提供物理地址 [`Paddr`] 与虚拟地址 [`Vaddr`] 两种新类型，
//! 避免在伙伴分配器、页表与缺页处理之间混用两类地址。

use core::fmt;

/// 在类型和 usize 之间进行转换
pub trait UsizeConvert: Copy {
    /// 从 usize 构造
    fn from_usize(value: usize) -> Self;
    /// 转换为 usize
    fn as_usize(&self) -> usize;
}

/// 地址对齐操作
///
/// `align` 必须是 2 的幂。
pub trait AlignOps: UsizeConvert {
    /// 向下对齐
    fn align_down(self, align: usize) -> Self {
        debug_assert!(align.is_power_of_two());
        Self::from_usize(self.as_usize() & !(align - 1))
    }

    /// 向上对齐
    fn align_up(self, align: usize) -> Self {
        debug_assert!(align.is_power_of_two());
        Self::from_usize((self.as_usize() + align - 1) & !(align - 1))
    }

    /// 是否已对齐
    fn is_aligned(self, align: usize) -> bool {
        debug_assert!(align.is_power_of_two());
        self.as_usize() & (align - 1) == 0
    }

    /// 地址在 `align` 大小块内的偏移
    fn offset_in(self, align: usize) -> usize {
        debug_assert!(align.is_power_of_two());
        self.as_usize() & (align - 1)
    }
}

macro_rules! impl_address {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(usize);

        impl $name {
            /// 构造地址
            pub const fn new(addr: usize) -> Self {
                Self(addr)
            }

            /// 转换为裸指针
            pub fn as_mut_ptr<T>(self) -> *mut T {
                self.0 as *mut T
            }

            /// 加上字节偏移
            pub const fn add(self, offset: usize) -> Self {
                Self(self.0 + offset)
            }
        }

        impl UsizeConvert for $name {
            fn from_usize(value: usize) -> Self {
                Self(value)
            }

            fn as_usize(&self) -> usize {
                self.0
            }
        }

        impl AlignOps for $name {}

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }

        impl fmt::LowerHex for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(&self.0, f)
            }
        }
    };
}

impl_address!(
    /// 物理地址
    Paddr
);
impl_address!(
    /// 虚拟地址
    Vaddr
);
