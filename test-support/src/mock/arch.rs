//! 中断控制的 Mock 实现

use core::sync::atomic::{AtomicBool, Ordering};

/// Mock 中断控制
///
/// 只记录本地中断开关状态，不触碰任何硬件。
pub struct MockArchOps {
    pub interrupt_state: AtomicBool,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
        }
    }

    /// 关闭中断并返回之前的状态（1 = 开启）
    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.interrupt_state.swap(false, Ordering::SeqCst) as usize
    }

    /// 恢复之前保存的中断状态
    pub unsafe fn restore_interrupts(&self, flags: usize) {
        self.interrupt_state.store(flags != 0, Ordering::SeqCst);
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
