//! 自旋锁实现
//!
//! 基于原子操作实现 [`lock_api::RawMutex`]，持锁期间本地中断保持关闭。

use crate::intr_guard::IntrGuard;
use core::{
    hint,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

/// 关中断自旋锁。
///
/// 加锁时先关闭本地中断再自旋抢锁，进入前的中断状态保存在锁内部，
/// 解锁时先释放锁标志再恢复中断。不可重入。
#[derive(Debug)]
pub struct RawSpinLock {
    lock: AtomicBool,
    /// 持锁者进入临界区前的中断状态
    saved_flags: AtomicUsize,
}

impl RawSpinLock {
    /// 创建一个新的 RawSpinLock 实例。
    pub const fn new() -> Self {
        RawSpinLock {
            lock: AtomicBool::new(false),
            saved_flags: AtomicUsize::new(0),
        }
    }

    fn acquired(&self, guard: IntrGuard) {
        self.saved_flags.store(guard.into_flags(), Ordering::Relaxed);
    }
}

impl Default for RawSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock::new();

    type GuardMarker = lock_api::GuardNoSend;

    fn lock(&self) {
        let guard = IntrGuard::new();

        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            hint::spin_loop();
        }

        self.acquired(guard);
    }

    fn try_lock(&self) -> bool {
        let guard = IntrGuard::new();

        if self
            .lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.acquired(guard);
            true
        } else {
            // guard 在此处 Drop，立即恢复中断
            false
        }
    }

    unsafe fn unlock(&self) {
        let flags = self.saved_flags.load(Ordering::Relaxed);
        self.lock.store(false, Ordering::Release);
        // SAFETY: flags 由本次加锁时的 IntrGuard::into_flags 产生
        drop(unsafe { IntrGuard::from_flags(flags) });
    }

    fn is_locked(&self) -> bool {
        self.lock.load(Ordering::Relaxed)
    }
}
