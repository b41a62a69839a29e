//! 缺页异常处理
//!
//! 分两个阶段：
//!
//! 1. [`do_page_fault`]：在陷入路径上读取故障地址与 ESR，按故障状态码分类。
//!    第 0~3 级转换错误进入解析阶段；其他状态码说明内核处于无法验证的状态，直接 panic。
//!    解析失败时以对应错误码终止触发缺页的执行上下文。
//! 2. [`handle_trans_fault`]：为首次访问匿名区域的地址分配一个清零的 0 阶页，
//!    并把故障地址所在的整页映射到该页。
//!
//! 任何一步失败都统一报告为“无法映射”（[`ENOMAPPING`]），
//! 映射失败时已分配的页会归还给伙伴系统。

pub mod esr;


use core::fmt;

use crate::address::{AlignOps, Paddr, UsizeConvert, Vaddr};
use crate::arch_ops::arch_ops;
use crate::buddy::{LockedPool, PageGuard};
use crate::config::{self, PAGE_SIZE};
use crate::memory_space::{PmoType, VmSpace};
use crate::page_table::{PageTable, PagingError};
use esr::FaultStatus;

/// 无法为故障地址建立映射
pub const ENOMAPPING: isize = 200;

/// 转换错误无法解析的原因
///
/// 所有原因对外都表现为同一个错误码 `-ENOMAPPING`，区分它们只为日志。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultError {
    /// 没有区域覆盖故障地址
    NoRegion,
    /// 区域的后备对象不是匿名内存
    UnsupportedPmo(PmoType),
    /// 伙伴系统在任何阶上都没有空闲页
    OutOfMemory,
    /// 页表拒绝建立映射
    MapFailed(PagingError),
}

impl FaultError {
    /// 终止执行上下文时使用的错误码
    pub const fn errno(&self) -> isize {
        -ENOMAPPING
    }
}

impl fmt::Display for FaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultError::NoRegion => f.write_str("no vmregion covers the address"),
            FaultError::UnsupportedPmo(ty) => write!(f, "pmo type {:?} is not anonymous", ty),
            FaultError::OutOfMemory => f.write_str("could not get a new page"),
            FaultError::MapFailed(err) => write!(f, "map range in page table failed: {}", err),
        }
    }
}

/// 触发缺页的执行上下文在陷入时的状态
pub trait FaultContext {
    /// 该上下文地址空间使用的页表
    type PageTable: PageTable;

    /// 故障地址寄存器（FAR_EL1）中的数据地址
    fn fault_addr(&self) -> Vaddr;

    /// 该上下文的地址空间
    fn vmspace(&mut self) -> &mut VmSpace<Self::PageTable>;

    /// 以 `err` 终止该执行上下文
    fn exit(&mut self, err: FaultError);
}

/// 缺页异常入口。
///
/// # 参数
///
/// * `ctx` - 触发缺页的执行上下文
/// * `pool` - 提供物理页的伙伴系统
/// * `esr` - 异常综合寄存器的值
/// * `fault_ins_addr` - 触发缺页的指令地址
///
/// # Panics
///
/// 故障状态码不是第 0~3 级转换错误时 panic。
pub fn do_page_fault<C, const MAX_ORDER: usize>(
    ctx: &mut C,
    pool: &LockedPool<'_, { config::PAGE_SHIFT }, MAX_ORDER>,
    esr: u64,
    fault_ins_addr: Vaddr,
) where
    C: FaultContext,
{
    let fault_addr = ctx.fault_addr();
    let fsc = esr::fsc(esr);

    match FaultStatus::from_fsc(fsc) {
        FaultStatus::Translation(level) => {
            log::debug!(
                "pgfault: level {} translation fault at {:#x} ({}), pc {:#x}",
                level,
                fault_addr,
                access_kind(esr),
                fault_ins_addr
            );
            if let Err(err) = handle_trans_fault(ctx.vmspace(), pool, fault_addr) {
                log::info!("pgfault at {:#x} failed: {}", fault_addr, err);
                ctx.exit(err);
            }
        }
        status => {
            log::error!(
                "do_page_fault: fsc is unsupported ({:#08b}: {}) at {:#x}, pc {:#x}",
                fsc,
                status,
                fault_addr,
                fault_ins_addr
            );
            panic!("do_page_fault: unsupported fault status {:#08b}", fsc);
        }
    }
}

fn access_kind(esr: u64) -> &'static str {
    if esr::is_instruction_abort(esr) {
        "fetch"
    } else if esr::is_write(esr) {
        "write"
    } else {
        "read"
    }
}

/// 解析一次转换错误：分配一页并映射到故障地址所在的页。
///
/// 成功后由陷入返回路径重新执行故障指令。
/// 内存池的页大小必须与页表一致，故只接受 `config::PAGE_SHIFT` 的池。
pub fn handle_trans_fault<PT, const MAX_ORDER: usize>(
    space: &mut VmSpace<PT>,
    pool: &LockedPool<'_, { config::PAGE_SHIFT }, MAX_ORDER>,
    fault_addr: Vaddr,
) -> Result<(), FaultError>
where
    PT: PageTable,
{
    let region = space.find_region(fault_addr).ok_or_else(|| {
        log::debug!("pgfault: could not find vmregion for {:#x}", fault_addr);
        FaultError::NoRegion
    })?;

    let pmo_type = region.pmo().pmo_type();
    if pmo_type != PmoType::Anonym {
        log::debug!("pgfault: pmo type {:?} is not anonymous", pmo_type);
        return Err(FaultError::UnsupportedPmo(pmo_type));
    }
    let perm = region.perm();

    let page = PageGuard::alloc_zeroed(pool, 0).ok_or_else(|| {
        log::debug!("pgfault: could not get a new page");
        FaultError::OutOfMemory
    })?;

    // SAFETY: 伙伴系统管理的地址都位于内核直接映射区
    let pa = Paddr::new(unsafe { arch_ops().vaddr_to_paddr(page.addr().as_usize()) });
    let va = fault_addr.align_down(PAGE_SIZE);

    // 映射失败时 page 在返回前被 Drop，归还伙伴系统
    space
        .map_range(va, pa, PAGE_SIZE, perm)
        .map_err(|err| {
            log::debug!("pgfault: map {:#x} -> {:#x} failed: {}", va, pa, err);
            FaultError::MapFailed(err)
        })?;

    page.leak();
    log::debug!("pgfault: mapped {:#x} -> {:#x} ({:?})", va, pa, perm);
    Ok(())
}
