//! ESR_EL1（异常综合寄存器）解码
//!
//! 缺页处理只依据 DFSC/IFSC（低 6 位）分类，其余字段仅用于日志。

use core::fmt;

/// 故障状态码（FSC）掩码
pub const ESR_EL1_FSC_MASK: u64 = 0x3f;
/// 数据访问方向位：1 表示写
pub const ESR_EL1_WNR: u64 = 1 << 6;
/// 异常类别（EC）偏移
pub const ESR_EL1_EC_SHIFT: u64 = 26;
/// 异常类别（EC）掩码
pub const ESR_EL1_EC_MASK: u64 = 0x3f;

/// 来自低异常级的指令中止
pub const ESR_EL1_EC_IABT_LEL: u8 = 0x20;
/// 来自当前异常级的指令中止
pub const ESR_EL1_EC_IABT_CEL: u8 = 0x21;
/// 来自低异常级的数据中止
pub const ESR_EL1_EC_DABT_LEL: u8 = 0x24;
/// 来自当前异常级的数据中止
pub const ESR_EL1_EC_DABT_CEL: u8 = 0x25;

/// 第 0 级转换错误
pub const DFSC_TRANS_FAULT_L0: u8 = 0b000100;
/// 第 1 级转换错误
pub const DFSC_TRANS_FAULT_L1: u8 = 0b000101;
/// 第 2 级转换错误
pub const DFSC_TRANS_FAULT_L2: u8 = 0b000110;
/// 第 3 级转换错误
pub const DFSC_TRANS_FAULT_L3: u8 = 0b000111;

/// 取出故障状态码
pub fn fsc(esr: u64) -> u8 {
    (esr & ESR_EL1_FSC_MASK) as u8
}

/// 取出异常类别
pub fn ec(esr: u64) -> u8 {
    ((esr >> ESR_EL1_EC_SHIFT) & ESR_EL1_EC_MASK) as u8
}

/// 是否为指令中止（取指引起的缺页）
pub fn is_instruction_abort(esr: u64) -> bool {
    matches!(ec(esr), ESR_EL1_EC_IABT_LEL | ESR_EL1_EC_IABT_CEL)
}

/// 数据中止是否由写操作引起
pub fn is_write(esr: u64) -> bool {
    matches!(ec(esr), ESR_EL1_EC_DABT_LEL | ESR_EL1_EC_DABT_CEL) && esr & ESR_EL1_WNR != 0
}

/// 故障状态码的分类，`u8` 字段为页表级数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultStatus {
    /// 地址大小错误
    AddressSize(u8),
    /// 转换错误：页表遍历在该级找不到有效项
    Translation(u8),
    /// 访问标志错误
    AccessFlag(u8),
    /// 权限错误
    Permission(u8),
    /// 同步外部中止
    SyncExternal,
    /// 对齐错误
    Alignment,
    /// TLB 冲突
    TlbConflict,
    /// 其他故障状态码
    Other(u8),
}

impl FaultStatus {
    /// 解码故障状态码
    pub fn from_fsc(fsc: u8) -> Self {
        let level = fsc & 0b11;
        match fsc & ESR_EL1_FSC_MASK as u8 {
            0b000000..=0b000011 => FaultStatus::AddressSize(level),
            DFSC_TRANS_FAULT_L0..=DFSC_TRANS_FAULT_L3 => FaultStatus::Translation(level),
            0b001000..=0b001011 => FaultStatus::AccessFlag(level),
            0b001100..=0b001111 => FaultStatus::Permission(level),
            0b010000 => FaultStatus::SyncExternal,
            0b100001 => FaultStatus::Alignment,
            0b110000 => FaultStatus::TlbConflict,
            other => FaultStatus::Other(other),
        }
    }

    /// 从 ESR 解码
    pub fn from_esr(esr: u64) -> Self {
        Self::from_fsc(fsc(esr))
    }
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultStatus::AddressSize(level) => write!(f, "address size fault, level {}", level),
            FaultStatus::Translation(level) => write!(f, "translation fault, level {}", level),
            FaultStatus::AccessFlag(level) => write!(f, "access flag fault, level {}", level),
            FaultStatus::Permission(level) => write!(f, "permission fault, level {}", level),
            FaultStatus::SyncExternal => f.write_str("synchronous external abort"),
            FaultStatus::Alignment => f.write_str("alignment fault"),
            FaultStatus::TlbConflict => f.write_str("TLB conflict abort"),
            FaultStatus::Other(fsc) => write!(f, "fault status {:#08b}", fsc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_abort(fsc: u8, write: bool) -> u64 {
        let wnr = if write { ESR_EL1_WNR } else { 0 };
        ((ESR_EL1_EC_DABT_LEL as u64) << ESR_EL1_EC_SHIFT) | wnr | fsc as u64
    }

    #[test]
    fn test_translation_levels() {
        for (level, code) in [
            DFSC_TRANS_FAULT_L0,
            DFSC_TRANS_FAULT_L1,
            DFSC_TRANS_FAULT_L2,
            DFSC_TRANS_FAULT_L3,
        ]
        .into_iter()
        .enumerate()
        {
            assert_eq!(
                FaultStatus::from_esr(data_abort(code, false)),
                FaultStatus::Translation(level as u8)
            );
        }
    }

    #[test]
    fn test_other_statuses() {
        assert_eq!(FaultStatus::from_fsc(0b001111), FaultStatus::Permission(3));
        assert_eq!(FaultStatus::from_fsc(0b001001), FaultStatus::AccessFlag(1));
        assert_eq!(FaultStatus::from_fsc(0b000010), FaultStatus::AddressSize(2));
        assert_eq!(FaultStatus::from_fsc(0b100001), FaultStatus::Alignment);
        assert_eq!(FaultStatus::from_fsc(0b111101), FaultStatus::Other(0b111101));
    }

    #[test]
    fn test_access_kind() {
        assert!(is_write(data_abort(DFSC_TRANS_FAULT_L3, true)));
        assert!(!is_write(data_abort(DFSC_TRANS_FAULT_L3, false)));

        let iabt = ((ESR_EL1_EC_IABT_LEL as u64) << ESR_EL1_EC_SHIFT) | ESR_EL1_WNR | 0b000111;
        assert!(is_instruction_abort(iabt));
        assert!(!is_write(iabt));
        assert_eq!(ec(iabt), ESR_EL1_EC_IABT_LEL);
        assert_eq!(fsc(iabt), DFSC_TRANS_FAULT_L3);
    }
}
