//! Mock 实现
//!
//! 被测 crate 在 `cfg(test)` 下为这些类型实现自己的 trait。

pub mod arch;
pub mod mm;
