//! 内存空间模块
//!
//! 本模块定义了地址空间 [`VmSpace`] 及其中的虚拟内存区域 [`VmRegion`]。
//! 缺页处理只通过它查找覆盖某地址的区域、读取区域权限与后备对象类型，
//! 并请求页表建立映射；区域的拆分与权限计算不在此实现。

mod region;
mod space;

pub use region::{PhysMemObject, PmoType, VmRegion, VmrPerm};
pub use space::VmSpace;
