//! 工具函数模块

mod helpers;

pub use helpers::*;

#[cfg(test)]
mod scope_utils_tests;
