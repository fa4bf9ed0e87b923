//! CLI 模块
//!
//! 提供规则集的本地试运行入口：
//!
//! - `validate` - 校验规则文件，逐条输出字段级错误
//! - `execute` - 对上下文执行规则集，输出结果表
//! - `test` - 运行测试场景
//! - `explain` - 以可读形式输出规则
//!
//! # 使用示例
//!
//! ```bash
//! krule validate rules.json
//! krule execute rules.json context.json --trace
//! krule test rules.json scenarios.json
//! krule explain rules.json
//! ```

pub mod commands;
pub mod runner;

pub use commands::{Cli, Commands};
pub use runner::{engine_options, CommandRunner};
