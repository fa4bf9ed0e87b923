//! 自定义逻辑操作符注册表
//!
//! 注册表按实例隔离，不存在进程级全局状态。克隆得到的句柄共享同一张表，
//! 内部使用读写锁，可在多线程间共享。

use crate::error::{Result, RuleError};
use crate::operators::{GroupOperator, LogicalOperator};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// 自定义组合函数：输入子节点结果，输出组结果
pub type CombinatorFn = Arc<dyn Fn(&[bool]) -> bool + Send + Sync>;

/// 查找结果：内置组合器或已注册的自定义组合器
#[derive(Clone)]
pub enum Combinator {
    Builtin(LogicalOperator),
    Custom(CombinatorFn),
}

impl Combinator {
    pub fn combine(&self, results: &[bool]) -> bool {
        match self {
            Self::Builtin(op) => op.combine(results),
            Self::Custom(f) => f(results),
        }
    }
}

impl fmt::Debug for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(op) => write!(f, "Builtin({})", op),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// 操作符注册表
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    custom: Arc<RwLock<HashMap<String, CombinatorFn>>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册自定义组合器
    ///
    /// 名称不能为空，也不能与内置操作符（AND/OR/XOR/NAND/NOR）同名。
    /// 重复注册同名自定义操作符会替换原实现。
    pub fn register<F>(&self, name: impl Into<String>, combine: F) -> Result<()>
    where
        F: Fn(&[bool]) -> bool + Send + Sync + 'static,
    {
        let name = name.into();

        if name.trim().is_empty() {
            return Err(RuleError::InvalidOperatorName(name));
        }
        if LogicalOperator::from_name(&name).is_some() {
            warn!(operator = %name, "拒绝覆盖内置操作符");
            return Err(RuleError::OperatorNameCollision(name));
        }

        let replaced = self
            .custom
            .write()
            .insert(name.clone(), Arc::new(combine))
            .is_some();

        if replaced {
            warn!(operator = %name, "自定义操作符已被替换");
        } else {
            info!(operator = %name, "自定义操作符已注册");
        }
        Ok(())
    }

    /// 移除自定义操作符，返回是否存在
    pub fn unregister(&self, name: &str) -> bool {
        self.custom.write().remove(name).is_some()
    }

    /// 按名称查找组合器
    pub fn lookup(&self, name: &str) -> Option<Combinator> {
        if let Some(f) = self.custom.read().get(name) {
            return Some(Combinator::Custom(Arc::clone(f)));
        }
        LogicalOperator::from_name(name).map(Combinator::Builtin)
    }

    /// 解析逻辑组上的操作符
    pub fn resolve(&self, operator: &GroupOperator) -> Result<Combinator> {
        match operator {
            GroupOperator::Builtin(op) => Ok(Combinator::Builtin(*op)),
            GroupOperator::Custom(name) => {
                self.lookup(name).ok_or_else(|| RuleError::UnknownOperator {
                    operator: name.clone(),
                })
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.custom.read().contains_key(name)
    }

    /// 已注册的自定义操作符名称（已排序）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.custom.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.custom.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.custom.read().is_empty()
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("custom", &self.names())
            .finish()
    }
}
