//! 规则引擎错误类型

use crate::validator::ShapeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则结构校验失败: {} 个问题", .0.len())]
    Validation(Vec<ShapeError>),

    #[error("未知操作符: {operator}")]
    UnknownOperator { operator: String },

    #[error("操作符名称与内置操作符冲突: {0}")]
    OperatorNameCollision(String),

    #[error("无效的操作符名称: '{0}'")]
    InvalidOperatorName(String),

    #[error("节点结构异常 '{path}': {reason}")]
    MalformedNode { path: String, reason: String },

    #[error("类型不匹配: 操作符 {operator} 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        operator: String,
        expected: String,
        actual: String,
    },

    #[error("条件树嵌套超过最大深度 {max_depth}")]
    DepthExceeded { max_depth: usize },

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl RuleError {
    /// 校验失败时返回全部结构错误
    pub fn shape_errors(&self) -> Option<&[ShapeError]> {
        match self {
            Self::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
