//! 条件树评估器
//!
//! 深度优先遍历条件树：叶子节点交给值比较器，逻辑组先求出全部子节点结果，
//! 再交给内置组合器或注册表中的自定义组合器。不做短路，自定义组合器总能拿到完整的结果列表。

use crate::comparator::ValueComparator;
use crate::error::{Result, RuleError};
use crate::models::{Condition, ConditionGroup, ConditionNode, EvaluationContext};
use crate::operators::GroupOperator;
use crate::registry::OperatorRegistry;

/// 默认最大嵌套深度
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// 条件树评估器
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    registry: OperatorRegistry,
    max_depth: usize,
}

impl ConditionEvaluator {
    pub fn new(registry: OperatorRegistry) -> Self {
        Self {
            registry,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// 评估任意节点
    pub fn evaluate(&self, node: &ConditionNode, context: &EvaluationContext) -> Result<bool> {
        self.evaluate_node(node, context, "condition", 1, None)
    }

    /// 评估逻辑组（规则的顶层条件）
    pub fn evaluate_group(
        &self,
        group: &ConditionGroup,
        context: &EvaluationContext,
    ) -> Result<bool> {
        self.evaluate_group_at(group, context, "condition", 1, None)
    }

    /// 评估逻辑组并记录每个节点的求值轨迹
    pub fn evaluate_group_traced(
        &self,
        group: &ConditionGroup,
        context: &EvaluationContext,
        trace: &mut Vec<String>,
    ) -> Result<bool> {
        self.evaluate_group_at(group, context, "condition", 1, Some(trace))
    }

    fn evaluate_node(
        &self,
        node: &ConditionNode,
        context: &EvaluationContext,
        path: &str,
        depth: usize,
        trace: Option<&mut Vec<String>>,
    ) -> Result<bool> {
        match node {
            ConditionNode::Condition(cond) => self.evaluate_condition(cond, context, path, trace),
            ConditionNode::Group(group) => {
                self.evaluate_group_at(group, context, path, depth, trace)
            }
        }
    }

    /// 评估叶子条件
    fn evaluate_condition(
        &self,
        cond: &Condition,
        context: &EvaluationContext,
        path: &str,
        trace: Option<&mut Vec<String>>,
    ) -> Result<bool> {
        if cond.field.is_empty() {
            return Err(RuleError::MalformedNode {
                path: path.to_string(),
                reason: "条件缺少字段名".to_string(),
            });
        }

        let field_value = context.get_field(&cond.field);
        let matched = ValueComparator::compare(cond.operator, field_value, &cond.value)?;

        if let Some(trace) = trace {
            trace.push(format!(
                "{}: {} {} {} => {}",
                path,
                cond.field,
                cond.operator,
                cond.value,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        Ok(matched)
    }

    /// 评估逻辑组
    fn evaluate_group_at(
        &self,
        group: &ConditionGroup,
        context: &EvaluationContext,
        path: &str,
        depth: usize,
        mut trace: Option<&mut Vec<String>>,
    ) -> Result<bool> {
        if depth > self.max_depth {
            return Err(RuleError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        if let GroupOperator::Custom(name) = &group.operator {
            if name.trim().is_empty() {
                return Err(RuleError::MalformedNode {
                    path: path.to_string(),
                    reason: "逻辑组缺少操作符".to_string(),
                });
            }
        }

        let combinator = self.registry.resolve(&group.operator)?;

        let mut results = Vec::with_capacity(group.conditions.len());
        for (i, child) in group.conditions.iter().enumerate() {
            let child_path = format!("{}.conditions[{}]", path, i);
            results.push(self.evaluate_node(
                child,
                context,
                &child_path,
                depth + 1,
                trace.as_deref_mut(),
            )?);
        }

        let matched = combinator.combine(&results);

        if let Some(trace) = trace {
            trace.push(format!(
                "{}: {} {:?} => {}",
                path,
                group.operator,
                results,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        Ok(matched)
    }
}

impl Default for ConditionEvaluator {
    fn default() -> Self {
        Self::new(OperatorRegistry::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operators::{LogicalOperator, Operator};
    use serde_json::json;

    fn context() -> EvaluationContext {
        EvaluationContext::from_value(json!({
            "tier": "VIP",
            "total": 150,
            "country": "US",
            "age": 17
        }))
    }

    fn leaf(field: &str, op: Operator, value: serde_json::Value) -> ConditionNode {
        Condition::new(field, op, value).into()
    }

    #[test]
    fn test_leaf_evaluation() {
        let evaluator = ConditionEvaluator::default();
        assert!(evaluator
            .evaluate(&leaf("tier", Operator::Eq, json!("VIP")), &context())
            .unwrap());
        assert!(!evaluator
            .evaluate(&leaf("total", Operator::Lt, json!(100)), &context())
            .unwrap());
    }

    #[test]
    fn test_and_group() {
        let evaluator = ConditionEvaluator::default();
        let group = ConditionGroup::and(vec![
            leaf("tier", Operator::Eq, json!("VIP")),
            leaf("total", Operator::Gte, json!(100)),
        ]);
        assert!(evaluator.evaluate_group(&group, &context()).unwrap());
    }

    #[test]
    fn test_three_level_nesting() {
        // NAND( tier == VIP, OR( age >= 18, XOR( country in [US], total > 1000 ) ) )
        // 第三层: XOR(true, false) = true
        // 第二层: OR(false, true) = true
        // 第一层: NAND(true, true) = false
        let evaluator = ConditionEvaluator::default();
        let group = ConditionGroup::nand(vec![
            leaf("tier", Operator::Eq, json!("VIP")),
            ConditionGroup::or(vec![
                leaf("age", Operator::Gte, json!(18)),
                ConditionGroup::xor(vec![
                    leaf("country", Operator::In, json!(["US"])),
                    leaf("total", Operator::Gt, json!(1000)),
                ])
                .into(),
            ])
            .into(),
        ]);

        let ctx = context();
        let xor = LogicalOperator::Xor.combine(&[true, false]);
        let or = LogicalOperator::Or.combine(&[false, xor]);
        let nand = LogicalOperator::Nand.combine(&[true, or]);

        assert_eq!(evaluator.evaluate_group(&group, &ctx).unwrap(), nand);
        assert!(!nand);
    }

    #[test]
    fn test_custom_operator() {
        let registry = OperatorRegistry::new();
        registry
            .register("MAJORITY", |r| r.iter().filter(|x| **x).count() * 2 > r.len())
            .unwrap();
        let evaluator = ConditionEvaluator::new(registry);

        let group = ConditionGroup::new(
            GroupOperator::custom("MAJORITY"),
            vec![
                leaf("tier", Operator::Eq, json!("VIP")),
                leaf("total", Operator::Gte, json!(100)),
                leaf("age", Operator::Gte, json!(18)),
            ],
        );
        assert!(evaluator.evaluate_group(&group, &context()).unwrap());
    }

    #[test]
    fn test_unregistered_operator() {
        let evaluator = ConditionEvaluator::default();
        let group = ConditionGroup::new(
            GroupOperator::custom("MAJORITY"),
            vec![leaf("tier", Operator::Eq, json!("VIP"))],
        );

        let err = evaluator.evaluate_group(&group, &context()).unwrap_err();
        assert!(matches!(err, RuleError::UnknownOperator { operator } if operator == "MAJORITY"));
    }

    #[test]
    fn test_malformed_nodes() {
        let evaluator = ConditionEvaluator::default();

        let group = ConditionGroup::new(
            GroupOperator::custom(""),
            vec![leaf("tier", Operator::Eq, json!("VIP"))],
        );
        assert!(matches!(
            evaluator.evaluate_group(&group, &context()),
            Err(RuleError::MalformedNode { .. })
        ));

        let group = ConditionGroup::and(vec![leaf("", Operator::Eq, json!("VIP"))]);
        let err = evaluator.evaluate_group(&group, &context()).unwrap_err();
        assert!(
            matches!(err, RuleError::MalformedNode { ref path, .. } if path == "condition.conditions[0]")
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut group = ConditionGroup::and(vec![leaf("tier", Operator::Eq, json!("VIP"))]);
        for _ in 0..4 {
            group = ConditionGroup::and(vec![group.into()]);
        }
        assert_eq!(group.depth(), 5);

        let evaluator = ConditionEvaluator::default().with_max_depth(5);
        assert!(evaluator.evaluate_group(&group, &context()).unwrap());

        let evaluator = ConditionEvaluator::default().with_max_depth(4);
        assert!(matches!(
            evaluator.evaluate_group(&group, &context()),
            Err(RuleError::DepthExceeded { max_depth: 4 })
        ));
    }

    #[test]
    fn test_no_short_circuit() {
        // 第一个子节点已为 false，但第二个子节点的类型错误仍会暴露
        let evaluator = ConditionEvaluator::default();
        let group = ConditionGroup::and(vec![
            leaf("tier", Operator::Eq, json!("REGULAR")),
            leaf("tier", Operator::Gt, json!(10)),
        ]);
        assert!(matches!(
            evaluator.evaluate_group(&group, &context()),
            Err(RuleError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_trace_output() {
        let evaluator = ConditionEvaluator::default();
        let group = ConditionGroup::or(vec![
            leaf("tier", Operator::Eq, json!("VIP")),
            leaf("total", Operator::Lt, json!(10)),
        ]);

        let mut trace = Vec::new();
        let matched = evaluator
            .evaluate_group_traced(&group, &context(), &mut trace)
            .unwrap();

        assert!(matched);
        assert_eq!(trace.len(), 3);
        assert!(trace[0].starts_with("condition.conditions[0]: tier =="));
        assert!(trace[1].ends_with("NOT_MATCHED"));
        assert_eq!(trace[2], "condition: OR [true, false] => MATCHED");
    }
}
