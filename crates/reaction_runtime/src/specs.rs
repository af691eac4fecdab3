//! Built-in Node Specs
//!
//! One spec per [`NodeKind`]. Specs sanitize their own inputs and state: a
//! value of the wrong native type is reported as an evaluation failure.

use std::sync::Arc;

use reaction_types::{InputPort, Node, NodeId, NodeKind, Value, ValueType};

use crate::error::EvaluationError;
use crate::registry::{NodeContext, NodeSpec};

/// Placeholder shown by `display` nodes with nothing connected
pub const DISPLAY_PLACEHOLDER: &str = "—";

/// The built-in spec for a kind
pub fn builtin_spec(kind: NodeKind) -> Arc<dyn NodeSpec> {
    match kind {
        NodeKind::Number => Arc::new(NumberSpec),
        NodeKind::String => Arc::new(StringSpec),
        NodeKind::Sum => Arc::new(SumSpec),
        NodeKind::Subtract => Arc::new(SubtractSpec),
        NodeKind::Divide => Arc::new(DivideSpec),
        NodeKind::Concat => Arc::new(ConcatSpec),
        NodeKind::Sequence => Arc::new(SequenceSpec),
        NodeKind::Display => Arc::new(DisplaySpec),
    }
}

fn template(kind: NodeKind, output: ValueType, id: NodeId, name: &str) -> Node {
    let mut node = Node::new(kind, output);
    node.assign_identity(id, name);
    node
}

// ─────────────────────────────────────────────────────────────────────────────
// Sources
// ─────────────────────────────────────────────────────────────────────────────

/// Number literal; state `{ value }`
pub struct NumberSpec;

impl NodeSpec for NumberSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Number, ValueType::Number, id, name)
            .with_state("value", serde_json::json!(1))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        ctx.get_state_number("value")
            .map(Value::Number)
            .ok_or_else(|| EvaluationError::failed("state.value is not a number"))
    }
}

/// String literal; state `{ value }`
pub struct StringSpec;

impl NodeSpec for StringSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::String, ValueType::String, id, name)
            .with_state("value", serde_json::json!(""))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        ctx.get_state_string("value")
            .map(Value::from)
            .ok_or_else(|| EvaluationError::failed("state.value is not a string"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Math
// ─────────────────────────────────────────────────────────────────────────────

/// Sum of the `operands`, 0 when empty
pub struct SumSpec;

impl NodeSpec for SumSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Sum, ValueType::Number, id, name)
            .with_input(InputPort::variadic("operands", ValueType::Number))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        let operands = ctx.get_numbers("operands")?;
        Ok(Value::Number(operands.iter().sum()))
    }
}

/// First operand minus the rest, in link order; 0 when empty
pub struct SubtractSpec;

impl NodeSpec for SubtractSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Subtract, ValueType::Number, id, name)
            .with_input(InputPort::variadic("operands", ValueType::Number))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        let operands = ctx.get_numbers("operands")?;
        let result = match operands.split_first() {
            Some((first, rest)) => rest.iter().fold(*first, |acc, n| acc - n),
            None => 0.0,
        };
        Ok(Value::Number(result))
    }
}

/// `dividend / divisor`
pub struct DivideSpec;

impl NodeSpec for DivideSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Divide, ValueType::Number, id, name)
            .with_input(InputPort::single("dividend", ValueType::Number))
            .with_input(InputPort::single("divisor", ValueType::Number))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        let dividend = ctx.get_number("dividend")?;
        let divisor = ctx.get_number("divisor")?;
        if divisor == 0.0 {
            return Err(EvaluationError::failed("division by zero"));
        }
        Ok(Value::Number(dividend / divisor))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Strings & Sequences
// ─────────────────────────────────────────────────────────────────────────────

/// Joins `parts` in link order with `state.separator`
pub struct ConcatSpec;

impl NodeSpec for ConcatSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Concat, ValueType::String, id, name)
            .with_input(InputPort::variadic("parts", ValueType::String))
            .with_state("separator", serde_json::json!(""))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        let parts = ctx.get_strings("parts")?;
        let separator = ctx.get_state_string("separator").unwrap_or("");
        Ok(Value::String(parts.join(separator)))
    }
}

/// Collects `items` into a number sequence
pub struct SequenceSpec;

impl NodeSpec for SequenceSpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Sequence, ValueType::NumberSequence, id, name)
            .with_input(InputPort::variadic("items", ValueType::Number))
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        Ok(Value::NumberSequence(ctx.get_numbers("items")?))
    }
}

/// Renders whatever is connected as text
pub struct DisplaySpec;

impl NodeSpec for DisplaySpec {
    fn create(&self, id: NodeId, name: &str) -> Node {
        template(NodeKind::Display, ValueType::String, id, name)
            .with_input(InputPort::single("value", ValueType::Unknown).optional())
    }

    fn evaluate(&self, ctx: &NodeContext<'_>) -> Result<Value, EvaluationError> {
        let text = match ctx.get_single("value") {
            Some(value) => value.to_string(),
            None => DISPLAY_PLACEHOLDER.to_string(),
        };
        Ok(Value::String(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use reaction_types::NodeState;
    use serde_json::json;

    fn run(kind: NodeKind, inputs: &[(&str, Vec<Value>)], state: NodeState) -> Result<Value, EvaluationError> {
        let id = NodeId::new("n");
        let inputs: BTreeMap<_, _> = inputs
            .iter()
            .map(|(name, values)| (name.to_string(), values.clone()))
            .collect();
        let ctx = NodeContext::new(&id, inputs, &state);
        builtin_spec(kind).evaluate(&ctx)
    }

    fn state(value: serde_json::Value) -> NodeState {
        value.as_object().cloned().unwrap_or_default()
    }

    fn numbers(values: &[f64]) -> Vec<Value> {
        values.iter().copied().map(Value::Number).collect()
    }

    #[test]
    fn test_number_spec() {
        let node = builtin_spec(NodeKind::Number).create(NodeId::new("a"), "A");
        assert!(node.inputs.is_empty());
        assert_eq!(node.output.value_type, ValueType::Number);
        assert_eq!(node.state.get("value"), Some(&json!(1)));

        assert_eq!(run(NodeKind::Number, &[], state(json!({"value": 3}))), Ok(Value::Number(3.0)));
        assert!(run(NodeKind::Number, &[], state(json!({"value": "three"}))).is_err());
    }

    #[test]
    fn test_string_spec() {
        assert_eq!(
            run(NodeKind::String, &[], state(json!({"value": "hi"}))),
            Ok(Value::from("hi"))
        );
        assert!(run(NodeKind::String, &[], NodeState::new()).is_err());
    }

    #[test]
    fn test_sum_spec() {
        let node = builtin_spec(NodeKind::Sum).create(NodeId::new("c"), "C");
        let operands = node.input("operands").unwrap();
        assert!(operands.variadic);
        assert_eq!(operands.value_type, ValueType::Number);

        assert_eq!(run(NodeKind::Sum, &[("operands", numbers(&[2.0, 3.0, 4.0]))], NodeState::new()), Ok(Value::Number(9.0)));
        assert_eq!(run(NodeKind::Sum, &[], NodeState::new()), Ok(Value::Number(0.0)));
        assert!(run(NodeKind::Sum, &[("operands", vec![Value::from("x")])], NodeState::new()).is_err());
    }

    #[test]
    fn test_subtract_respects_order() {
        assert_eq!(run(NodeKind::Subtract, &[("operands", numbers(&[10.0, 3.0, 2.0]))], NodeState::new()), Ok(Value::Number(5.0)));
        assert_eq!(run(NodeKind::Subtract, &[("operands", numbers(&[2.0, 3.0, 10.0]))], NodeState::new()), Ok(Value::Number(-11.0)));
        assert_eq!(run(NodeKind::Subtract, &[], NodeState::new()), Ok(Value::Number(0.0)));
    }

    #[test]
    fn test_divide_spec() {
        let inputs = [("dividend", numbers(&[9.0])), ("divisor", numbers(&[3.0]))];
        assert_eq!(run(NodeKind::Divide, &inputs, NodeState::new()), Ok(Value::Number(3.0)));

        let inputs = [("dividend", numbers(&[9.0])), ("divisor", numbers(&[0.0]))];
        assert_eq!(
            run(NodeKind::Divide, &inputs, NodeState::new()),
            Err(EvaluationError::failed("division by zero"))
        );
    }

    #[test]
    fn test_concat_spec() {
        let parts = vec![Value::from("a"), Value::from("b"), Value::from("c")];
        assert_eq!(
            run(NodeKind::Concat, &[("parts", parts.clone())], state(json!({"separator": "-"}))),
            Ok(Value::from("a-b-c"))
        );
        assert_eq!(run(NodeKind::Concat, &[("parts", parts)], NodeState::new()), Ok(Value::from("abc")));
    }

    #[test]
    fn test_sequence_spec() {
        let node = builtin_spec(NodeKind::Sequence).create(NodeId::new("s"), "S");
        assert_eq!(node.output.value_type, ValueType::NumberSequence);
        assert_eq!(
            run(NodeKind::Sequence, &[("items", numbers(&[3.0, 1.0]))], NodeState::new()),
            Ok(Value::NumberSequence(vec![3.0, 1.0]))
        );
    }

    #[test]
    fn test_display_spec() {
        let node = builtin_spec(NodeKind::Display).create(NodeId::new("d"), "D");
        let input = node.input("value").unwrap();
        assert!(input.optional);
        assert_eq!(input.value_type, ValueType::Unknown);

        assert_eq!(
            run(NodeKind::Display, &[("value", vec![Value::NumberSequence(vec![1.0, 2.0])])], NodeState::new()),
            Ok(Value::from("[1, 2]"))
        );
        assert_eq!(run(NodeKind::Display, &[], NodeState::new()), Ok(Value::from(DISPLAY_PLACEHOLDER)));
    }
}
