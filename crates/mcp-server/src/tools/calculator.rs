//! Four-function calculator

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use weave_core::{Category, Tool, ToolError};

/// Calculator arguments: `{operation, a, b}` or `{operation, operands: [a, b]}`
#[derive(Debug, Default, Deserialize)]
struct CalculatorArgs {
    #[serde(default)]
    operation: String,
    #[serde(default)]
    a: f64,
    #[serde(default)]
    b: f64,
    #[serde(default)]
    operands: Vec<f64>,
}

impl CalculatorArgs {
    fn pair(&self) -> (f64, f64) {
        match self.operands.as_slice() {
            [a, b, ..] => (*a, *b),
            _ => (self.a, self.b),
        }
    }
}

pub struct CalculatorTool;

impl CalculatorTool {
    fn compute(operation: &str, a: f64, b: f64) -> Result<f64, ToolError> {
        match operation {
            "add" => Ok(a + b),
            "subtract" => Ok(a - b),
            "multiply" => Ok(a * b),
            "divide" if b == 0.0 => Err(ToolError::DivisionByZero),
            "divide" => Ok(a / b),
            other => Err(ToolError::UnsupportedOperation(other.to_string())),
        }
    }
}

/// Integral results are rendered as JSON integers (`30`, not `30.0`)
fn number(value: f64) -> Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Perform basic arithmetic operations (add, subtract, multiply, divide)"
    }

    fn category(&self) -> Category {
        Category::Math
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": ["add", "subtract", "multiply", "divide"]
                },
                "a": { "type": "number" },
                "b": { "type": "number" },
                "operands": {
                    "type": "array",
                    "items": { "type": "number" },
                    "minItems": 2
                }
            },
            "required": ["operation"]
        })
    }

    async fn execute(&self, args: Value) -> Result<Value, ToolError> {
        let args: CalculatorArgs = serde_json::from_value(args)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let (a, b) = args.pair();
        let result = Self::compute(&args.operation, a, b)?;

        Ok(json!({ "result": number(result) }))
    }
}
