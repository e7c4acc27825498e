//! Calculator Tool
//!
//! Evaluates arithmetic with the allow-listed evaluator in [`crate::expr`].

use async_trait::async_trait;

use smartagent_core::{
    Arguments, Result as CoreResult, Tool, ToolOutput, ToolSchema,
    tool::{ParameterSchema, str_arg},
};

use crate::expr::evaluate;

pub struct CalcTool;

#[async_trait]
impl Tool for CalcTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "calc".into(),
            description: "Safely evaluate a math expression (+ - * / // % ** and parentheses)"
                .into(),
            parameters: vec![ParameterSchema::required(
                "expression",
                "string",
                "Arithmetic expression, e.g. '(2 + 3) * 4' or '2 ** 10'",
            )],
        }
    }

    async fn execute(&self, args: &Arguments) -> CoreResult<ToolOutput> {
        let expression = str_arg(args, "expression")?;
        let value = evaluate(expression)?;
        Ok(value.to_string().into())
    }
}
