//! The `response` tool: delivers the final answer and ends the turn.

use async_trait::async_trait;
use serde_json::Value;
use zeroloop_core::error::ToolError;
use zeroloop_core::tool::{Tool, ToolArgs, ToolContext, ToolResult};

pub const NAME: &str = "response";

pub const DESCRIPTION: &str = "Final answer to the user. Ends the task. Args: {\"text\": answer}.";

#[derive(Debug, Default)]
pub struct ResponseTool;

#[async_trait]
impl Tool for ResponseTool {
    fn name(&self) -> &str {
        NAME
    }

    // Quiet: the answer is the turn's result, not a tool report.
    async fn before_execution(&self, _ctx: &mut ToolContext<'_>, _args: &ToolArgs) -> Result<(), ToolError> {
        Ok(())
    }

    async fn execute(&self, _ctx: &mut ToolContext<'_>, args: &ToolArgs) -> Result<ToolResult, ToolError> {
        let text = match args.get("text") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(ToolError::InvalidArguments("Missing 'text' argument".into())),
        };
        Ok(ToolResult::finish(text))
    }

    async fn after_execution(&self, _ctx: &mut ToolContext<'_>, _result: &ToolResult) -> Result<(), ToolError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zeroloop_core::prompt::PromptTemplate;

    #[tokio::test]
    async fn ends_turn_with_text() {
        let mut data = serde_json::Map::new();
        let template = PromptTemplate::new("fw.tool_response", "{{tool_response}}");
        let mut ctx = ToolContext::new("Agent 0", &mut data, &template);
        let args = json!({"text": "All done."}).as_object().cloned().unwrap();

        let result = ResponseTool.execute(&mut ctx, &args).await.unwrap();
        assert_eq!(result, ToolResult::finish("All done."));

        ResponseTool.after_execution(&mut ctx, &result).await.unwrap();
        assert!(ctx.take_outbox().is_empty());
    }

    #[tokio::test]
    async fn missing_text_is_invalid() {
        let mut data = serde_json::Map::new();
        let template = PromptTemplate::new("fw.tool_response", "{{tool_response}}");
        let mut ctx = ToolContext::new("Agent 0", &mut data, &template);
        let err = ResponseTool.execute(&mut ctx, &ToolArgs::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
