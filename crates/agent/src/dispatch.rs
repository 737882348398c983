//! Tool dispatch.
//!
//! Extracts a tool request from the model's reply, resolves it through the
//! registry and runs the tool lifecycle with an intervention checkpoint
//! around every phase.

use serde_json::Value;
use tracing::{debug, warn};
use zeroloop_core::error::Result;
use zeroloop_core::event::AgentEvent;
use zeroloop_core::message::Role;
use zeroloop_core::prompt::PromptTemplate;
use zeroloop_core::tool::{Tool, ToolContext, ToolRequest};
use crate::agent::Agent;
use crate::extract::parse_tool_request;

impl Agent {
    /// Handle the tool request in `response`.
    ///
    /// Returns the final message when the tool ends the turn, `None` when the
    /// loop should keep going (no request found, intervention, or a tool that
    /// does not break the loop).
    pub(crate) async fn process_tools(&mut self, response: &str) -> Result<Option<String>> {
        let Some(request) = parse_tool_request(response) else {
            warn!(agent = %self.name, "No tool request found in model response");
            let notice = self.prompts.msg_misformat.text().to_string();
            self.append_message(&notice, Role::Human).await;
            self.emit(AgentEvent::Warning {
                agent: self.name.clone(),
                message: notice,
            });
            return Ok(None);
        };

        let tool = self.tools.resolve(&request);
        self.emit(AgentEvent::ToolCall {
            agent: self.name.clone(),
            tool: request.tool_name.clone(),
            args: Value::Object(request.tool_args.clone()),
        });

        // Tools get the scratch data for the duration of the lifecycle.
        let template = self.prompts.tool_response.clone();
        let mut data = std::mem::take(&mut self.data);
        let outcome = self
            .run_lifecycle(tool.as_ref(), &request, &mut data, &template)
            .await;
        self.data = data;
        outcome
    }

    async fn run_lifecycle(
        &mut self,
        tool: &dyn Tool,
        request: &ToolRequest,
        data: &mut serde_json::Map<String, Value>,
        template: &PromptTemplate,
    ) -> Result<Option<String>> {
        let name = self.name.clone();
        let mut ctx = ToolContext::new(&name, data, template)
            .with_memory(self.memory.clone())
            .with_max_response_len(self.config.max_tool_response_length);
        let args = &request.tool_args;

        if self.check_intervention("").await {
            return Ok(None);
        }
        tool.before_execution(&mut ctx, args).await?;
        if self.flush_and_check(&mut ctx).await {
            return Ok(None);
        }
        let result = tool.execute(&mut ctx, args).await?;
        if self.flush_and_check(&mut ctx).await {
            debug!(agent = %self.name, tool = %request.tool_name, "Intervention after execute");
            return Ok(None);
        }
        tool.after_execution(&mut ctx, &result).await?;
        if self.flush_and_check(&mut ctx).await {
            return Ok(None);
        }

        self.emit(AgentEvent::ToolResult {
            agent: self.name.clone(),
            tool: request.tool_name.clone(),
            message: result.message.clone(),
            break_loop: result.break_loop,
        });
        Ok(result.break_loop.then_some(result.message))
    }

    /// Write what the tool queued into the history, then checkpoint.
    async fn flush_and_check(&mut self, ctx: &mut ToolContext<'_>) -> bool {
        for message in ctx.take_outbox() {
            self.append_message(&message.content, message.role).await;
        }
        self.check_intervention("").await
    }
}
