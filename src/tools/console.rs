use crate::error::Result;
use crate::expectation::Section;
use crate::tools::response::shape_console;
use crate::tools::{Tool, ToolContext, ToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConsoleMessagesParams {}

/// Console messages of the page, shaped by the console options
#[derive(Default)]
pub struct ConsoleMessagesTool;

#[async_trait::async_trait]
impl Tool for ConsoleMessagesTool {
    type Params = ConsoleMessagesParams;

    fn name(&self) -> &str {
        "console_messages"
    }

    async fn execute_typed(
        &self,
        _params: ConsoleMessagesParams,
        context: &mut ToolContext<'_>,
    ) -> Result<ToolResult> {
        let engine = context.page.engine().clone();
        let messages = engine.console_messages().await?;
        let total = messages.len();

        if context.should_include(Section::Console) {
            let shown = shape_console(messages, &context.expectation.console).len();
            return Ok(ToolResult::success().with_text(format!("{} console message(s), showing {}", total, shown)));
        }
        Ok(ToolResult::success().with_text(format!("{} console message(s)", total)))
    }
}
