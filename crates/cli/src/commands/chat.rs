use std::io::Write;
use std::sync::Arc;

use factotum_agent::{
    build_controller, is_exit_sentinel, ConversationContext, ConversationController, ToolRegistry,
};
use factotum_core::config::{AppConfig, LoadOptions, PlannerKind};
use factotum_core::init_logging;
use factotum_llm::GeminiClient;
use factotum_tools::{RemoteTool, ToolClient};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::commands::CommandResult;

pub fn run(planner: Option<&str>) -> CommandResult {
    let mut config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };
    init_logging(&config.logging);

    if let Some(planner) = planner {
        match planner.parse::<PlannerKind>() {
            Ok(kind) => config.agent.planner = kind,
            Err(error) => {
                return CommandResult::failure("chat", "planner_selection", error, 2);
            }
        }
    }

    if let Err(error) = config.require_llm_credential() {
        return CommandResult::failure("chat", "llm_credential", error.to_string(), 2);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    match runtime.block_on(session(&config)) {
        Ok(summary) => CommandResult::success("chat", summary),
        Err((error_class, message)) => CommandResult::failure("chat", error_class, message, 4),
    }
}

async fn session(config: &AppConfig) -> Result<String, (&'static str, String)> {
    let registry = discover_tools(config).await?;
    eprintln!(
        "Connected. Tools: {}. Planner: {:?}. Type `exit` to quit.",
        registry.names().join(", "),
        config.agent.planner
    );

    let llm = Arc::new(
        GeminiClient::from_config(&config.llm)
            .map_err(|error| ("llm_credential", error.to_string()))?,
    );
    let controller = build_controller(
        config.agent.planner,
        llm,
        Arc::new(registry),
        config.agent.max_tool_rounds,
        config.agent.trace_reasoning,
    );

    let mut ctx = ConversationContext::new();
    run_loop(controller.as_ref(), &mut ctx, BufReader::new(tokio::io::stdin())).await
}

async fn run_loop<R>(
    controller: &dyn ConversationController,
    ctx: &mut ConversationContext,
    reader: R,
) -> Result<String, (&'static str, String)>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        print!("You: ");
        std::io::stdout().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            // EOF ends the session like the exit sentinel does.
            Ok(None) => break,
            Err(error) => return Err(("stdin", error.to_string())),
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_sentinel(question) {
            break;
        }

        match controller.handle_turn(ctx, question).await {
            Ok(answer) => println!("Agent: {answer}"),
            // A provider hiccup loses the turn, not the session.
            Err(error) => eprintln!(
                "Agent: I hit a problem answering that ({error}). Try again or type `exit`."
            ),
        }
    }

    Ok(format!("session ended after {} turns", ctx.turns().len()))
}

async fn discover_tools(config: &AppConfig) -> Result<ToolRegistry, (&'static str, String)> {
    let mut registry = ToolRegistry::default();
    for endpoint in [&config.tools.sql_endpoint, &config.tools.document_endpoint] {
        let client = ToolClient::new(endpoint, config.tools.request_timeout_secs)
            .map_err(|error| ("tool_discovery", error.to_string()))?;
        let tools = RemoteTool::discover_all(&client)
            .await
            .map_err(|error| ("tool_discovery", error.to_string()))?;
        for tool in tools {
            registry
                .register(Arc::new(tool))
                .map_err(|error| ("tool_discovery", error.to_string()))?;
        }
    }
    if registry.is_empty() {
        return Err(("tool_discovery", "no tools were advertised by any service".to_string()));
    }
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::io::BufReader;

    use factotum_agent::{build_controller, ConversationContext, Tool, ToolRegistry};
    use factotum_core::config::PlannerKind;
    use factotum_core::domain::ToolDescriptor;
    use factotum_core::errors::ToolError;
    use factotum_llm::{ScriptedLlm, ScriptedReply};

    use super::run_loop;

    #[derive(Default)]
    struct CountingTool {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: "company_database".to_string(),
                description: "test tool".to_string(),
                input_schema: ToolDescriptor::question_schema(),
            }
        }

        async fn invoke(&self, _question: &str) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok("Query Result:\nColumns: count\n2".to_string())
        }
    }

    fn controller_with(
        llm: Arc<ScriptedLlm>,
        tool: Arc<CountingTool>,
    ) -> Box<dyn factotum_agent::ConversationController> {
        let mut registry = ToolRegistry::default();
        registry.register(tool).unwrap();
        build_controller(PlannerKind::Sequential, llm, Arc::new(registry), 8, false)
    }

    #[tokio::test]
    async fn exit_line_ends_the_loop_without_any_tool_call() {
        let tool = Arc::new(CountingTool::default());
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));
        let controller = controller_with(llm.clone(), tool.clone());

        let mut ctx = ConversationContext::new();
        let summary = run_loop(controller.as_ref(), &mut ctx, BufReader::new(&b"exit\n"[..]))
            .await
            .unwrap();

        assert_eq!(summary, "session ended after 0 turns");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
        assert_eq!(llm.seen_requests().await.len(), 0);
    }

    #[tokio::test]
    async fn eof_and_blank_lines_end_or_skip_cleanly() {
        let tool = Arc::new(CountingTool::default());
        let llm = Arc::new(ScriptedLlm::new(Vec::new()));
        let controller = controller_with(llm, tool.clone());

        // Blank lines are skipped; EOF without a sentinel still exits.
        let mut ctx = ConversationContext::new();
        let summary = run_loop(controller.as_ref(), &mut ctx, BufReader::new(&b"\n   \n"[..]))
            .await
            .unwrap();

        assert_eq!(summary, "session ended after 0 turns");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_loses_the_turn_not_the_session() {
        let tool = Arc::new(CountingTool::default());
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedReply::Fail("rate limited".to_string()),
            ScriptedReply::Text("All good now.".to_string()),
        ]));
        let controller = controller_with(llm, tool);

        let input = b"first question\nsecond question\nexit\n";
        let mut ctx = ConversationContext::new();
        let summary = run_loop(controller.as_ref(), &mut ctx, BufReader::new(&input[..]))
            .await
            .unwrap();

        // The failed first turn is dropped; the second completes.
        assert_eq!(summary, "session ended after 1 turns");
        assert_eq!(ctx.turns().len(), 1);
        assert_eq!(ctx.turns()[0].answer, "All good now.");
    }
}
