//! Sequential planner: a reason/act loop over the shared conversation
//! context. Each iteration either dispatches one requested tool call and
//! feeds the observation back, or accepts the model's text as the final
//! answer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use factotum_core::domain::{ConversationTurn, InvocationOutcome, ToolInvocation};
use factotum_llm::{ChatMessage, ChatRequest, LlmClient, ToolCall};

use crate::controller::{ControllerError, ConversationController};
use crate::conversation::ConversationContext;
use crate::tools::ToolRegistry;

pub struct SequentialPlanner {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
    max_tool_rounds: u32,
    trace_reasoning: bool,
}

impl SequentialPlanner {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        registry: Arc<ToolRegistry>,
        max_tool_rounds: u32,
        trace_reasoning: bool,
    ) -> Self {
        Self { llm, registry, max_tool_rounds, trace_reasoning }
    }

    fn system_prompt(&self) -> String {
        let mut prompt = String::from(
            "You are a helpful assistant. Answer user questions by using the provided tools.\n\
             \n\
             Your tools:\n",
        );
        for spec in self.registry.tool_specs() {
            prompt.push_str(&format!("- `{}`: {}\n", spec.name, spec.description));
        }
        prompt.push_str(
            "\n\
             Instructions:\n\
             1. Decide which tool is the most appropriate for the question.\n\
             2. Pass the user's actual question as the tool's `question` argument.\n\
             3. Once a tool has returned a result, use it to give a final, \
             conversational answer. Do not call a tool again unless the result \
             was insufficient.\n",
        );
        prompt
    }

    async fn dispatch(&self, call: &ToolCall) -> DispatchOutcome {
        let Some(tool) = self.registry.get(&call.name) else {
            return DispatchOutcome::Observation(format!(
                "Error: no tool named `{}` is available. Use one of: {}.",
                call.name,
                self.registry.names().join(", ")
            ));
        };
        let Some(question) = call.question() else {
            return DispatchOutcome::Observation(
                "Error: the tool call is missing the required `question` argument.".to_string(),
            );
        };

        debug!(tool = %call.name, question, "dispatching tool call");
        let outcome = match tool.invoke(question).await {
            Ok(payload) => InvocationOutcome::Payload(payload),
            Err(err) => InvocationOutcome::Failure(err),
        };
        let invocation = ToolInvocation::record(&call.name, question, outcome);
        debug!(
            invocation = %invocation.id,
            tool = %invocation.tool_name,
            ok = invocation.succeeded(),
            "tool call finished"
        );

        match invocation.outcome {
            InvocationOutcome::Payload(payload) => DispatchOutcome::Observation(payload),
            InvocationOutcome::Failure(err) if err.is_recoverable() => {
                warn!(tool = %call.name, error = %err, "recoverable tool failure");
                DispatchOutcome::Observation(format!("Tool call failed: {err}"))
            }
            InvocationOutcome::Failure(err) => {
                warn!(tool = %call.name, error = %err, "fatal tool failure");
                DispatchOutcome::Fatal(format!(
                    "I could not answer that: the `{}` tool is not working ({err}).",
                    call.name
                ))
            }
        }
    }
}

enum DispatchOutcome {
    /// Text to feed back into the loop, success or recoverable failure.
    Observation(String),
    /// The turn cannot proceed; reply with this and stop.
    Fatal(String),
}

#[async_trait]
impl ConversationController for SequentialPlanner {
    async fn handle_turn(
        &self,
        ctx: &mut ConversationContext,
        question: &str,
    ) -> Result<String, ControllerError> {
        ctx.push(ChatMessage::user(question));
        let mut trace = Vec::new();
        let mut rounds = 0u32;

        let answer = loop {
            let reply = self
                .llm
                .complete(ChatRequest {
                    system: self.system_prompt(),
                    messages: ctx.messages().to_vec(),
                    tools: self.registry.tool_specs(),
                })
                .await?;

            if !reply.wants_tool() {
                break reply.text_or_empty().to_string();
            }

            if rounds >= self.max_tool_rounds {
                warn!(rounds, "tool round ceiling reached");
                trace.push(format!("stopped after {rounds} tool rounds"));
                break format!(
                    "I could not find an answer within {} tool calls. Please rephrase the question.",
                    self.max_tool_rounds
                );
            }
            rounds += 1;

            // One call per round; extra parallel requests are dropped.
            let call = reply.tool_calls[0].clone();
            ctx.push(ChatMessage::Assistant {
                text: reply.text.clone(),
                tool_calls: vec![call.clone()],
            });

            match self.dispatch(&call).await {
                DispatchOutcome::Observation(output) => {
                    trace.push(format!(
                        "round {rounds}: `{}` returned {} chars",
                        call.name,
                        output.len()
                    ));
                    ctx.push(ChatMessage::ToolResult { call, output });
                }
                DispatchOutcome::Fatal(message) => {
                    trace.push(format!("round {rounds}: `{}` failed fatally", call.name));
                    break message;
                }
            }
        };

        ctx.push(ChatMessage::assistant_text(answer.clone()));
        for step in &trace {
            if self.trace_reasoning {
                info!(step, "turn trace");
            } else {
                debug!(step, "turn trace");
            }
        }
        ctx.record_turn(ConversationTurn {
            question: question.to_string(),
            trace,
            answer: answer.clone(),
        });
        Ok(answer)
    }
}
