//! Crew planner: a fixed manager/specialist hierarchy. The manager routes
//! the question to exactly one specialist, the specialist runs its single
//! tool once and drafts a findings report, and the manager rewrites the
//! draft into the final answer. No reasoning loop and no retries.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use factotum_core::domain::{
    ConversationTurn, InvocationOutcome, ToolInvocation, DOC_TOOL_NAME, SQL_TOOL_NAME,
};
use factotum_llm::{ChatMessage, ChatRequest, LlmClient};

use crate::controller::{ControllerError, ConversationController};
use crate::conversation::ConversationContext;
use crate::tools::ToolRegistry;

pub struct CrewPlanner {
    llm: Arc<dyn LlmClient>,
    registry: Arc<ToolRegistry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Specialist {
    Database,
    Document,
}

impl Specialist {
    fn tool_name(self) -> &'static str {
        match self {
            Self::Database => SQL_TOOL_NAME,
            Self::Document => DOC_TOOL_NAME,
        }
    }

    fn role(self) -> &'static str {
        match self {
            Self::Database => "Database Analyst",
            Self::Document => "Document Researcher",
        }
    }
}

#[derive(Deserialize)]
struct RoutingVerdict {
    specialist: String,
}

impl CrewPlanner {
    pub fn new(llm: Arc<dyn LlmClient>, registry: Arc<ToolRegistry>) -> Self {
        Self { llm, registry }
    }

    async fn route(&self, question: &str) -> Result<Specialist, ControllerError> {
        let reply = self
            .llm
            .complete(ChatRequest {
                system: "You are a project manager with two specialists: a Database \
                         Analyst who answers questions about employees, products and \
                         sales figures, and a Document Researcher who answers questions \
                         about report documents. Reply with only a JSON object of the \
                         form {\"specialist\": \"database\"} or \
                         {\"specialist\": \"document\"}."
                    .to_string(),
                messages: vec![ChatMessage::user(question)],
                tools: Vec::new(),
            })
            .await?;

        Ok(parse_verdict(reply.text_or_empty()))
    }

    async fn draft(
        &self,
        specialist: Specialist,
        question: &str,
        observation: &str,
    ) -> Result<String, ControllerError> {
        let reply = self
            .llm
            .complete(ChatRequest {
                system: format!(
                    "You are the {}. You have already run your tool for the \
                     question below. Write a short findings report based only on \
                     the tool output.",
                    specialist.role()
                ),
                messages: vec![ChatMessage::user(format!(
                    "Question: {question}\n\nTool output:\n{observation}"
                ))],
                tools: Vec::new(),
            })
            .await?;
        Ok(reply.text_or_empty().to_string())
    }

    async fn aggregate(&self, question: &str, draft: &str) -> Result<String, ControllerError> {
        let reply = self
            .llm
            .complete(ChatRequest {
                system: "You are a project manager. A specialist has reported their \
                         findings. Turn the report into a final, conversational answer \
                         for the user. Do not mention the specialist or the report."
                    .to_string(),
                messages: vec![ChatMessage::user(format!(
                    "Question: {question}\n\nSpecialist report:\n{draft}"
                ))],
                tools: Vec::new(),
            })
            .await?;
        Ok(reply.text_or_empty().to_string())
    }
}

/// Lenient verdict parsing. Anything that does not clearly name the
/// document specialist routes to the database, the broader of the two.
fn parse_verdict(text: &str) -> Specialist {
    let cleaned = text.trim().trim_start_matches("```json").trim_matches('`').trim();
    let named = serde_json::from_str::<RoutingVerdict>(cleaned)
        .map(|verdict| verdict.specialist.to_ascii_lowercase())
        .unwrap_or_else(|_| cleaned.to_ascii_lowercase());
    if named.contains("document") {
        Specialist::Document
    } else {
        Specialist::Database
    }
}

#[async_trait]
impl ConversationController for CrewPlanner {
    async fn handle_turn(
        &self,
        ctx: &mut ConversationContext,
        question: &str,
    ) -> Result<String, ControllerError> {
        ctx.push(ChatMessage::user(question));
        let mut trace = Vec::new();

        let specialist = self.route(question).await?;
        trace.push(format!("manager delegated to the {}", specialist.role()));
        debug!(specialist = specialist.role(), "routing verdict");

        let Some(tool) = self.registry.get(specialist.tool_name()) else {
            let answer = format!(
                "I could not answer that: the `{}` tool is not available.",
                specialist.tool_name()
            );
            ctx.push(ChatMessage::assistant_text(answer.clone()));
            ctx.record_turn(ConversationTurn {
                question: question.to_string(),
                trace,
                answer: answer.clone(),
            });
            return Ok(answer);
        };

        let invocation = ToolInvocation::record(
            specialist.tool_name(),
            question,
            match tool.invoke(question).await {
                Ok(payload) => InvocationOutcome::Payload(payload),
                Err(err) => InvocationOutcome::Failure(err),
            },
        );
        debug!(
            invocation = %invocation.id,
            ok = invocation.succeeded(),
            "specialist tool call finished"
        );

        let observation = match invocation.outcome {
            InvocationOutcome::Payload(payload) => payload,
            InvocationOutcome::Failure(err) if err.is_recoverable() => {
                warn!(tool = specialist.tool_name(), error = %err, "recoverable tool failure");
                format!("The tool reported a problem instead of data: {err}")
            }
            InvocationOutcome::Failure(err) => {
                warn!(tool = specialist.tool_name(), error = %err, "fatal tool failure");
                let answer = format!(
                    "I could not answer that: the `{}` tool is not working ({err}).",
                    specialist.tool_name()
                );
                trace.push(format!("`{}` failed fatally", specialist.tool_name()));
                ctx.push(ChatMessage::assistant_text(answer.clone()));
                ctx.record_turn(ConversationTurn {
                    question: question.to_string(),
                    trace,
                    answer: answer.clone(),
                });
                return Ok(answer);
            }
        };
        trace.push(format!(
            "`{}` returned {} chars",
            specialist.tool_name(),
            observation.len()
        ));

        let draft = self.draft(specialist, question, &observation).await?;
        trace.push(format!("{} drafted a report", specialist.role()));

        let answer = self.aggregate(question, &draft).await?;
        ctx.push(ChatMessage::assistant_text(answer.clone()));
        ctx.record_turn(ConversationTurn {
            question: question.to_string(),
            trace,
            answer: answer.clone(),
        });
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use factotum_core::domain::ToolDescriptor;
    use factotum_core::errors::ToolError;
    use factotum_llm::{ScriptedLlm, ScriptedReply};

    use super::{parse_verdict, CrewPlanner, Specialist};
    use crate::controller::ConversationController;
    use crate::conversation::ConversationContext;
    use crate::tools::{Tool, ToolRegistry};

    struct CountingTool {
        name: &'static str,
        result: Result<String, ToolError>,
        calls: AtomicUsize,
    }

    impl CountingTool {
        fn new(name: &'static str, result: Result<String, ToolError>) -> Self {
            Self { name, result, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl Tool for CountingTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: self.name.to_string(),
                description: format!("test tool {}", self.name),
                input_schema: ToolDescriptor::question_schema(),
            }
        }

        async fn invoke(&self, _question: &str) -> Result<String, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn both_tools(
        sql: Arc<CountingTool>,
        doc: Arc<CountingTool>,
    ) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::default();
        registry.register(sql).unwrap();
        registry.register(doc).unwrap();
        Arc::new(registry)
    }

    #[test]
    fn verdict_parsing_is_lenient() {
        assert_eq!(parse_verdict(r#"{"specialist": "database"}"#), Specialist::Database);
        assert_eq!(parse_verdict(r#"{"specialist": "document"}"#), Specialist::Document);
        assert_eq!(
            parse_verdict("```json\n{\"specialist\": \"document\"}\n```"),
            Specialist::Document
        );
        assert_eq!(parse_verdict("the Document Researcher should take this"), Specialist::Document);
        // Ambiguity falls back to the database specialist.
        assert_eq!(parse_verdict("hmm"), Specialist::Database);
    }

    #[tokio::test]
    async fn delegates_to_exactly_one_specialist() {
        let sql = Arc::new(CountingTool::new(
            "company_database",
            Ok("Query Result:\nColumns: count\n2".to_string()),
        ));
        let doc = Arc::new(CountingTool::new("document_search", Ok("context".to_string())));
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedReply::Text(r#"{"specialist": "database"}"#.to_string()),
            ScriptedReply::Text("Engineering has 2 employees.".to_string()),
            ScriptedReply::Text("There are 2 employees in Engineering.".to_string()),
        ]));
        let planner = CrewPlanner::new(llm, both_tools(sql.clone(), doc.clone()));

        let mut ctx = ConversationContext::new();
        let answer = planner
            .handle_turn(&mut ctx, "How many employees are in Engineering?")
            .await
            .unwrap();

        assert_eq!(answer, "There are 2 employees in Engineering.");
        assert_eq!(sql.calls.load(Ordering::SeqCst), 1);
        assert_eq!(doc.calls.load(Ordering::SeqCst), 0);
        assert_eq!(ctx.turns().len(), 1);
        assert!(ctx.turns()[0].trace.iter().any(|s| s.contains("Database Analyst")));
    }

    #[tokio::test]
    async fn document_questions_reach_the_researcher() {
        let sql = Arc::new(CountingTool::new("company_database", Ok("unused".to_string())));
        let doc = Arc::new(CountingTool::new(
            "document_search",
            Ok("Retrieved context:\nThe report covers Q3.".to_string()),
        ));
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedReply::Text(r#"{"specialist": "document"}"#.to_string()),
            ScriptedReply::Text("The report covers Q3.".to_string()),
            ScriptedReply::Text("The document is a Q3 report.".to_string()),
        ]));
        let planner = CrewPlanner::new(llm, both_tools(sql.clone(), doc.clone()));

        let mut ctx = ConversationContext::new();
        let answer = planner.handle_turn(&mut ctx, "What is the report about?").await.unwrap();
        assert_eq!(answer, "The document is a Q3 report.");
        assert_eq!(sql.calls.load(Ordering::SeqCst), 0);
        assert_eq!(doc.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fatal_tool_failure_short_circuits() {
        let sql = Arc::new(CountingTool::new(
            "company_database",
            Err(ToolError::Unreachable {
                name: "company_database".to_string(),
                detail: "connection refused".to_string(),
            }),
        ));
        let doc = Arc::new(CountingTool::new("document_search", Ok("unused".to_string())));
        let llm = Arc::new(ScriptedLlm::new(vec![ScriptedReply::Text(
            r#"{"specialist": "database"}"#.to_string(),
        )]));
        let planner = CrewPlanner::new(llm.clone(), both_tools(sql, doc));

        let mut ctx = ConversationContext::new();
        let answer = planner.handle_turn(&mut ctx, "how many sales?").await.unwrap();
        assert!(answer.contains("not working"));
        // No draft or aggregation calls after the failure.
        assert_eq!(llm.seen_requests().await.len(), 1);
    }

    #[tokio::test]
    async fn recoverable_failure_still_produces_an_answer() {
        let sql = Arc::new(CountingTool::new(
            "company_database",
            Err(ToolError::EmptyResult("no rows matched".to_string())),
        ));
        let doc = Arc::new(CountingTool::new("document_search", Ok("unused".to_string())));
        let llm = Arc::new(ScriptedLlm::new(vec![
            ScriptedReply::Text(r#"{"specialist": "database"}"#.to_string()),
            ScriptedReply::Text("The query matched nothing.".to_string()),
            ScriptedReply::Text("I found no matching records.".to_string()),
        ]));
        let planner = CrewPlanner::new(llm, both_tools(sql, doc));

        let mut ctx = ConversationContext::new();
        let answer = planner.handle_turn(&mut ctx, "employees named Zed?").await.unwrap();
        assert_eq!(answer, "I found no matching records.");
    }
}
