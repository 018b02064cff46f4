//! End-to-end exercises: real tool services on ephemeral ports, discovery
//! over HTTP, and both controllers driving scripted conversations.

use std::sync::Arc;

use factotum_agent::{
    build_controller, is_exit_sentinel, ConversationContext, ToolRegistry,
};
use factotum_core::config::PlannerKind;
use factotum_db::{connect_with_settings, migrations, SeedDataset, ENGINEERING_HEADCOUNT};
use factotum_index::{ingest_document, ChunkStore, HashEmbedder};
use factotum_llm::{ScriptedLlm, ScriptedReply};
use factotum_tools::{
    DocumentToolService, RemoteTool, SqlToolService, ToolClient, ToolService,
};

const REPORT: &str = "Annual company report. The flagship Laptop drove most of the \
    revenue this year, with strong attach rates for the Mouse and Keyboard. The \
    Engineering department shipped two major releases while Sales expanded into \
    new regions.";

async fn spawn_service(service: Arc<dyn ToolService>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, factotum_tools::router(service)).await.expect("serve");
    });
    format!("http://{addr}")
}

async fn spawn_sql_service(generated_queries: Vec<&str>) -> String {
    let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
    migrations::run_pending(&pool).await.expect("migrate");
    SeedDataset::apply(&pool).await.expect("seed");
    let llm = Arc::new(ScriptedLlm::new(
        generated_queries
            .into_iter()
            .map(|query| ScriptedReply::Text(format!(r#"{{"query": "{query}"}}"#)))
            .collect(),
    ));
    spawn_service(Arc::new(SqlToolService::new(pool, llm))).await
}

async fn spawn_doc_service() -> String {
    let store = ChunkStore::open("sqlite::memory:").await.expect("open index");
    let embedder = Arc::new(HashEmbedder::default());
    ingest_document(&store, embedder.as_ref(), "report.txt", REPORT, 120, 20)
        .await
        .expect("ingest");
    spawn_service(Arc::new(DocumentToolService::new(store, embedder, 3))).await
}

async fn registry_from(endpoints: &[String]) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::default();
    for endpoint in endpoints {
        let client = ToolClient::new(endpoint, 5).expect("client");
        for tool in RemoteTool::discover_all(&client).await.expect("discover") {
            registry.register(Arc::new(tool)).expect("register");
        }
    }
    Arc::new(registry)
}

#[tokio::test]
async fn discovery_is_idempotent_over_the_wire() {
    let endpoint = spawn_doc_service().await;
    let client = ToolClient::new(&endpoint, 5).expect("client");

    let first = client.discover().await.expect("first discovery");
    let second = client.discover().await.expect("second discovery");
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].name, "document_search");
}

#[tokio::test]
async fn sequential_planner_answers_headcount_over_http() {
    let sql_endpoint = spawn_sql_service(vec![
        "SELECT COUNT(*) AS count FROM employees WHERE department = 'Engineering'",
    ])
    .await;
    let doc_endpoint = spawn_doc_service().await;
    let registry = registry_from(&[sql_endpoint, doc_endpoint]).await;
    assert_eq!(registry.names(), vec!["company_database", "document_search"]);

    let agent_llm = Arc::new(ScriptedLlm::new(vec![
        ScriptedReply::ToolCall {
            name: "company_database".to_string(),
            question: "How many employees are in the Engineering department?".to_string(),
        },
        ScriptedReply::Text(format!(
            "There are {ENGINEERING_HEADCOUNT} employees in Engineering."
        )),
    ]));
    let controller = build_controller(PlannerKind::Sequential, agent_llm.clone(), registry, 8, false);

    let mut ctx = ConversationContext::new();
    let answer = controller
        .handle_turn(&mut ctx, "How many employees are in the Engineering department?")
        .await
        .expect("turn");

    assert!(answer.contains(&ENGINEERING_HEADCOUNT.to_string()), "answer: {answer}");
    // The tool observation that crossed the wire reached the model.
    let requests = agent_llm.seen_requests().await;
    let context_text = format!("{:?}", requests.last().unwrap().messages);
    assert!(context_text.contains("Query Result"), "context: {context_text}");
}

#[tokio::test]
async fn sequential_planner_retrieves_document_context() {
    let doc_endpoint = spawn_doc_service().await;
    let registry = registry_from(&[doc_endpoint]).await;

    let agent_llm = Arc::new(ScriptedLlm::new(vec![
        ScriptedReply::ToolCall {
            name: "document_search".to_string(),
            question: "Summarize the introduction of the report".to_string(),
        },
        ScriptedReply::Text(
            "The report opens by crediting the Laptop for most of the revenue.".to_string(),
        ),
    ]));
    let controller = build_controller(PlannerKind::Sequential, agent_llm.clone(), registry, 8, false);

    let mut ctx = ConversationContext::new();
    let answer = controller
        .handle_turn(&mut ctx, "Summarize the introduction of the report")
        .await
        .expect("turn");
    assert!(answer.contains("Laptop"));

    // The retrieved context includes material from the start of the document.
    let requests = agent_llm.seen_requests().await;
    let context_text = format!("{:?}", requests.last().unwrap().messages);
    assert!(context_text.contains("Retrieved context"), "context: {context_text}");
    assert!(context_text.contains("Annual company report"), "context: {context_text}");
}

#[tokio::test]
async fn crew_planner_delegates_over_http() {
    let sql_endpoint = spawn_sql_service(vec![
        "SELECT name, price FROM products ORDER BY price DESC LIMIT 1",
    ])
    .await;
    let doc_endpoint = spawn_doc_service().await;
    let registry = registry_from(&[sql_endpoint, doc_endpoint]).await;

    let agent_llm = Arc::new(ScriptedLlm::new(vec![
        ScriptedReply::Text(r#"{"specialist": "database"}"#.to_string()),
        ScriptedReply::Text("The most expensive product is the Laptop at 1200.".to_string()),
        ScriptedReply::Text("The Laptop is the most expensive product, at 1200.".to_string()),
    ]));
    let controller = build_controller(PlannerKind::Crew, agent_llm.clone(), registry, 8, false);

    let mut ctx = ConversationContext::new();
    let answer = controller
        .handle_turn(&mut ctx, "What is the most expensive product?")
        .await
        .expect("turn");
    assert!(answer.contains("Laptop"));

    // The specialist's draft prompt carried the wire payload.
    let requests = agent_llm.seen_requests().await;
    let draft_prompt = format!("{:?}", requests[1].messages);
    assert!(draft_prompt.contains("Laptop"), "draft prompt: {draft_prompt}");
    assert_eq!(ctx.turns().len(), 1);
}

#[tokio::test]
async fn unreachable_service_fails_the_turn_without_crashing() {
    let mut registry = ToolRegistry::default();
    let client = ToolClient::new("http://127.0.0.1:1", 1).expect("client");
    // Bind a descriptor by hand since discovery would fail.
    registry
        .register(Arc::new(RemoteTool::new(
            client,
            factotum_core::domain::ToolDescriptor {
                name: "company_database".to_string(),
                description: "unreachable".to_string(),
                input_schema: factotum_core::domain::ToolDescriptor::question_schema(),
            },
        )))
        .expect("register");

    let agent_llm = Arc::new(ScriptedLlm::new(vec![ScriptedReply::ToolCall {
        name: "company_database".to_string(),
        question: "anything".to_string(),
    }]));
    let controller =
        build_controller(PlannerKind::Sequential, agent_llm, Arc::new(registry), 8, false);

    let mut ctx = ConversationContext::new();
    let answer = controller.handle_turn(&mut ctx, "anything").await.expect("turn");
    assert!(answer.contains("not working"), "answer: {answer}");
}

#[test]
fn exit_sentinel_never_reaches_a_controller() {
    assert!(is_exit_sentinel("exit"));
    assert!(is_exit_sentinel(" Exit "));
    assert!(!is_exit_sentinel("exit strategy question"));
}
