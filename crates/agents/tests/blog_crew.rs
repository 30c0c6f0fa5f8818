//! End-to-end runs of the blog crew against fake search and web servers.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, Router, response::Html, routing::{get, post}};
use scribe_agents::{
    FINAL_ARTICLE_FILE, Pipeline, RetryPolicy, ToolSettings, blog_crew, blog_tools,
    kickoff_with_retry,
};
use scribe_common::Inputs;
use scribe_llm::ScriptedClient;
use serde_json::{Value, json};

async fn fake_web() -> String {
    let router = Router::new()
        .route(
            "/search",
            post(|Json(body): Json<Value>| async move {
                Json(json!({
                    "organic": [{
                        "title": format!("All about {}", body["q"].as_str().unwrap_or_default()),
                        "link": "https://news.example/tides",
                        "snippet": "Tides are driven by the moon."
                    }]
                }))
            }),
        )
        .route(
            "/article",
            get(|| async { Html("<html><body><h1>Tides</h1><p>Spring &amp; neap tides.</p></body></html>") }),
        );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn blog_crew_researches_writes_and_edits() {
    let base = fake_web().await;
    let settings = ToolSettings {
        search_url: format!("{base}/search"),
        ..Default::default()
    };
    let llm = Arc::new(
        ScriptedClient::new()
            .reply(
                "Thought: I should search first.\nAction: Search the internet\n\
                 Action Input: {\"search_query\": \"ocean tides\"}",
            )
            .reply(format!(
                "Thought: Read the top result.\nAction: Read website content\n\
                 Action Input: {{\"website_url\": \"{base}/article\"}}"
            ))
            .reply("Thought: I now know the final answer\nFinal Answer: Outline: moon, spring and neap tides.")
            .reply("Final Answer: # Tides\n\nDraft about spring and neap tides.")
            .reply("Final Answer: markdown ```# Tides\n\nEdited post about tides.```"),
    );
    let dir = tempfile::tempdir().unwrap();
    let crew = blog_crew(llm.clone(), blog_tools("serper-key", &settings).unwrap())
        .with_output_dir(dir.path());

    let output = crew.kickoff(&Inputs::topic("ocean tides")).await.unwrap();

    assert_eq!(output.tasks_output.len(), 3);
    assert_eq!(output.tasks_output[0].tool_calls, 2);
    assert_eq!(output.raw, "markdown ```# Tides\n\nEdited post about tides.```");
    assert_eq!(output.token_usage.successful_requests, 5);

    let requests = llm.requests();
    assert_eq!(requests.len(), 5);
    let after_search = &requests[1].messages.last().unwrap().content;
    assert!(after_search.starts_with("Observation: Search results for 'ocean tides'"));
    assert!(after_search.contains("All about ocean tides"));
    let after_scrape = &requests[2].messages.last().unwrap().content;
    assert!(after_scrape.contains("Spring & neap tides."));
    assert!(requests[3].messages[0].content.contains("Outline: moon"));
    assert!(requests[4].messages[0].content.contains("Draft about spring"));
    assert!(requests.iter().all(|r| r.stop == vec!["\nObservation:".to_string()]));

    let saved = std::fs::read_to_string(dir.path().join(FINAL_ARTICLE_FILE)).unwrap();
    assert_eq!(saved, output.raw);
}

#[tokio::test]
async fn planner_continues_after_search_failure() {
    let settings = ToolSettings {
        search_url: "http://127.0.0.1:9/search".to_string(),
        request_timeout_ms: 2_000,
        ..Default::default()
    };
    let llm = Arc::new(
        ScriptedClient::new()
            .reply("Action: Search the internet\nAction Input: {\"search_query\": \"tides\"}")
            .reply("Final Answer: plan from memory")
            .reply("Final Answer: draft")
            .reply("Final Answer: final"),
    );
    let dir = tempfile::tempdir().unwrap();
    let crew = blog_crew(llm.clone(), blog_tools("serper-key", &settings).unwrap())
        .with_output_dir(dir.path());

    let output = crew.kickoff(&Inputs::topic("tides")).await.unwrap();

    assert_eq!(output.raw, "final");
    let requests = llm.requests();
    let observation = &requests[1].messages.last().unwrap().content;
    assert!(observation.starts_with("Observation: Error:"));
}

#[tokio::test(start_paused = true)]
async fn retry_reruns_the_whole_crew() {
    let llm = Arc::new(
        ScriptedClient::new()
            .reply("Final Answer: plan")
            .fail("OpenAI API error 500 Internal Server Error")
            .reply("Final Answer: plan again")
            .reply("Final Answer: draft")
            .reply("Final Answer: final"),
    );
    let dir = tempfile::tempdir().unwrap();
    let crew = blog_crew(
        llm.clone(),
        blog_tools("serper-key", &ToolSettings::default()).unwrap(),
    )
    .with_output_dir(dir.path());
    let start = tokio::time::Instant::now();

    let output = kickoff_with_retry(&crew, &Inputs::topic("tides"), &RetryPolicy::default())
        .await
        .unwrap();

    assert_eq!(output.raw, "final");
    assert_eq!(output.tasks_output[0].raw, "plan again");
    assert_eq!(llm.call_count(), 5);
    assert!(start.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn missing_topic_is_not_retried() {
    let llm = Arc::new(ScriptedClient::new().with_fallback("Final Answer: x"));
    let crew = blog_crew(
        llm.clone(),
        blog_tools("serper-key", &ToolSettings::default()).unwrap(),
    );

    let err = kickoff_with_retry(&crew, &Inputs::new(), &RetryPolicy::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("topic"));
    assert_eq!(llm.call_count(), 0);
}
