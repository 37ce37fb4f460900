use scheduler_agent::core::model::{ErrorKind, ModelMessage, ToolCallRequest};
use scheduler_agent::core::{AgentStatus, Message, Toolset};
use scheduler_agent::toolbox::{TavilyConfig, Toolbox};
use scheduler_agent::{
    ChatEvent, ChatSession, DEFAULT_SYSTEM_PROMPT, NO_ANSWER_PLACEHOLDER,
    Orchestrator, extract_answer,
};
use scheduler_agent_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use serde_json::json;

fn builtin_tools() -> Toolset {
    Toolbox::builtin(TavilyConfig::new(None)).into_toolset()
}

fn add_then_answer() -> TestModelProvider {
    TestModelProvider::with_script([
        PresetResponse::with_events([PresetEvent::ToolCall(ToolCallRequest {
            id: "call_add".to_owned(),
            name: "add".to_owned(),
            arguments: json!({ "a": 2, "b": 2 }),
        })]),
        PresetResponse::with_events([
            PresetEvent::MessageDelta("2+2는 ".to_owned()),
            PresetEvent::LastToolResult,
            PresetEvent::MessageDelta("입니다.".to_owned()),
        ]),
    ])
}

#[tokio::test]
async fn test_add_scenario() {
    let provider = add_then_answer();
    let orchestrator = Orchestrator::new(provider.clone(), builtin_tools());

    let transcript = vec![Message::user("2+2가 뭐야?")];
    let result = orchestrator.run_turn(&transcript).await.unwrap();

    assert_eq!(result.status, AgentStatus::Success);
    assert!(result.messages.starts_with(&transcript));
    assert_eq!(extract_answer(&result.messages), "2+2는 4입니다.");

    let requests = provider.requests();
    assert_eq!(
        requests[0].messages[0],
        ModelMessage::System {
            content: DEFAULT_SYSTEM_PROMPT.to_owned(),
        }
    );
    assert_eq!(requests[0].tools.len(), 4);
}

#[tokio::test]
async fn test_turn_without_tools() {
    let orchestrator = Orchestrator::new(
        TestModelProvider::with_script([PresetResponse::text("도구 없이 답합니다.")]),
        Toolset::new(),
    );
    let transcript = vec![Message::user("안녕")];
    let result = orchestrator.run_turn(&transcript).await.unwrap();
    assert_eq!(result.status, AgentStatus::Success);
    assert_eq!(extract_answer(&result.messages), "도구 없이 답합니다.");
}

#[tokio::test]
async fn test_transcript_is_append_only() {
    let transcript = vec![
        Message::user("일정 있어?"),
        Message::assistant("아니요."),
        Message::user("2+2가 뭐야?"),
    ];

    // The script is indexed by assistant turns, so skip the first entry.
    let provider = TestModelProvider::with_script([
        PresetResponse::text("unused"),
        PresetResponse::with_events([PresetEvent::ToolCall(ToolCallRequest {
            id: "call_add".to_owned(),
            name: "add".to_owned(),
            arguments: json!({ "a": 2, "b": 2 }),
        })]),
        PresetResponse::with_events([PresetEvent::LastToolResult]),
    ]);
    let orchestrator = Orchestrator::new(provider, builtin_tools());
    let result = orchestrator.run_turn(&transcript).await.unwrap();
    assert!(result.messages.len() > transcript.len());
    assert!(result.messages.starts_with(&transcript));
    assert_eq!(extract_answer(&result.messages), "4");
}

#[tokio::test]
async fn test_chat_session() {
    let provider = TestModelProvider::with_script([
        PresetResponse::text("안녕하세요!"),
        PresetResponse::failing(ErrorKind::RateLimitExceeded),
    ]);
    let mut session = ChatSession::new(Orchestrator::new(provider, Toolset::new()));

    let event = session.submit("안녕").await;
    assert_eq!(event, ChatEvent::Reply("안녕하세요!".to_owned()));
    assert_eq!(
        session.transcript(),
        &[Message::user("안녕"), Message::assistant("안녕하세요!")]
    );

    let ChatEvent::Failed(message) = session.submit("이번 주 내 일정 알려줘").await
    else {
        panic!("expected the turn to fail");
    };
    assert!(message.contains("model request failed"), "{message}");
    // The failed input stays; the session keeps going.
    assert_eq!(session.transcript().len(), 3);
    assert_eq!(
        session.transcript().last(),
        Some(&Message::user("이번 주 내 일정 알려줘"))
    );

    let event = session.submit("다시").await;
    assert!(matches!(event, ChatEvent::Failed(_)));
    assert_eq!(session.transcript().len(), 4);
}

#[tokio::test]
async fn test_tool_only_answer_uses_placeholder() {
    let provider = TestModelProvider::with_script([
        PresetResponse::with_events([PresetEvent::ToolCall(ToolCallRequest {
            id: "call_status".to_owned(),
            name: "status".to_owned(),
            arguments: json!({}),
        })]),
        PresetResponse::text(""),
    ]);
    let mut session = ChatSession::new(Orchestrator::new(provider, builtin_tools()));
    let event = session.submit("status?").await;
    assert_eq!(event, ChatEvent::Reply(NO_ANSWER_PLACEHOLDER.to_owned()));
}
