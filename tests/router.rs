//! Router integration tests
//!
//! Drives inbound events through normalization, arbitration, and dispatch
//! against a mock transport.

use std::sync::Arc;

use async_trait::async_trait;
use lex_bot::intent::{ConstantPredictor, IntentPrediction, IntentPredictorExt};
use lex_bot::modules::mystic;
use lex_bot::nlp::WhitespaceLemmatizer;
use lex_bot::{
    AuthoredMessage, BotModule, Error, Intent, IntentData, IntentHandler, IntentPredictor,
    Normalizer, Result, Router,
};
use tokio::sync::Mutex;

mod common;
use common::{MockChannel, as_channel, inbound};

/// Records `author: content` for every message it handles
struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl IntentHandler for Recorder {
    async fn handle(&self, message: &mut AuthoredMessage, _data: &IntentData) -> Result<()> {
        self.log
            .lock()
            .await
            .push(format!("{}: {}", message.author_name, message.message_content));
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl IntentHandler for Failing {
    async fn handle(&self, _message: &mut AuthoredMessage, _data: &IntentData) -> Result<()> {
        Err(Error::Handler("handler exploded".to_string()))
    }
}

struct BrokenPredictor;

#[async_trait]
impl IntentPredictor for BrokenPredictor {
    async fn predict(&self, _message: &AuthoredMessage) -> Result<Vec<IntentPrediction>> {
        Err(Error::Nlp("lemmatizer offline".to_string()))
    }
}

fn mystic_router() -> Router {
    let mut router = Router::new(Normalizer::default());
    let module = mystic::build(router.registry_mut(), Arc::new(WhitespaceLemmatizer)).unwrap();
    router.add_module(module);
    router
}

/// A module with one constant-score intent per entry, each with a recorder
fn scored_module(
    router: &mut Router,
    scores: &[(&str, f64)],
) -> Vec<Arc<Mutex<Vec<String>>>> {
    let mut module = BotModule::new("test");
    let mut logs = Vec::new();
    for (name, score) in scores {
        let intent = module
            .register_intent(router.registry_mut(), Intent::new(*name))
            .unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        intent.register_handler(Arc::new(Recorder {
            log: Arc::clone(&log),
        }));
        module.register_predictor(ConstantPredictor::new(intent, *score));
        logs.push(log);
    }
    router.add_module(module);
    logs
}

#[tokio::test]
async fn test_math_with_mention() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("2 + 2", true), &as_channel(&channel))
        .await;

    let sent = channel.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].content, "Answer: 4.0");
    assert_eq!(sent[0].channel_id, "general");
}

#[tokio::test]
async fn test_math_formatting() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("1 / 3", true), &as_channel(&channel))
        .await;
    router
        .handle_inbound(inbound("2 ^ 10", true), &as_channel(&channel))
        .await;

    assert_eq!(
        channel.sent_contents().await,
        vec!["Answer: 0.33333", "Answer: 1024.0"]
    );
}

#[tokio::test]
async fn test_invalid_expression_gets_a_reply() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("2 +", true), &as_channel(&channel))
        .await;

    assert_eq!(
        channel.sent_contents().await,
        vec!["I can't evaluate that expression, Bob."]
    );
}

#[tokio::test]
async fn test_deeply_nested_expression_is_rejected() {
    let router = mystic_router();
    let channel = MockChannel::new();
    let nested = format!("{}1{}", "(".repeat(1000), ")".repeat(1000));

    router
        .handle_inbound(inbound(&nested, true), &as_channel(&channel))
        .await;
    router
        .handle_inbound(inbound("1 + 1", true), &as_channel(&channel))
        .await;

    assert_eq!(
        channel.sent_contents().await,
        vec!["I can't evaluate that expression, Bob.", "Answer: 2.0"]
    );
}

#[tokio::test]
async fn test_large_answers_use_scientific_notation() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("12345 * 1", true), &as_channel(&channel))
        .await;
    router
        .handle_inbound(inbound("100 * 100", true), &as_channel(&channel))
        .await;

    assert_eq!(
        channel.sent_contents().await,
        vec!["Answer: 1.2345e+04", "Answer: 1e+04"]
    );
}

#[tokio::test]
async fn test_no_reply_without_mention() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("hello", false), &as_channel(&channel))
        .await;
    router
        .handle_inbound(inbound("2 + 2", false), &as_channel(&channel))
        .await;

    assert!(channel.sent().await.is_empty());
}

#[tokio::test]
async fn test_fallback_with_mention() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("hello", true), &as_channel(&channel))
        .await;

    assert_eq!(
        channel.sent_contents().await,
        vec!["I don't know how to answer that, Bob."]
    );
}

#[tokio::test]
async fn test_whos_best_names_a_recent_author() {
    let router = mystic_router();
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("whos the best", true), &as_channel(&channel))
        .await;

    assert_eq!(channel.sent_contents().await, vec!["Bob is the best."]);
}

#[tokio::test]
async fn test_workaround_token_counts_as_mention() {
    let mut router = Router::new(Normalizer::new(Some("!lex".to_string())));
    let module = mystic::build(router.registry_mut(), Arc::new(WhitespaceLemmatizer)).unwrap();
    router.add_module(module);
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("!lex 3 * 3", false), &as_channel(&channel))
        .await;

    assert_eq!(channel.sent_contents().await, vec!["Answer: 9.0"]);
}

#[tokio::test]
async fn test_relay_author_and_content() {
    let mut router = Router::new(Normalizer::default());
    let logs = scored_module(&mut router, &[("echo", 1.0)]);
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("‹**Ann**› hi there", false), &as_channel(&channel))
        .await;

    assert_eq!(*logs[0].lock().await, vec!["Ann: hi there".to_string()]);
}

#[tokio::test]
async fn test_own_messages_ignored() {
    let mut router = Router::new(Normalizer::default());
    let logs = scored_module(&mut router, &[("echo", 1.0)]);
    let channel = MockChannel::new();

    let mut event = inbound("talking to myself", false);
    event.author_id = common::BOT_ID.to_string();
    router.handle_inbound(event, &as_channel(&channel)).await;

    assert!(logs[0].lock().await.is_empty());
}

#[tokio::test]
async fn test_highest_score_wins() {
    let mut router = Router::new(Normalizer::default());
    let logs = scored_module(&mut router, &[("medium", 0.5), ("high", 0.9), ("low", 0.1)]);
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("anything", false), &as_channel(&channel))
        .await;

    assert!(logs[0].lock().await.is_empty());
    assert_eq!(logs[1].lock().await.len(), 1);
    assert!(logs[2].lock().await.is_empty());
}

#[tokio::test]
async fn test_tie_goes_to_first_registered() {
    let mut router = Router::new(Normalizer::default());
    let logs = scored_module(&mut router, &[("first", 0.7), ("second", 0.7)]);
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("anything", false), &as_channel(&channel))
        .await;

    assert_eq!(logs[0].lock().await.len(), 1);
    assert!(logs[1].lock().await.is_empty());
}

#[tokio::test]
async fn test_non_positive_scores_never_dispatch() {
    let mut router = Router::new(Normalizer::default());
    let logs = scored_module(&mut router, &[("zero", 0.0), ("negative", -1.0)]);
    let channel = MockChannel::new();

    let dispatched = router
        .dispatch(common_message(&channel, "anything"))
        .await;

    assert!(dispatched.is_none());
    for log in logs {
        assert!(log.lock().await.is_empty());
    }
}

#[tokio::test]
async fn test_no_predictors_means_no_dispatch() {
    let router = Router::new(Normalizer::default());
    let channel = MockChannel::new();

    assert!(router.arbitrate(&common_message(&channel, "hi")).await.is_none());
    assert!(router.dispatch(common_message(&channel, "hi")).await.is_none());
}

#[tokio::test]
async fn test_failing_predictor_does_not_block_others() {
    let mut router = Router::new(Normalizer::default());
    let mut broken = BotModule::new("broken");
    broken.register_predictor(BrokenPredictor);
    router.add_module(broken);
    let logs = scored_module(&mut router, &[("fine", 0.3)]);
    let channel = MockChannel::new();

    let dispatched = router.dispatch(common_message(&channel, "hi")).await;

    assert_eq!(
        dispatched.map(|p| p.intent.fq_name()).as_deref(),
        Some("test:fine")
    );
    assert_eq!(logs[0].lock().await.len(), 1);
}

#[tokio::test]
async fn test_handler_error_is_contained() {
    let mut router = Router::new(Normalizer::default());
    let mut module = BotModule::new("fragile");
    let intent = module
        .register_intent(router.registry_mut(), Intent::new("boom"))
        .unwrap();
    intent.register_handler(Arc::new(Failing));
    module.register_predictor(ConstantPredictor::new(intent, 1.0));
    router.add_module(module);
    let channel = MockChannel::new();

    // Both messages are processed; the error stops at the dispatch boundary
    let first = router.dispatch(common_message(&channel, "one")).await;
    let second = router.dispatch(common_message(&channel, "two")).await;

    assert!(first.is_some());
    assert!(second.is_some());
}

#[tokio::test]
async fn test_reply_retried_once() {
    let router = mystic_router();
    let channel = MockChannel::failing(1);

    router
        .handle_inbound(inbound("2 + 2", true), &as_channel(&channel))
        .await;

    assert_eq!(channel.sent_contents().await, vec!["Answer: 4.0"]);
}

#[tokio::test]
async fn test_reply_dropped_after_second_failure() {
    let router = mystic_router();
    let channel = MockChannel::failing(2);

    router
        .handle_inbound(inbound("2 + 2", true), &as_channel(&channel))
        .await;
    router
        .handle_inbound(inbound("3 + 3", true), &as_channel(&channel))
        .await;

    assert_eq!(channel.sent_contents().await, vec!["Answer: 6.0"]);
}

#[tokio::test]
async fn test_duplicate_intent_rejected() {
    let mut router = Router::new(Normalizer::default());
    let mut module = BotModule::new("test");
    module
        .register_intent(router.registry_mut(), Intent::new("dup"))
        .unwrap();

    let result = module.register_intent(router.registry_mut(), Intent::new("dup"));
    assert!(matches!(result, Err(Error::DuplicateIntent(name)) if name == "test:dup"));
}

#[tokio::test]
async fn test_gated_predictor_in_router() {
    let mut router = Router::new(Normalizer::default());
    let mut module = BotModule::new("gated");
    let intent = module
        .register_intent(router.registry_mut(), Intent::new("hello"))
        .unwrap();
    let log = Arc::new(Mutex::new(Vec::new()));
    intent.register_handler(Arc::new(Recorder {
        log: Arc::clone(&log),
    }));
    module.register_predictor(ConstantPredictor::new(intent, 1.0).requires_self_mention());
    router.add_module(module);
    let channel = MockChannel::new();

    router
        .handle_inbound(inbound("hi", false), &as_channel(&channel))
        .await;
    router
        .handle_inbound(inbound("hi", true), &as_channel(&channel))
        .await;

    assert_eq!(*log.lock().await, vec!["Bob: hi".to_string()]);
}

#[tokio::test]
async fn test_run_processes_in_arrival_order() {
    let router = mystic_router();
    let channel = MockChannel::new();
    let (tx, rx) = tokio::sync::mpsc::channel(8);

    for expr in ["1 + 1", "2 + 2", "3 + 3"] {
        tx.send(inbound(expr, true)).await.unwrap();
    }
    drop(tx);

    router.run(rx, as_channel(&channel)).await;

    assert_eq!(
        channel.sent_contents().await,
        vec!["Answer: 2.0", "Answer: 4.0", "Answer: 6.0"]
    );
}

#[tokio::test]
async fn test_registry_introspection() {
    let router = mystic_router();

    let mut names: Vec<String> = router
        .registry()
        .all()
        .iter()
        .map(|intent| intent.fq_name())
        .collect();
    names.sort();

    assert_eq!(names, vec!["mystic:math", "mystic:unknown", "mystic:whosbest"]);
}

/// A normalized, unaddressed message from Bob on the given channel
fn common_message(channel: &Arc<MockChannel>, content: &str) -> AuthoredMessage {
    Normalizer::default()
        .normalize(
            inbound(content, false),
            &as_channel(channel).identity().unwrap(),
            as_channel(channel),
        )
        .unwrap()
}
