//! # Response composer
//!
//! Turns an incoming question into an answer.
//!
//! A request moves through: small-talk check → retrieval → one of two named
//! response strategies:
//!
//! - **Direct answer** — threshold-gated. The top match is accepted only if
//!   `1 - distance` reaches the similarity threshold; otherwise a fixed
//!   fallback is returned. Session memory is neither read nor written.
//! - **Conversational answer** — memory-augmented. Retrieval always goes
//!   through; the new context and question overwrite the session's memory
//!   *before* the summarizer is called, and the prompt blends the previous
//!   turn's context ahead of the current one under a character budget. A
//!   failed summarizer call therefore still leaves memory pointing at the
//!   new context.
//!
//! Small talk (greetings, farewells) is matched by case-insensitive exact
//! comparison of the trimmed query against fixed keyword sets — never by
//! substring — and short-circuits with a canned reply, the `"N/A"` context
//! sentinel, and no retrieval or memory mutation.

use std::sync::{Arc, PoisonError};
use tracing::debug;

use crate::BoxError;
use crate::corpus::CorpusStore;
use crate::gateway::SummaryGateway;
use crate::memory::SessionMemory;
use crate::retriever::Retriever;

/// Queries matching one of these exactly (trimmed, lowercased) are greetings.
pub const GREETING_KEYWORDS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "hii",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Queries matching one of these exactly are farewells.
pub const FAREWELL_KEYWORDS: &[&str] = &[
    "bye",
    "goodbye",
    "see you",
    "see ya",
    "thank you",
    "thanks",
    "ok bye",
    "bye bye",
];

/// Context sentinel used when no retrieval happened.
pub const NO_CONTEXT: &str = "N/A";

/// Canned greeting for the direct-match mode.
pub const DIRECT_GREETING: &str = "Hi! How can I assist you today?";

/// Canned greeting for the conversational mode (rendered by the web client).
pub const CONVERSATIONAL_GREETING: &str = "👋 Hello! How can I assist you today?<br><br>\
I can help you with:<br>\
<button onclick=\"handleButton('Space Missions')\">🚀 Space Missions</button><br>\
<button onclick=\"handleButton('Data Access')\">🛰️ Data Access</button><br>\
<button onclick=\"handleButton('More Help')\">❓ More Help</button><br>\
<br>Or feel free to type your question below. 📩";

/// Canned farewell, shared by both modes.
pub const FAREWELL_REPLY: &str = "👋 You're welcome! Have a great day! 🌟";

/// Fallback when the best match falls below the similarity threshold.
pub const NOT_FOUND_REPLY: &str = "Sorry, I couldn't find information about that mission.";

/// A detected small-talk turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallTalk {
    Greeting,
    Farewell,
}

/// Classify `message` as small talk, if it is any.
///
/// The whole trimmed, lowercased message must equal a configured phrase;
/// "hi there" is not a greeting.
pub fn detect_small_talk(message: &str) -> Option<SmallTalk> {
    let normalized = message.trim().to_lowercase();
    if GREETING_KEYWORDS.contains(&normalized.as_str()) {
        Some(SmallTalk::Greeting)
    } else if FAREWELL_KEYWORDS.contains(&normalized.as_str()) {
        Some(SmallTalk::Farewell)
    } else {
        None
    }
}

/// Truncate `text` to at most `budget` characters (not bytes).
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Tunable policy values for both response strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePolicy {
    /// Similarity cutoff for the direct-answer strategy.
    pub similarity_threshold: f32,
    /// Neighbors retrieved per conversational query.
    pub top_k: usize,
    /// Character budget for the per-turn combined context.
    pub context_budget_chars: usize,
    /// Character budget for the blended previous-plus-current context.
    pub memory_budget_chars: usize,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            top_k: 1,
            context_budget_chars: 1000,
            memory_budget_chars: 600,
        }
    }
}

/// A finished answer plus the context it was grounded on.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Text delivered to the user.
    pub response: String,
    /// Retrieved context, or [`NO_CONTEXT`] when retrieval was skipped or
    /// rejected.
    pub context: String,
}

impl Reply {
    fn canned(response: &str) -> Self {
        Self {
            response: response.to_string(),
            context: NO_CONTEXT.to_string(),
        }
    }
}

/// Assembles answers from retrieval, memory, and the summarization gateway.
pub struct Composer {
    retriever: Retriever,
    corpus: Arc<CorpusStore>,
    memory: Arc<SessionMemory>,
    gateway: SummaryGateway,
    policy: ResponsePolicy,
}

impl Composer {
    /// Wire a composer from its collaborators.
    pub fn new(
        retriever: Retriever,
        corpus: Arc<CorpusStore>,
        memory: Arc<SessionMemory>,
        gateway: SummaryGateway,
        policy: ResponsePolicy,
    ) -> Self {
        Self {
            retriever,
            corpus,
            memory,
            gateway,
            policy,
        }
    }

    /// The session memory store backing the conversational strategy.
    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }

    /// Direct-answer strategy: threshold-gated raw match.
    ///
    /// Retrieves the single best record and accepts it only when
    /// `1 - distance` reaches the similarity threshold. On acceptance the
    /// matched record is returned verbatim as both response and context.
    /// Session memory is untouched, so repeated calls with the same query
    /// give identical replies.
    ///
    /// # Errors
    /// Propagates embedding and index failures; policy branches themselves
    /// never fail.
    pub fn direct_answer(&self, message: &str) -> Result<Reply, BoxError> {
        match detect_small_talk(message) {
            Some(SmallTalk::Greeting) => return Ok(Reply::canned(DIRECT_GREETING)),
            Some(SmallTalk::Farewell) => return Ok(Reply::canned(FAREWELL_REPLY)),
            None => {}
        }

        let results = self.retriever.retrieve(message, 1)?;
        let Some(best) = results.first() else {
            return Ok(Reply::canned(NOT_FOUND_REPLY));
        };

        let similarity = 1.0 - best.distance;
        debug!(
            position = best.position,
            similarity, "direct-answer retrieval"
        );
        if similarity < self.policy.similarity_threshold {
            return Ok(Reply::canned(NOT_FOUND_REPLY));
        }

        let record = self
            .corpus
            .get(best.position)
            .ok_or("retrieved position is outside the corpus")?;
        Ok(Reply {
            response: record.details.clone(),
            context: record.details.clone(),
        })
    }

    /// Conversational strategy: retrieval plus session memory plus the
    /// summarization gateway.
    ///
    /// Retrieval is unconditional (no threshold gate). The previous turn is
    /// snapshotted and memory is overwritten with the new context and raw
    /// question before the gateway call, so the next turn sees this context
    /// even if summarization fails. Gateway failures come back as
    /// warning-prefixed answer text, not as errors.
    ///
    /// # Errors
    /// Propagates embedding and index failures, and a corpus/index
    /// misalignment discovered at lookup time.
    pub async fn conversational_answer(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<Reply, BoxError> {
        match detect_small_talk(message) {
            Some(SmallTalk::Greeting) => return Ok(Reply::canned(CONVERSATIONAL_GREETING)),
            Some(SmallTalk::Farewell) => return Ok(Reply::canned(FAREWELL_REPLY)),
            None => {}
        }

        let normalized = message.trim().to_lowercase();
        let results = self.retriever.retrieve(&normalized, self.policy.top_k)?;
        let retrieved = results
            .iter()
            .map(|result| {
                self.corpus
                    .get(result.position)
                    .map(|record| record.details.as_str())
                    .ok_or("retrieved position is outside the corpus")
            })
            .collect::<Result<Vec<_>, _>>()?;

        let combined = retrieved.join("\n\n");
        let combined_context =
            truncate_chars(combined.trim(), self.policy.context_budget_chars).to_string();

        // Snapshot the previous turn and overwrite it in one critical
        // section; the lock is released before the gateway call.
        let (previous_context, previous_question) = {
            let handle = self.memory.get_or_create(session_id);
            let mut context = handle.lock().unwrap_or_else(PoisonError::into_inner);
            let previous_context =
                std::mem::replace(&mut context.last_context, combined_context.clone());
            let previous_question =
                std::mem::replace(&mut context.last_question, message.to_string());
            (previous_context, previous_question)
        };

        let blended = format!("{previous_context}\n\n{combined_context}");
        let blended = truncate_chars(blended.trim(), self.policy.memory_budget_chars);

        let answer = self
            .gateway
            .summarize(blended, &previous_question, message)
            .await;

        Ok(Reply {
            response: answer,
            context: combined_context,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AstroConfig;
    use crate::embedder::Embedder;
    use crate::embedder::test_support::KeywordEmbedder;
    use crate::index::MissionIndex;
    use httpmock::prelude::*;

    const LUNAR: &str = "Chandrayaan-3 is a lunar mission.";
    const MARS: &str = "Mangalyaan is a Mars orbiter.";

    fn test_config(api_base: &str) -> AstroConfig {
        AstroConfig {
            api_base: api_base.to_string(),
            api_key: "test-key".to_string(),
            model: "phi".to_string(),
            context_max_tokens: 256,
            index_path: "missions.index".into(),
            corpus_path: "mission_data.json".into(),
            custom_responses_path: None,
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            similarity_threshold: 0.75,
            top_k: 1,
            context_budget_chars: 1000,
            memory_budget_chars: 600,
            gateway_timeout_secs: 5,
            max_sessions: 8,
        }
    }

    fn composer_with(api_base: &str, policy: ResponsePolicy) -> Composer {
        composer_over([LUNAR, MARS], api_base, policy)
    }

    fn composer_over<const N: usize>(
        details: [&str; N],
        api_base: &str,
        policy: ResponsePolicy,
    ) -> Composer {
        let embedder = KeywordEmbedder::missions();
        let vectors: Vec<Vec<f32>> = details
            .iter()
            .map(|text| embedder.embed(text).unwrap())
            .collect();
        let index = MissionIndex::build(&vectors, embedder.dimension).unwrap();
        let corpus = Arc::new(CorpusStore::from_details(details));
        let retriever = Retriever::new(Arc::new(embedder), Arc::new(index));
        let memory = Arc::new(SessionMemory::new(8));
        let gateway = SummaryGateway::new(&test_config(api_base));
        Composer::new(retriever, corpus, memory, gateway, policy)
    }

    // Gateway pointed at a dead port; direct-answer tests never reach it.
    fn direct_composer() -> Composer {
        composer_with("http://127.0.0.1:9/v1", ResponsePolicy::default())
    }

    #[test]
    fn test_truncate_chars_respects_budget() {
        assert_eq!(truncate_chars("abcdef", 4), "abcd");
        assert_eq!(truncate_chars("abc", 4), "abc");
        assert_eq!(truncate_chars("", 4), "");
        // Multi-byte characters count as one.
        assert_eq!(truncate_chars("🚀🚀🚀", 2), "🚀🚀");
    }

    #[test]
    fn test_detect_small_talk() {
        assert_eq!(detect_small_talk("  Hello  "), Some(SmallTalk::Greeting));
        assert_eq!(detect_small_talk("GOOD MORNING"), Some(SmallTalk::Greeting));
        assert_eq!(detect_small_talk("ok bye"), Some(SmallTalk::Farewell));
        assert_eq!(detect_small_talk("hi there"), None);
        assert_eq!(detect_small_talk("tell me about chandrayaan"), None);
    }

    #[test]
    fn test_direct_answer_greeting_skips_retrieval() {
        let composer = direct_composer();
        let reply = composer.direct_answer("  Hi ").unwrap();
        assert_eq!(reply.response, DIRECT_GREETING);
        assert_eq!(reply.context, NO_CONTEXT);
        assert!(composer.memory().is_empty());
    }

    #[test]
    fn test_direct_answer_farewell() {
        let composer = direct_composer();
        let reply = composer.direct_answer("thanks").unwrap();
        assert_eq!(reply.response, FAREWELL_REPLY);
        assert_eq!(reply.context, NO_CONTEXT);
    }

    #[test]
    fn test_direct_answer_confident_match_returns_record_verbatim() {
        let composer = direct_composer();
        let reply = composer.direct_answer("Tell me about Chandrayaan-3").unwrap();
        assert_eq!(reply.response, LUNAR);
        assert_eq!(reply.context, LUNAR);
    }

    #[test]
    fn test_direct_answer_below_threshold_falls_back() {
        let composer = direct_composer();
        let reply = composer.direct_answer("how do I bake bread").unwrap();
        assert_eq!(reply.response, NOT_FOUND_REPLY);
        assert_eq!(reply.context, NO_CONTEXT);
    }

    #[test]
    fn test_direct_answer_is_idempotent() {
        let composer = direct_composer();
        let first = composer.direct_answer("Tell me about Mangalyaan").unwrap();
        let second = composer.direct_answer("Tell me about Mangalyaan").unwrap();
        assert_eq!(first, second);
        assert!(composer.memory().is_empty());
    }

    #[tokio::test]
    async fn test_conversational_greeting_skips_retrieval_and_memory() {
        let composer = direct_composer();
        let reply = composer
            .conversational_answer("hello", "user_1")
            .await
            .unwrap();
        assert_eq!(reply.response, CONVERSATIONAL_GREETING);
        assert_eq!(reply.context, NO_CONTEXT);
        assert!(composer.memory().is_empty());
    }

    #[tokio::test]
    async fn test_conversational_updates_memory_before_gateway() {
        // Unreachable gateway: the answer is a warning, but memory must
        // already hold the new context and question.
        let composer = direct_composer();
        let reply = composer
            .conversational_answer("Tell me about Chandrayaan-3", "user_1")
            .await
            .unwrap();

        assert!(reply.response.starts_with("⚠️"), "got: {}", reply.response);
        assert_eq!(reply.context, LUNAR);

        let handle = composer.memory().get_or_create("user_1");
        let context = handle.lock().unwrap().clone();
        assert_eq!(context.last_context, LUNAR);
        assert_eq!(context.last_question, "Tell me about Chandrayaan-3");
    }

    #[tokio::test]
    async fn test_conversational_carries_previous_turn_into_prompt() {
        let server = MockServer::start_async().await;
        let first_turn = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .body_includes(LUNAR)
                    // The prompt is JSON-encoded in the request body, so
                    // newlines arrive as literal \n sequences.
                    .body_includes("### Previous Question:\\n\\n### Current Question:");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion_body("It is a lunar mission."));
            })
            .await;
        let second_turn = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .body_includes(LUNAR)
                    .body_includes(MARS)
                    .body_includes("### Previous Question:\\nTell me about Chandrayaan-3");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion_body("It is a Mars orbiter."));
            })
            .await;

        let composer = composer_with(
            &format!("{}/v1", server.base_url()),
            ResponsePolicy::default(),
        );
        let first = composer
            .conversational_answer("Tell me about Chandrayaan-3", "user_1")
            .await
            .unwrap();
        assert_eq!(first.response, "It is a lunar mission.");

        let second = composer
            .conversational_answer("What about Mangalyaan?", "user_1")
            .await
            .unwrap();
        assert_eq!(second.response, "It is a Mars orbiter.");
        assert_eq!(second.context, MARS);

        first_turn.assert_async().await;
        second_turn.assert_async().await;
    }

    #[tokio::test]
    async fn test_conversational_sessions_are_isolated() {
        let composer = direct_composer();
        composer
            .conversational_answer("Tell me about Chandrayaan-3", "user_1")
            .await
            .unwrap();
        composer
            .conversational_answer("Tell me about Mangalyaan", "user_2")
            .await
            .unwrap();

        let first = composer.memory().get_or_create("user_1");
        let second = composer.memory().get_or_create("user_2");
        assert_eq!(first.lock().unwrap().last_context, LUNAR);
        assert_eq!(second.lock().unwrap().last_context, MARS);
    }

    #[tokio::test]
    async fn test_conversational_context_respects_per_turn_budget() {
        let long_details = format!("Chandrayaan mission. {}", "x".repeat(2000));
        let composer = composer_over(
            [long_details.as_str(), MARS],
            "http://127.0.0.1:9/v1",
            ResponsePolicy::default(),
        );

        let reply = composer
            .conversational_answer("chandrayaan details", "user_1")
            .await
            .unwrap();
        assert_eq!(reply.context.chars().count(), 1000);
        assert!(long_details.starts_with(&reply.context));
    }

    #[tokio::test]
    async fn test_conversational_blend_respects_memory_budget() {
        let server = MockServer::start_async().await;
        // Capture-all mock so we can inspect the prompt length indirectly:
        // the blended section must never exceed 600 characters, so with two
        // 1000-char turns the prompt stays bounded.
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(completion_body("ok"));
            })
            .await;

        let long_a = format!("Chandrayaan mission. {}", "a".repeat(2000));
        let long_b = format!("Mangalyaan mission. {}", "b".repeat(2000));
        let composer = composer_over(
            [long_a.as_str(), long_b.as_str()],
            &format!("{}/v1", server.base_url()),
            ResponsePolicy::default(),
        );

        composer
            .conversational_answer("chandrayaan", "user_1")
            .await
            .unwrap();
        composer
            .conversational_answer("mangalyaan", "user_1")
            .await
            .unwrap();
        assert_eq!(mock.hits_async().await, 2);

        // The blend itself is the unit under test: previous ahead of
        // current, truncated to the budget.
        let blended = format!("{long_a}\n\n{long_b}");
        let blended = truncate_chars(blended.trim(), 600);
        assert_eq!(blended.chars().count(), 600);
        assert!(blended.starts_with("Chandrayaan mission."));
    }

    fn completion_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 0,
            "model": "phi",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        })
    }
}
