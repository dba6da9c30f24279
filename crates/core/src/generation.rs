//! Flashcard generation.
//!
//! [`FlashcardGenerationService`] turns free-form text into a validated [`FlashcardSet`] with a
//! single completion round trip. The model is asked for
//! `{"flashcards": [{"question", "answer", "category"}, ...]}`; what comes back goes through
//! [`parse_model_output`], which
//!
//! - repairs the common ways models wrap JSON (Markdown fences, leading or trailing prose, a bare
//!   array instead of the wrapper object),
//! - validates each card (non-blank question and answer, a known category) and applies the
//!   configured [`CategoryPolicy`] to invalid ones,
//! - keeps at most `max_flashcards` cards.
//!
//! The service keeps no mutable state, so one instance can be shared behind an `Arc` and called
//! concurrently.

use crate::completion::{CompletionClient, CompletionRequest};
use crate::config::{CategoryPolicy, GenerationConfig};
use crate::constants::SYSTEM_PROMPT;
use crate::error::{GenerationError, GenerationResult};
use crate::flashcard::{Category, Flashcard, FlashcardSet};
use cardcrafter_types::NonEmptyText;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Generates flashcards from source text through a [`CompletionClient`].
#[derive(Clone)]
pub struct FlashcardGenerationService {
    client: Arc<dyn CompletionClient>,
    max_flashcards: usize,
    category_policy: CategoryPolicy,
}

impl FlashcardGenerationService {
    pub fn new(client: Arc<dyn CompletionClient>, cfg: &GenerationConfig) -> Self {
        Self {
            client,
            max_flashcards: cfg.max_flashcards(),
            category_policy: cfg.category_policy(),
        }
    }

    /// The fixed system instruction sent with every request.
    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// Generates up to `max_flashcards` cards from `source_text`.
    ///
    /// Makes at most one completion call and never retries.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::EmptySourceText`] if `source_text` is blank (no call is made),
    /// - [`GenerationError::UpstreamUnavailable`] if the completion call fails,
    /// - [`GenerationError::MalformedModelOutput`] if the reply cannot be decoded,
    /// - [`GenerationError::InvalidCategory`] / [`GenerationError::IncompleteFlashcard`] under
    ///   [`CategoryPolicy::Reject`].
    pub async fn generate(&self, source_text: &str) -> GenerationResult<FlashcardSet> {
        if source_text.trim().is_empty() {
            return Err(GenerationError::EmptySourceText);
        }

        tracing::debug!(chars = source_text.len(), "generating flashcards");

        let request = CompletionRequest::new(SYSTEM_PROMPT, source_text);
        let raw = self.client.complete(&request).await.map_err(|e| {
            tracing::error!("completion request failed: {e}");
            GenerationError::UpstreamUnavailable(e)
        })?;

        let set = parse_model_output(&raw, self.category_policy, self.max_flashcards)?;
        tracing::info!(cards = set.len(), "generated flashcards");
        Ok(set)
    }
}

/// Cards stay untyped until validation so one bad card cannot fail the whole decode.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEnvelope {
    Wrapped { flashcards: Vec<Value> },
    Bare(Vec<Value>),
}

impl RawEnvelope {
    fn into_cards(self) -> Vec<Value> {
        match self {
            RawEnvelope::Wrapped { flashcards } => flashcards,
            RawEnvelope::Bare(cards) => cards,
        }
    }
}

/// Decodes, repairs and validates raw model output.
///
/// Cards are validated in order and the first `max_flashcards` valid ones are kept; anything
/// after the cap is discarded unexamined.
///
/// # Errors
///
/// See [`FlashcardGenerationService::generate`].
pub fn parse_model_output(
    raw: &str,
    policy: CategoryPolicy,
    max_flashcards: usize,
) -> GenerationResult<FlashcardSet> {
    let Some(cards) = decode_envelope(raw) else {
        tracing::warn!(len = raw.len(), "model output is not flashcard JSON");
        tracing::debug!(raw, "malformed model output");
        return Err(GenerationError::MalformedModelOutput {
            raw: raw.to_owned(),
        });
    };

    let returned = cards.len();
    let mut valid = Vec::with_capacity(returned.min(max_flashcards));

    for (index, card) in cards.into_iter().enumerate() {
        if valid.len() == max_flashcards {
            tracing::warn!(returned, max_flashcards, "too many flashcards, truncating");
            break;
        }

        match validate_card(&card, index) {
            Ok(card) => valid.push(card),
            Err(e) if policy == CategoryPolicy::Drop => {
                tracing::warn!(index, "dropping flashcard: {e}");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(FlashcardSet::new(valid))
}

fn validate_card(card: &Value, index: usize) -> GenerationResult<Flashcard> {
    let (Ok(question), Ok(answer)) = (
        NonEmptyText::new(text_field(card, "question")),
        NonEmptyText::new(text_field(card, "answer")),
    ) else {
        return Err(GenerationError::IncompleteFlashcard { index });
    };

    let category = text_field(card, "category");
    let category = category
        .parse::<Category>()
        .map_err(|_| GenerationError::InvalidCategory {
            index,
            category: category.to_owned(),
        })?;

    Ok(Flashcard::new(question, answer, category))
}

/// Missing, null and non-string fields all read as blank.
fn text_field<'a>(card: &'a Value, key: &str) -> &'a str {
    card.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// Tries the output as-is (minus a code fence), then the outermost `{...}` span, then, only when
/// an array opens before any object, the outermost `[...]` span.
fn decode_envelope(raw: &str) -> Option<Vec<Value>> {
    let text = strip_code_fence(raw.trim());

    let array_first = match (text.find('['), text.find('{')) {
        (Some(bracket), Some(brace)) => bracket < brace,
        (Some(_), None) => true,
        _ => false,
    };

    [
        Some(text),
        outer_span(text, '{', '}'),
        array_first.then(|| outer_span(text, '[', ']')).flatten(),
    ]
    .into_iter()
    .flatten()
    .find_map(|candidate| serde_json::from_str::<RawEnvelope>(candidate).ok())
    .map(RawEnvelope::into_cards)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // The opening fence line may carry a language tag (```json).
    let Some(newline) = rest.find('\n') else {
        return text;
    };
    let body = rest[newline + 1..].trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn outer_span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_OPENAI_BASE_URL, MAX_FLASHCARDS};
    use crate::error::CompletionError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubClient {
        reply: Result<String, String>,
        calls: AtomicUsize,
        last_request: Mutex<Option<CompletionRequest>>,
    }

    impl StubClient {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_owned()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn failing(reason: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(reason.to_owned()),
                calls: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some(request.clone());
            self.reply.clone().map_err(CompletionError::Unavailable)
        }
    }

    fn service(client: Arc<StubClient>, policy: CategoryPolicy) -> FlashcardGenerationService {
        let cfg = GenerationConfig::new("sk-test", "gpt-4o", DEFAULT_OPENAI_BASE_URL)
            .unwrap()
            .with_category_policy(policy);
        FlashcardGenerationService::new(client, &cfg)
    }

    fn card_json(i: usize, category: &str) -> String {
        format!(r#"{{"question":"Q{i}","answer":"A{i}","category":"{category}"}}"#)
    }

    fn wrapped(cards: &[String]) -> String {
        format!(r#"{{"flashcards":[{}]}}"#, cards.join(","))
    }

    fn expected(q: &str, a: &str, category: Category) -> Flashcard {
        Flashcard::new(
            NonEmptyText::new(q).unwrap(),
            NonEmptyText::new(a).unwrap(),
            category,
        )
    }

    #[tokio::test]
    async fn test_generate_single_card() {
        let client = StubClient::replying(
            r#"{"flashcards":[{"question":"Q1","answer":"A1","category":"Math"}]}"#,
        );
        let set = service(client.clone(), CategoryPolicy::Drop)
            .generate("algebra basics")
            .await
            .unwrap();

        assert_eq!(set.as_slice(), &[expected("Q1", "A1", Category::Math)]);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_generate_sends_system_prompt_and_source_text() {
        let client = StubClient::replying(r#"{"flashcards":[]}"#);
        service(client.clone(), CategoryPolicy::Drop)
            .generate("The Battle of Hastings, 1066")
            .await
            .unwrap();

        let request = client.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.messages()[0].content, SYSTEM_PROMPT);
        assert_eq!(request.user_text(), "The Battle of Hastings, 1066");
    }

    #[tokio::test]
    async fn test_generate_non_json_is_malformed() {
        let client = StubClient::replying("sorry, I can't help");
        let err = service(client, CategoryPolicy::Drop)
            .generate("anything")
            .await
            .unwrap_err();

        match err {
            GenerationError::MalformedModelOutput { raw } => {
                assert_eq!(raw, "sorry, I can't help");
            }
            other => panic!("expected MalformedModelOutput, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_reply_is_malformed() {
        let client = StubClient::replying("");
        let err = service(client, CategoryPolicy::Drop)
            .generate("anything")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::MalformedModelOutput { .. }));
        assert_eq!(err.kind(), "malformed_model_output");
    }

    #[tokio::test]
    async fn test_generate_transport_failure_is_upstream_unavailable() {
        let client = StubClient::failing("connection reset");
        let err = service(client, CategoryPolicy::Drop)
            .generate("anything")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::UpstreamUnavailable(_)));
        assert_eq!(err.kind(), "upstream_unavailable");
    }

    #[tokio::test]
    async fn test_generate_blank_source_makes_no_call() {
        let client = StubClient::replying(r#"{"flashcards":[]}"#);
        let err = service(client.clone(), CategoryPolicy::Drop)
            .generate("   \n ")
            .await
            .unwrap_err();

        assert!(matches!(err, GenerationError::EmptySourceText));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_truncates_to_ten_cards() {
        let cards: Vec<String> = (0..14).map(|i| card_json(i, "Science")).collect();
        let client = StubClient::replying(&wrapped(&cards));

        let set = service(client, CategoryPolicy::Drop)
            .generate("cells")
            .await
            .unwrap();

        assert_eq!(set.len(), MAX_FLASHCARDS);
        assert_eq!(set.as_slice()[0].question.as_str(), "Q0");
        assert_eq!(set.as_slice()[9].question.as_str(), "Q9");
    }

    #[tokio::test]
    async fn test_generate_is_idempotent_against_deterministic_model() {
        let cards: Vec<String> = (0..3).map(|i| card_json(i, "History")).collect();
        let client = StubClient::replying(&wrapped(&cards));
        let service = service(client.clone(), CategoryPolicy::Drop);

        let first = service.generate("the Romans").await.unwrap();
        let second = service.generate("the Romans").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_generate_result_round_trips_through_json() {
        let cards: Vec<String> = vec![card_json(1, "Math"), card_json(2, "History")];
        let client = StubClient::replying(&wrapped(&cards));

        let set = service(client, CategoryPolicy::Drop)
            .generate("mixed")
            .await
            .unwrap();

        let json = serde_json::to_string(&set).unwrap();
        let back: FlashcardSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[tokio::test]
    async fn test_generate_can_be_called_concurrently() {
        let client = StubClient::replying(&wrapped(&[card_json(1, "Math")]));
        let service = Arc::new(service(client.clone(), CategoryPolicy::Drop));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.generate("fractions").await })
            })
            .collect();

        for handle in handles {
            let set = handle.await.unwrap().unwrap();
            assert_eq!(set.len(), 1);
        }
        assert_eq!(client.calls(), 8);
    }

    #[test]
    fn test_parse_repairs_code_fence() {
        let raw = "```json\n{\"flashcards\":[{\"question\":\"Q\",\"answer\":\"A\",\"category\":\"Science\"}]}\n```";
        let set = parse_model_output(raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap();

        assert_eq!(set.as_slice(), &[expected("Q", "A", Category::Science)]);
    }

    #[test]
    fn test_parse_repairs_surrounding_prose() {
        let raw = "Here are your flashcards:\n{\"flashcards\":[{\"question\":\"Q\",\"answer\":\"A\",\"category\":\"History\"}]}\nGood luck!";
        let set = parse_model_output(raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap();

        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_parse_accepts_bare_array() {
        let raw = format!("[{}]", card_json(1, "Math"));
        let set = parse_model_output(&raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap();

        assert_eq!(set.as_slice(), &[expected("Q1", "A1", Category::Math)]);
    }

    #[test]
    fn test_parse_accepts_bare_array_after_prose() {
        let raw = format!("Sure! [{}, {}]", card_json(1, "Math"), card_json(2, "Science"));
        let set = parse_model_output(&raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap();

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parse_accepts_empty_list() {
        let set =
            parse_model_output(r#"{"flashcards":[]}"#, CategoryPolicy::Reject, MAX_FLASHCARDS)
                .unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        for raw in [
            r#"{"cards":[]}"#,
            r#"{"flashcards":"none"}"#,
            "{ not json }",
        ] {
            let err = parse_model_output(raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap_err();
            assert!(
                matches!(err, GenerationError::MalformedModelOutput { .. }),
                "expected malformed for {raw}"
            );
        }
    }

    #[test]
    fn test_parse_category_is_lenient_about_case() {
        let raw = wrapped(&[card_json(1, " math ")]);
        let set = parse_model_output(&raw, CategoryPolicy::Reject, MAX_FLASHCARDS).unwrap();

        assert_eq!(set.as_slice()[0].category, Category::Math);
    }

    #[test]
    fn test_drop_policy_removes_invalid_cards() {
        let raw = wrapped(&[
            card_json(1, "Math"),
            card_json(2, "Geography"),
            r#"{"question":"Q3","answer":"  ","category":"Science"}"#.to_owned(),
            r#"{"question":"Q4","answer":"A4"}"#.to_owned(),
            card_json(5, "History"),
        ]);

        let set = parse_model_output(&raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap();

        assert_eq!(
            set.as_slice(),
            &[
                expected("Q1", "A1", Category::Math),
                expected("Q5", "A5", Category::History)
            ]
        );
    }

    #[test]
    fn test_drop_policy_removes_cards_with_null_or_non_string_fields() {
        let raw = wrapped(&[
            card_json(1, "Math"),
            r#"{"question":"Q2","answer":"A2","category":null}"#.to_owned(),
            r#"{"question":null,"answer":"A3","category":"Science"}"#.to_owned(),
            r#"{"question":"Q4","answer":4,"category":"Math"}"#.to_owned(),
            r#""not a card""#.to_owned(),
            card_json(6, "History"),
        ]);

        let set = parse_model_output(&raw, CategoryPolicy::Drop, MAX_FLASHCARDS).unwrap();

        assert_eq!(
            set.as_slice(),
            &[
                expected("Q1", "A1", Category::Math),
                expected("Q6", "A6", Category::History)
            ]
        );
    }

    #[test]
    fn test_reject_policy_reports_null_category_by_index() {
        let raw = wrapped(&[
            card_json(1, "Math"),
            r#"{"question":"Q2","answer":"A2","category":null}"#.to_owned(),
        ]);
        let err = parse_model_output(&raw, CategoryPolicy::Reject, MAX_FLASHCARDS).unwrap_err();

        assert!(matches!(
            err,
            GenerationError::InvalidCategory { index: 1, .. }
        ));
    }

    #[test]
    fn test_reject_policy_fails_on_invalid_category() {
        let raw = wrapped(&[card_json(1, "Math"), card_json(2, "Geography")]);
        let err = parse_model_output(&raw, CategoryPolicy::Reject, MAX_FLASHCARDS).unwrap_err();

        match err {
            GenerationError::InvalidCategory { index, category } => {
                assert_eq!(index, 1);
                assert_eq!(category, "Geography");
            }
            other => panic!("expected InvalidCategory, got {other:?}"),
        }
    }

    #[test]
    fn test_reject_policy_fails_on_blank_question() {
        let raw = wrapped(&[r#"{"question":"","answer":"A","category":"Math"}"#.to_owned()]);
        let err = parse_model_output(&raw, CategoryPolicy::Reject, MAX_FLASHCARDS).unwrap_err();

        assert!(matches!(
            err,
            GenerationError::IncompleteFlashcard { index: 0 }
        ));
    }

    #[test]
    fn test_cap_counts_valid_cards_only() {
        let mut cards = vec![card_json(0, "Geography")];
        cards.extend((1..=3).map(|i| card_json(i, "Math")));
        let raw = wrapped(&cards);

        let set = parse_model_output(&raw, CategoryPolicy::Drop, 2).unwrap();

        let questions: Vec<&str> = set.iter().map(|c| c.question.as_str()).collect();
        assert_eq!(questions, vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_strip_code_fence_variants() {
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fence("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("{}"), "{}");
        assert_eq!(strip_code_fence("```{}```"), "```{}```");
    }
}
