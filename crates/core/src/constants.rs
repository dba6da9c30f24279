//! Constants used throughout the CardCrafter core crate.
//!
//! Storage names, provider defaults and the fixed system prompt live here so that they are
//! defined in exactly one place.

/// Default directory for flashcard data when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "flashcard_data";

/// Directory name for persisted flashcards.
pub const FLASHCARDS_DIR_NAME: &str = "flashcards";

/// Directory name for user profile documents.
pub const USERS_DIR_NAME: &str = "users";

/// Filename of a persisted flashcard inside its sharded directory.
pub const FLASHCARD_JSON_FILENAME: &str = "flashcard.json";

/// Default chat model for flashcard generation.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default Identity Toolkit REST base URL.
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";

/// Hard cap on the number of flashcards returned by one generation.
pub const MAX_FLASHCARDS: usize = 10;

/// System instruction sent with every generation request.
///
/// Not request-configurable. The JSON shape described at the end is the one
/// [`crate::generation`] decodes.
pub const SYSTEM_PROMPT: &str = r#"You are a flashcard creator that takes in text and creates multiple flashcards from it. Your task is to generate concise and effective flashcards based on the given topic or content. Follow these guidelines:

1. Create clear and concise questions for the front of the flashcard.
2. Provide accurate and informative answers for the back of the flashcard.
3. Ensure that each flashcard focuses on a single concept or piece of information.
4. Use simple language to make the flashcards accessible to a wide range of learners.
5. Include a variety of question types, such as definitions, examples, comparisons, and applications.
6. Avoid overly complex or ambiguous phrasing in both questions and answers.
7. When appropriate, use mnemonics or memory aids to help reinforce the information.
8. Tailor the difficulty level of the flashcards to the user's specified preferences.
9. If given a body of text, extract the most important and relevant information for the flashcards.
10. Only generate 10 flashcards.
11. Identify what category each flashcard falls under. Each card can only have 1 category. The category can only be Math, Science, or History.

Remember, the goal is to facilitate effective learning and retention of information through these flashcards.

You should return in the following JSON format:
{
    "flashcards":[
        {
            "question": "Front of the card",
            "answer": "Back of the card",
            "category": "Category of the flashcard"
        }
    ]
}"#;
