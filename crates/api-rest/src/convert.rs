//! Conversions between API bodies and core types.

use crate::error::{ApiError, ApiResult};
use api_shared::{CategoryDto, FlashcardDto, ProfileRes, SessionRes, StoredFlashcardRes};
use cardcrafter_core::{Category, Flashcard, NonEmptyText, Session, StoredFlashcard, UserProfile};
use chrono::SecondsFormat;

pub(crate) fn category_to_dto(category: Category) -> CategoryDto {
    match category {
        Category::Math => CategoryDto::Math,
        Category::Science => CategoryDto::Science,
        Category::History => CategoryDto::History,
    }
}

pub(crate) fn category_from_dto(category: CategoryDto) -> Category {
    match category {
        CategoryDto::Math => Category::Math,
        CategoryDto::Science => Category::Science,
        CategoryDto::History => Category::History,
    }
}

pub(crate) fn flashcard_to_dto(card: &Flashcard) -> FlashcardDto {
    FlashcardDto {
        question: card.question.as_str().to_owned(),
        answer: card.answer.as_str().to_owned(),
        category: category_to_dto(card.category),
    }
}

/// Validates a client-supplied card. `index` identifies the card in error messages.
pub(crate) fn flashcard_from_dto(dto: FlashcardDto, index: usize) -> ApiResult<Flashcard> {
    let question = NonEmptyText::new(&dto.question)
        .map_err(|e| ApiError::BadRequest(format!("flashcard {index}: question: {e}")))?;
    let answer = NonEmptyText::new(&dto.answer)
        .map_err(|e| ApiError::BadRequest(format!("flashcard {index}: answer: {e}")))?;

    Ok(Flashcard::new(
        question,
        answer,
        category_from_dto(dto.category),
    ))
}

pub(crate) fn stored_to_res(stored: &StoredFlashcard) -> StoredFlashcardRes {
    StoredFlashcardRes {
        id: stored.id.to_string(),
        question: stored.card.question.as_str().to_owned(),
        answer: stored.card.answer.as_str().to_owned(),
        category: category_to_dto(stored.card.category),
        created_at: stored
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        updated_at: stored
            .updated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

pub(crate) fn session_to_res(session: Session) -> SessionRes {
    SessionRes {
        user_id: session.user_id.to_string(),
        email: session.email,
        id_token: session.id_token,
        refresh_token: session.refresh_token,
        expires_in: session.expires_in,
    }
}

pub(crate) fn profile_to_res(profile: UserProfile) -> ProfileRes {
    ProfileRes {
        user_id: profile.user_id.to_string(),
        email: profile.email,
        first_name: profile.first_name.into_inner(),
        last_name: profile.last_name.into_inner(),
        photo: profile.photo,
        created_at: profile
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flashcard_from_dto_trims_and_validates() {
        let card = flashcard_from_dto(
            FlashcardDto {
                question: "  What is H2O? ".into(),
                answer: "Water".into(),
                category: CategoryDto::Science,
            },
            0,
        )
        .unwrap();
        assert_eq!(card.question.as_str(), "What is H2O?");
        assert_eq!(card.category, Category::Science);

        let err = flashcard_from_dto(
            FlashcardDto {
                question: "Q".into(),
                answer: "   ".into(),
                category: CategoryDto::Math,
            },
            3,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(msg) if msg.starts_with("flashcard 3: answer")));
    }

    #[test]
    fn test_category_mapping_covers_every_category() {
        for category in Category::ALL {
            assert_eq!(category_from_dto(category_to_dto(category)), category);
        }
    }
}
