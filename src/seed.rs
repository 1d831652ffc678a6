// src/seed.rs

//! First-run data: default categories and subjects, the configured admin
//! account and an optional question bank file.

use std::path::Path;

use crate::{
    config::Config,
    error::AppError,
    handlers::question::import,
    models::{
        category::CreateCategoryRequest,
        question::{CreateQuestionRequest, ImportQuestionsRequest, QuestionFilter},
        subject::CreateSubjectRequest,
        user::{NewUser, ROLE_ADMIN},
    },
    storage::DynStorage,
    utils::hash::hash_password,
};

const DEFAULT_CATEGORIES: [(&str, &str); 5] = [
    ("JavaScript", "#f7df1e"),
    ("React", "#61dafb"),
    ("Python", "#3776ab"),
    ("Data Structures", "#4caf50"),
    ("Algorithms", "#ff5722"),
];

const DEFAULT_SUBJECTS: [(&str, &str); 3] = [
    ("JavaScript", "Core language: types, closures, async and the event loop"),
    ("React", "Components, hooks, state and rendering"),
    ("Data Structures", "Arrays, lists, trees, graphs and their costs"),
];

/// Runs every seeding step. Each step is skipped when its data already exists.
pub async fn run(storage: &DynStorage, config: &Config) -> Result<(), AppError> {
    seed_categories(storage).await?;
    seed_subjects(storage).await?;
    seed_admin_user(storage, config).await?;
    if let Some(path) = &config.seed_questions {
        seed_questions(storage, path).await?;
    }
    Ok(())
}

async fn seed_categories(storage: &DynStorage) -> Result<(), AppError> {
    if !storage.list_categories().await?.is_empty() {
        return Ok(());
    }

    for (name, color) in DEFAULT_CATEGORIES {
        storage
            .create_category(CreateCategoryRequest {
                name: name.to_string(),
                color: color.to_string(),
            })
            .await?;
    }
    tracing::info!(count = DEFAULT_CATEGORIES.len(), "Seeded default categories");
    Ok(())
}

async fn seed_subjects(storage: &DynStorage) -> Result<(), AppError> {
    if !storage.list_subjects().await?.is_empty() {
        return Ok(());
    }

    for (name, description) in DEFAULT_SUBJECTS {
        storage
            .create_subject(CreateSubjectRequest {
                name: name.to_string(),
                description: Some(description.to_string()),
            })
            .await?;
    }
    tracing::info!(count = DEFAULT_SUBJECTS.len(), "Seeded default subjects");
    Ok(())
}

async fn seed_admin_user(storage: &DynStorage, config: &Config) -> Result<(), AppError> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password) else {
        return Ok(());
    };

    if storage.find_user_by_username(username).await?.is_some() {
        return Ok(());
    }

    tracing::info!("Seeding admin user: {}", username);
    storage
        .create_user(NewUser {
            username: username.clone(),
            password: hash_password(password)?,
            email: None,
            display_name: None,
            role: ROLE_ADMIN.to_string(),
        })
        .await?;
    Ok(())
}

/// Imports a JSON array of questions when the bank is empty.
async fn seed_questions(storage: &DynStorage, path: &Path) -> Result<(), AppError> {
    if !storage
        .list_questions(&QuestionFilter::default())
        .await?
        .is_empty()
    {
        return Ok(());
    }

    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::InternalServerError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let questions: Vec<CreateQuestionRequest> = serde_json::from_str(&raw)?;

    let imported = import(
        storage,
        ImportQuestionsRequest {
            subject_id: None,
            questions,
        },
    )
    .await?;
    tracing::info!(count = imported.len(), file = %path.display(), "Seeded question bank");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{storage::MemoryStorage, utils::hash::verify_password};

    fn storage() -> DynStorage {
        Arc::new(MemoryStorage::new())
    }

    #[tokio::test]
    async fn seeds_defaults_once() {
        let storage = storage();
        let config = Config::for_tests("secret");

        run(&storage, &config).await.unwrap();
        run(&storage, &config).await.unwrap();

        let categories = storage.list_categories().await.unwrap();
        assert_eq!(categories.len(), 5);
        assert!(categories.iter().any(|c| c.name == "React" && c.color == "#61dafb"));
        assert_eq!(storage.list_subjects().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn creates_configured_admin() {
        let storage = storage();
        let mut config = Config::for_tests("secret");
        config.admin_username = Some("root".into());
        config.admin_password = Some("hunter22".into());

        run(&storage, &config).await.unwrap();

        let admin = storage.find_user_by_username("root").await.unwrap().unwrap();
        assert_eq!(admin.role, ROLE_ADMIN);
        assert!(verify_password("hunter22", &admin.password).unwrap());
    }

    #[tokio::test]
    async fn imports_question_file_skipping_invalid_items() {
        let path = std::env::temp_dir().join(format!("seed-questions-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[
                {"prompt": "2 + 2?", "options": ["3", "4"], "answer": 1},
                {"prompt": "Broken", "options": ["a"], "answer": 5},
                {"prompt": "typeof null?", "options": ["object", "null"], "answer": 0, "difficulty": "hard"}
            ]"#,
        )
        .unwrap();

        let storage = storage();
        let mut config = Config::for_tests("secret");
        config.seed_questions = Some(path.clone());

        run(&storage, &config).await.unwrap();
        std::fs::remove_file(&path).ok();

        let questions = storage.list_questions(&QuestionFilter::default()).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert!(questions.iter().any(|q| q.difficulty == "hard"));
    }

    #[tokio::test]
    async fn missing_question_file_is_an_error() {
        let storage = storage();
        let mut config = Config::for_tests("secret");
        config.seed_questions = Some("/definitely/not/here.json".into());

        assert!(matches!(
            run(&storage, &config).await,
            Err(AppError::InternalServerError(_))
        ));
    }
}
