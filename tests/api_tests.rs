// tests/api_tests.rs

use std::sync::Arc;

use quiz_server::{
    config::Config,
    models::user::{NewUser, ROLE_ADMIN},
    routes,
    state::AppState,
    storage::{DynStorage, MemoryStorage},
    utils::hash::hash_password,
};
use serde_json::{Value, json};

const ADMIN_PASSWORD: &str = "admin-password";

struct TestApp {
    address: String,
    storage: DynStorage,
    client: reqwest::Client,
}

/// Helper function to spawn the app on a random port for testing.
/// Runs against the in-memory store, so no database is required.
async fn spawn_app() -> TestApp {
    let storage: DynStorage = Arc::new(MemoryStorage::new());
    let config = Config::for_tests("test_secret_for_integration_tests");

    let state = AppState::new(storage.clone(), config);
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    // Spawn the server in the background
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        storage,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a user and returns its bearer token.
    async fn register(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": "password123" }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    /// Inserts an admin directly into the store and logs in through the API.
    async fn admin_token(&self) -> String {
        self.storage
            .create_user(NewUser {
                username: "admin".to_string(),
                password: hash_password(ADMIN_PASSWORD).unwrap(),
                email: None,
                display_name: None,
                role: ROLE_ADMIN.to_string(),
            })
            .await
            .unwrap();

        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": "admin", "password": ADMIN_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    async fn create_category(&self, admin: &str, name: &str) -> i64 {
        let response = self
            .post(
                "/api/admin/categories",
                admin,
                json!({ "name": name, "color": "#123abc" }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }

    /// Creates a two-option question whose correct answer is index 1.
    async fn create_question(&self, admin: &str, prompt: &str, category_id: i64) -> i64 {
        let response = self
            .post(
                "/api/admin/questions",
                admin,
                json!({
                    "prompt": prompt,
                    "options": ["wrong", "right"],
                    "answer": 1,
                    "explanation": "Because it is right",
                    "category_id": category_id,
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn health_check_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_and_login_work() {
    let app = spawn_app().await;
    let token = app.register("alice").await;

    let response = app.get("/api/auth/me", &token).await;
    assert_eq!(response.status().as_u16(), 200);
    let me: Value = response.json().await.unwrap();
    assert_eq!(me["username"], "alice");
    assert_eq!(me["role"], "user");
    assert!(me.get("password").is_none());

    let response = app
        .client
        .post(app.url("/api/auth/login"))
        .json(&json!({ "username": "alice", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn register_fails_validation() {
    let app = spawn_app().await;

    // Username too short
    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": "yo", "password": "password123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn duplicate_username_conflicts() {
    let app = spawn_app().await;
    app.register("bob").await;

    let response = app
        .client
        .post(app.url("/api/auth/register"))
        .json(&json!({ "username": "bob", "password": "password123" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn missing_token_is_401_and_bad_token_is_403() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/api/attempts")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = app.get("/api/attempts", "not-a-jwt").await;
    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let app = spawn_app().await;
    let token = app.register("carol").await;

    let response = app
        .post(
            "/api/admin/categories",
            &token,
            json!({ "name": "Rust", "color": "#dea584" }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn admin_manages_categories() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let id = app.create_category(&admin, "Rust").await;

    let response = app
        .client
        .put(app.url(&format!("/api/admin/categories/{}", id)))
        .bearer_auth(&admin)
        .json(&json!({ "color": "#dea584" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let categories: Value = app
        .client
        .get(app.url("/api/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(categories[0]["name"], "Rust");
    assert_eq!(categories[0]["color"], "#dea584");

    // Invalid colour
    let response = app
        .post(
            "/api/admin/categories",
            &admin,
            json!({ "name": "Go", "color": "blue" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    let response = app
        .client
        .delete(app.url(&format!("/api/admin/categories/{}", id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = app
        .client
        .get(app.url(&format!("/api/categories/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn import_skips_invalid_questions() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post(
            "/api/admin/subjects",
            &admin,
            json!({ "name": "Arithmetic", "description": "Sums" }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let subject: Value = response.json().await.unwrap();
    let subject_id = subject["id"].as_i64().unwrap();

    let response = app
        .post(
            "/api/admin/questions/import",
            &admin,
            json!({
                "subject_id": subject_id,
                "questions": [
                    { "prompt": "1 + 1?", "options": ["1", "2"], "answer": 1 },
                    { "prompt": "No options", "options": [], "answer": 0 },
                    { "prompt": "2 + 2?", "options": ["4", "5"], "answer": 0, "difficulty": "easy" }
                ]
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 2);

    let listed: Value = app
        .client
        .get(app.url(&format!("/api/questions?subject={}&difficulty=easy", subject_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["prompt"], "2 + 2?");
    assert!(listed[0].get("answer").is_none());

    let response = app
        .post(
            "/api/admin/questions/import",
            &admin,
            json!({ "subject_id": 9999, "questions": [] }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn full_quiz_flow() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let category = app.create_category(&admin, "Basics").await;
    let q1 = app.create_question(&admin, "First?", category).await;
    let q2 = app.create_question(&admin, "Second?", category).await;
    let q3 = app.create_question(&admin, "Third?", category).await;

    let user = app.register("dave").await;

    // Start
    let response = app
        .post("/api/quiz/start", &user, json!({ "question_ids": [q1, q2, q3] }))
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let started: Value = response.json().await.unwrap();
    let attempt_id = started["attempt_id"].as_i64().unwrap();
    assert_eq!(started["total_questions"], 3);
    for q in started["questions"].as_array().unwrap() {
        assert!(q.get("answer").is_none());
        assert!(q.get("explanation").is_none());
    }

    // Answer: right, wrong, right (last)
    let answer_path = format!("/api/quiz/{}/answer", attempt_id);
    let feedback: Value = app
        .post(&answer_path, &user, json!({ "question_id": q1, "chosen_answer": 1, "time_spent": 10 }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["correct"], true);
    assert_eq!(feedback["correct_answer"], 1);
    assert_eq!(feedback["explanation"], "Because it is right");
    assert!(feedback.get("result").is_none());

    let feedback: Value = app
        .post(&answer_path, &user, json!({ "question_id": q2, "chosen_answer": 0, "time_spent": 20 }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(feedback["correct"], false);

    let response = app
        .post(
            &answer_path,
            &user,
            json!({ "question_id": q3, "chosen_answer": 1, "time_spent": 30, "is_last": true }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let feedback: Value = response.json().await.unwrap();
    assert_eq!(feedback["result"]["score"], 67);
    assert_eq!(feedback["result"]["correct_count"], 2);
    assert_eq!(feedback["result"]["total_count"], 3);
    assert_eq!(feedback["result"]["time_spent_seconds"], 60);

    // Finished attempts accept no more answers
    let response = app
        .post(&answer_path, &user, json!({ "question_id": q1, "chosen_answer": 0 }))
        .await;
    assert_eq!(response.status().as_u16(), 409);

    // Detail reveals answers once finished
    let detail: Value = app
        .get(&format!("/api/quiz/{}", attempt_id), &user)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(detail["summary"]["score"], 67);
    assert_eq!(detail["average_time_per_question"], 20);
    let questions = detail["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q["answer"] == 1));
    assert_eq!(detail["categories"][0]["correct"], 2);

    // History
    let attempts: Value = app.get("/api/attempts", &user).await.json().await.unwrap();
    assert_eq!(attempts.as_array().unwrap().len(), 1);
    assert_eq!(attempts[0]["score"], 67);
    assert!(attempts[0]["finished_at"].is_string());

    // Every answered question is scheduled; none is due yet
    let all: Value = app.get("/api/reviews?all=true", &user).await.json().await.unwrap();
    assert_eq!(all.as_array().unwrap().len(), 3);
    assert_eq!(all[0]["category"]["name"], "Basics");
    let due: Value = app.get("/api/reviews", &user).await.json().await.unwrap();
    assert!(due.as_array().unwrap().is_empty());

    // Per-category stats
    let stats: Value = app.get("/api/user/stats", &user).await.json().await.unwrap();
    assert_eq!(stats[0]["total_answers"], 3);
    assert_eq!(stats[0]["correct_answers"], 2);
    assert_eq!(stats[0]["category"]["name"], "Basics");

    // Answered questions are frozen
    let response = app
        .client
        .delete(app.url(&format!("/api/admin/questions/{}", q1)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn finishing_early_counts_unanswered_as_wrong() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Early").await;
    let q1 = app.create_question(&admin, "One?", category).await;
    let q2 = app.create_question(&admin, "Two?", category).await;

    let user = app.register("erin").await;
    let started: Value = app
        .post("/api/quiz/start", &user, json!({ "question_ids": [q1, q2] }))
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = started["attempt_id"].as_i64().unwrap();

    app.post(
        &format!("/api/quiz/{}/answer", attempt_id),
        &user,
        json!({ "question_id": q1, "chosen_answer": 1 }),
    )
    .await;

    let response = app
        .post(&format!("/api/quiz/{}/finish", attempt_id), &user, json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 200);
    let attempt: Value = response.json().await.unwrap();
    assert_eq!(attempt["score"], 50);

    let response = app
        .post(&format!("/api/quiz/{}/finish", attempt_id), &user, json!({}))
        .await;
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn quiz_rejects_foreign_and_unknown_input() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;
    let category = app.create_category(&admin, "Guard").await;
    let q1 = app.create_question(&admin, "Mine?", category).await;
    let q2 = app.create_question(&admin, "Not in attempt?", category).await;

    let owner = app.register("frank").await;
    let other = app.register("grace").await;

    // No questions
    let response = app
        .post("/api/quiz/start", &owner, json!({ "question_ids": [] }))
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Unknown question
    let response = app
        .post("/api/quiz/start", &owner, json!({ "question_ids": [q1, 424242] }))
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let started: Value = app
        .post("/api/quiz/start", &owner, json!({ "question_ids": [q1] }))
        .await
        .json()
        .await
        .unwrap();
    let attempt_id = started["attempt_id"].as_i64().unwrap();

    // Question outside the attempt
    let response = app
        .post(
            &format!("/api/quiz/{}/answer", attempt_id),
            &owner,
            json!({ "question_id": q2, "chosen_answer": 1 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 400);

    // Someone else's attempt looks missing
    let response = app.get(&format!("/api/quiz/{}", attempt_id), &other).await;
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn questions_must_reference_existing_category_and_subject() {
    let app = spawn_app().await;
    let admin = app.admin_token().await;

    let response = app
        .post(
            "/api/admin/questions",
            &admin,
            json!({ "prompt": "Orphan?", "options": ["a", "b"], "answer": 0, "category_id": 999 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .post(
            "/api/admin/questions",
            &admin,
            json!({ "prompt": "Orphan?", "options": ["a", "b"], "answer": 0, "subject_id": 777 }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 404);

    let category = app.create_category(&admin, "Real").await;
    let question = app.create_question(&admin, "Anchored?", category).await;

    let response = app
        .client
        .put(app.url(&format!("/api/admin/questions/{}", question)))
        .bearer_auth(&admin)
        .json(&json!({ "category_id": 999 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let stored: Value = app
        .client
        .get(app.url(&format!("/api/questions/{}", question)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored["category_id"], category);

    let response = app
        .post(
            "/api/admin/questions/import",
            &admin,
            json!({
                "questions": [
                    { "prompt": "Kept?", "options": ["a", "b"], "answer": 1, "category_id": category },
                    { "prompt": "Dropped?", "options": ["a", "b"], "answer": 1, "category_id": 999 }
                ]
            }),
        )
        .await;
    assert_eq!(response.status().as_u16(), 201);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn start_caps_question_count() {
    let app = spawn_app().await;
    let user = app.register("heidi").await;

    let ids: Vec<i64> = (1..=501).collect();
    let response = app
        .post("/api/quiz/start", &user, json!({ "question_ids": ids }))
        .await;

    assert_eq!(response.status().as_u16(), 400);
}
