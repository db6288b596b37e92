mod common;

use anyhow::Result;
use articles_api::auth::validate_jwt;
use futures::future::join_all;
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::TestServer;

#[tokio::test]
async fn signup_hides_password_hash() -> Result<()> {
    let server = TestServer::spawn().await?;

    let res = server.signup("ada@example.com", "hunter2").await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "User created");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password").is_none());

    let stored = server
        .state
        .users()
        .find_one_by("email", "ada@example.com")
        .await?
        .unwrap();
    assert_ne!(stored.password, "hunter2");
    Ok(())
}

#[tokio::test]
async fn signup_rejects_duplicates_and_bad_input() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.signup("ada@example.com", "hunter2").await?;

    let res = server.signup("ada@example.com", "other").await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(res.json::<Value>().await?, json!({ "message": "Mail exists" }));

    let res = server.signup("not-an-email", "pw").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server.signup("bob@example.com", "").await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.state.users().find_all().await?.len(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_signups_admit_one_email() -> Result<()> {
    let server = TestServer::spawn().await?;

    let attempts = (0..8).map(|i| {
        let password = if i % 2 == 0 { "pw-a" } else { "pw-b" };
        server.signup("dup@example.com", password)
    });
    let mut created = 0;
    let mut conflicts = 0;
    for res in join_all(attempts).await {
        match res?.status() {
            StatusCode::OK => created += 1,
            StatusCode::CONFLICT => conflicts += 1,
            other => anyhow::bail!("unexpected status {other}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(conflicts, 7);
    assert_eq!(server.state.users().find_all().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn login_issues_token_the_guard_accepts() -> Result<()> {
    let server = TestServer::spawn().await?;
    let body: Value = server.signup("ada@example.com", "hunter2").await?.json().await?;
    let user_id = body["user"]["_id"].as_str().unwrap().to_string();

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "email": "ada@example.com", "password": "hunter2" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "Auth successful");
    let token = body["token"].as_str().unwrap().to_string();

    let claims = validate_jwt(&token, &server.state.config.security)?;
    assert_eq!(claims.sub, user_id);
    assert_eq!(claims.email, "ada@example.com");

    let res = server
        .client
        .get(server.url("/categories"))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn login_failures_are_indistinguishable() -> Result<()> {
    let server = TestServer::spawn().await?;
    server.signup("ada@example.com", "hunter2").await?;

    for credentials in [
        json!({ "email": "ada@example.com", "password": "wrong" }),
        json!({ "email": "nobody@example.com", "password": "hunter2" }),
    ] {
        let res = server
            .client
            .post(server.url("/users/login"))
            .json(&credentials)
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(res.json::<Value>().await?, json!({ "message": "Auth failed" }));
    }
    Ok(())
}

#[tokio::test]
async fn list_show_update_delete() -> Result<()> {
    let server = TestServer::spawn().await?;
    let body: Value = server.signup("ada@example.com", "hunter2").await?.json().await?;
    let id = body["user"]["_id"].as_str().unwrap().to_string();
    server.signup("bob@example.com", "pw").await?;
    let url = server.url(&format!("/users/{}", id));

    let body: Value = server.client.get(server.url("/users")).send().await?.json().await?;
    let users = body["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password").is_none()));

    let body: Value = server.client.get(&url).send().await?.json().await?;
    assert_eq!(body["user"]["email"], "ada@example.com");

    // Taking another user's email is refused
    let res = server
        .client
        .patch(&url)
        .json(&json!({ "email": "bob@example.com" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = server
        .client
        .patch(&url)
        .json(&json!({ "email": "ada@lovelace.dev", "password": "new-pass" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["message"], "User updated");
    assert_eq!(body["user"]["email"], "ada@lovelace.dev");

    let res = server
        .client
        .post(server.url("/users/login"))
        .json(&json!({ "email": "ada@lovelace.dev", "password": "new-pass" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = server.client.delete(&url).send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.json::<Value>().await?,
        json!({ "message": format!("User _id: {} Deleted", id) })
    );

    let res = server.client.get(&url).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?, json!({ "message": "User not found" }));
    Ok(())
}
