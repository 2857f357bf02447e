use log::info;
use mongodb::bson::doc;
use rocket::{
    http::{CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{AuthToken, AUTH_TOKEN_COOKIE},
            user::{AuthResponse, Credentials, Registration},
            Message,
        },
        db::user::{NewUser, User},
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![register, login, logout]
}

/// Issue a token for the user, set it as a cookie, and describe the user.
fn sign_in(
    user: User,
    message: &str,
    cookies: &CookieJar<'_>,
    config: &Config,
) -> Result<Json<AuthResponse>> {
    let token = AuthToken::new(&user).encode(config)?;
    cookies.add(AuthToken::cookie(token.clone(), config));
    Ok(Json(AuthResponse {
        message: message.to_string(),
        token,
        user: user.into(),
    }))
}

#[post("/auth/register", data = "<registration>", format = "json")]
async fn register(
    registration: Json<Registration>,
    cookies: &CookieJar<'_>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<(Status, Json<AuthResponse>)> {
    let user = User {
        id: Id::new(),
        user: NewUser::try_from(registration.into_inner())?,
    };

    if let Err(e) = users.insert_one(&user, None).await {
        return Err(if is_duplicate_key_error(&e) {
            Error::InvalidInput("Username or email already registered".to_string())
        } else {
            e.into()
        });
    }
    info!("Registered user {} ({})", user.username, user.id);

    let reply = sign_in(user, "User registered successfully", cookies, config)?;
    Ok((Status::Created, reply))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    credentials: Json<Credentials>,
    cookies: &CookieJar<'_>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<AuthResponse>> {
    let with_email = doc! {
        "email": credentials.email.trim().to_lowercase(),
    };

    let user = users
        .find_one(with_email, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::Unauthorized("Invalid email or password".to_string()))?;

    sign_in(user, "Login successful", cookies, config)
}

#[delete("/auth")]
fn logout(cookies: &CookieJar<'_>) -> Json<Message> {
    cookies.remove(AUTH_TOKEN_COOKIE);
    Json(Message::new("Logged out"))
}

#[cfg(test)]
mod tests {
    use mongodb::Database;
    use rocket::{
        http::{ContentType, Header},
        local::asynchronous::Client,
        serde::json::serde_json::{json, Value},
    };

    use super::*;

    #[backend_test]
    async fn register_then_login(client: Client, users: Coll<User>) {
        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(json!(Registration::example()).to_string())
            .dispatch()
            .await;

        assert_eq!(Status::Created, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["user"]["username"], json!("alice"));
        assert!(body["user"].get("passwordHash").is_none());
        assert!(body["token"].as_str().is_some());

        let stored = users
            .find_one(doc! { "username": "alice" }, None)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password_hash, Registration::example().password);

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!(Credentials::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["user"]["id"], json!(stored.id.to_string()));
    }

    #[backend_test]
    async fn duplicate_registration(client: Client) {
        for expected in [Status::Created, Status::BadRequest] {
            let response = client
                .post("/api/auth/register")
                .header(ContentType::JSON)
                .body(json!(Registration::example()).to_string())
                .dispatch()
                .await;
            assert_eq!(expected, response.status());
        }
    }

    #[backend_test]
    async fn invalid_registration(client: Client) {
        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(json!({ "username": "eve", "email": "eve", "password": "secret123" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::BadRequest, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(user)]
    async fn login_wrong_password(client: Client) {
        client.delete("/api/auth").dispatch().await;

        let response = client
            .post("/api/auth/login")
            .header(ContentType::JSON)
            .body(json!({ "email": "alice@example.com", "password": "not it" }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));
    }

    #[backend_test(user)]
    async fn logout_clears_cookie(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client.delete("/api/auth").dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        // Protected routes now refuse the client.
        let response = client.get("/api/forms/user/000000000000000000000000").dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());
    }

    #[backend_test]
    async fn bearer_token_is_accepted(client: Client, db: Database) {
        let response = client
            .post("/api/auth/register")
            .header(ContentType::JSON)
            .body(json!(Registration::example()).to_string())
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        let token = body["token"].as_str().unwrap().to_string();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        client.delete("/api/auth").dispatch().await;

        let path = format!("/api/forms/user/{user_id}/stats");
        let response = client.get(path.as_str()).dispatch().await;
        assert_eq!(Status::Unauthorized, response.status());

        let response = client
            .get(path.as_str())
            .header(Header::new("Authorization", format!("Bearer {token}")))
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        // Tokens for deleted users are refused.
        Coll::<User>::from_db(&db)
            .delete_many(doc! {}, None)
            .await
            .unwrap();
        let response = client
            .get(path.as_str())
            .header(Header::new("Authorization", format!("Bearer {token}")))
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
    }
}
