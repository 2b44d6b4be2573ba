use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    get, post, web, HttpResponse,
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::{AppConfig, Environment},
    db::{verify_unknown_account, NewUser, UserProfile, UserRepository},
    error::{ApiError, Result},
    jwt::{JwtService, SessionClaims},
    middleware::TOKEN_COOKIE,
    validation::{parse_sign_in, parse_signup},
};

/// Session cookies live for 15 minutes even though the token itself is
/// valid for a day.
const COOKIE_MAX_AGE_MINUTES: i64 = 15;

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: SessionClaims,
}

pub fn session_cookie(token: String, environment: Environment) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token)
        .path("/")
        .http_only(true)
        .secure(environment.is_production())
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::minutes(COOKIE_MAX_AGE_MINUTES))
        .finish()
}

#[post("/sign-up")]
pub async fn sign_up(
    body: web::Json<Value>,
    users: web::Data<UserRepository>,
    jwt: web::Data<JwtService>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse> {
    let request = parse_signup(&body)?;

    log::info!("Sign-up attempt for {}", request.email);

    if users.find_by_email(&request.email).await?.is_some() {
        log::warn!("Sign-up rejected, email already registered: {}", request.email);
        return Err(ApiError::EmailTaken);
    }

    let new_user = NewUser::new(request.name, request.email, &request.password, request.role)?;

    let user = users.create(&new_user).await.map_err(|err| {
        if err.is_unique_violation() {
            ApiError::EmailTaken
        } else {
            ApiError::from(err)
        }
    })?;

    let token = jwt.sign(&SessionClaims::from(&user))?;

    log::info!("User registered successfully: {}", user.email);

    let response = AuthResponse {
        success: true,
        message: "User registered".to_string(),
        user: UserProfile::from(&user),
    };

    Ok(HttpResponse::Created()
        .cookie(session_cookie(token, config.environment))
        .json(response))
}

#[post("/sign-in")]
pub async fn sign_in(
    body: web::Json<Value>,
    users: web::Data<UserRepository>,
    jwt: web::Data<JwtService>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse> {
    let request = parse_sign_in(&body)?;

    log::info!("Sign-in attempt for {}", request.email);

    let Some(user) = users.find_by_email(&request.email).await? else {
        verify_unknown_account(&request.password);
        log::warn!("Failed sign-in attempt for {}", request.email);
        return Err(ApiError::InvalidCredentials);
    };

    if !user.verify_password(&request.password)? {
        log::warn!("Failed sign-in attempt for {}", request.email);
        return Err(ApiError::InvalidCredentials);
    }

    let token = jwt.sign(&SessionClaims::from(&user))?;

    log::info!("User signed in successfully: {}", user.email);

    let response = AuthResponse {
        success: true,
        message: "User signed in successfully".to_string(),
        user: UserProfile::from(&user),
    };

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token, config.environment))
        .json(response))
}

#[post("/sign-out")]
pub async fn sign_out() -> Result<HttpResponse> {
    let cookie = Cookie::build(TOKEN_COOKIE, "")
        .path("/")
        .max_age(CookieDuration::seconds(0))
        .finish();

    log::info!("User signed out");

    let response = SignOutResponse {
        success: true,
        message: "User signed out successfully".to_string(),
    };

    Ok(HttpResponse::Ok().cookie(cookie).json(response))
}

#[get("/me")]
pub async fn me(claims: web::ReqData<SessionClaims>) -> Result<HttpResponse> {
    let response = SessionResponse {
        success: true,
        user: claims.into_inner(),
    };

    Ok(HttpResponse::Ok().json(response))
}
