use actix_web::http::StatusCode;
use actix_web::http::header;
use actix_web::{HttpResponse, ResponseError, web};
use chrono::Utc;
use sqlx::PgPool;
use std::error::Error;
use tracing_error::SpanTrace;
use uuid::Uuid;

use crate::configuration::{DuplicatePolicy, WaitlistSettings};
use crate::domain::{EmailPolicy, WaitlistEmail};
use crate::routes::error_chain_fmt;

#[derive(serde::Serialize)]
pub struct SubmitResponse {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicate: Option<bool>,
}

impl SubmitResponse {
    fn message(message: impl Into<String>) -> Self {
        SubmitResponse {
            message: message.into(),
            duplicate: None,
        }
    }
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("Server configuration error.")]
    MissingConfiguration,
    #[error("Invalid JSON payload.")]
    MalformedPayload(#[source] serde_json::Error),
    #[error("Invalid email address provided.")]
    InvalidEmail,
    #[error("This email is already on the waitlist.")]
    DuplicateEmail,
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(f, self)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::MalformedPayload(_) | SubscribeError::InvalidEmail => {
                StatusCode::BAD_REQUEST
            }
            SubscribeError::DuplicateEmail => StatusCode::CONFLICT,
            SubscribeError::MissingConfiguration | SubscribeError::UnexpectedError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(SubmitResponse::message(self.to_string()))
    }
}

#[tracing::instrument(
    name = "Adding an email to the waitlist",
    skip(body, pool, settings),
    fields(email = tracing::field::Empty)
)]
pub async fn subscribe(
    body: web::Bytes,
    pool: Option<web::Data<PgPool>>,
    settings: web::Data<WaitlistSettings>,
) -> Result<HttpResponse, SubscribeError> {
    // Checked before the payload is even parsed: a misconfigured deployment
    // answers the same way for every request.
    let pool = pool.ok_or_else(|| {
        tracing::error!("Server configuration error: database credentials are missing.");
        SubscribeError::MissingConfiguration
    })?;
    let email = parse_payload(&body, settings.email_validation)?;
    tracing::Span::current().record("email", tracing::field::display(&email));

    match insert_waitlist_entry(&pool, &email).await {
        Ok(()) => Ok(HttpResponse::Ok().json(SubmitResponse::message(
            "Success! You are on the waitlist.",
        ))),
        Err(InsertEntryError::Duplicate) => {
            tracing::warn!("Duplicate waitlist signup attempt for {email}");
            match settings.duplicate_policy {
                DuplicatePolicy::Conflict => Err(SubscribeError::DuplicateEmail),
                DuplicatePolicy::Accept => Ok(HttpResponse::Ok().json(SubmitResponse {
                    message: "This email is already on the waitlist.".into(),
                    duplicate: Some(true),
                })),
            }
        }
        Err(InsertEntryError::Store(e)) => Err(SubscribeError::UnexpectedError(
            anyhow::Error::new(e).context("Failed to add the email to the waitlist."),
        )),
    }
}

/// Answers anything other than POST on the submission resource.
pub async fn submission_method_not_allowed() -> HttpResponse {
    HttpResponse::MethodNotAllowed()
        .insert_header((header::ALLOW, "POST"))
        .json(SubmitResponse::message("Method Not Allowed"))
}

/// A body that is not JSON at all and a JSON body without a usable `email`
/// field are distinct failures; both end up as 400s.
fn parse_payload(body: &[u8], policy: EmailPolicy) -> Result<WaitlistEmail, SubscribeError> {
    let payload: serde_json::Value =
        serde_json::from_slice(body).map_err(SubscribeError::MalformedPayload)?;
    let email = payload
        .get("email")
        .and_then(|value| value.as_str())
        .ok_or(SubscribeError::InvalidEmail)?;
    WaitlistEmail::parse(email.to_owned(), policy).map_err(|reason| {
        tracing::info!("Rejected waitlist signup: {reason}");
        SubscribeError::InvalidEmail
    })
}

#[derive(Debug)]
pub struct StoreError {
    message: String,
    span_trace: SpanTrace,
}

impl StoreError {
    fn new(message: impl Into<String>) -> Self {
        StoreError {
            span_trace: SpanTrace::capture(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Error: {}", self.message)?;
        self.span_trace.fmt(f)?;
        Ok(())
    }
}

impl Error for StoreError {}

enum InsertEntryError {
    Duplicate,
    Store(StoreError),
}

#[tracing::instrument(name = "Saving a new waitlist entry in the database", skip(pool, email))]
async fn insert_waitlist_entry(
    pool: &PgPool,
    email: &WaitlistEmail,
) -> Result<(), InsertEntryError> {
    sqlx::query("INSERT INTO waitlist_entries (id, email, joined_at) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(email.as_ref())
        .bind(Utc::now())
        .execute(pool)
        .await
        .map_err(|err| {
            // The UNIQUE constraint on the email column is the only thing
            // serializing concurrent signups; its violation is an expected
            // outcome, not a server fault.
            if err
                .as_database_error()
                .is_some_and(|db_err| db_err.is_unique_violation())
            {
                return InsertEntryError::Duplicate;
            }
            let err = StoreError::new(err.to_string());
            tracing::error!("{}", err);
            InsertEntryError::Store(err)
        })?;

    Ok(())
}
