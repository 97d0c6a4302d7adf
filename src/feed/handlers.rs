use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::audit::AuditSink;
use crate::auth::Identity;
use crate::db::{BoundQuery, FeedEntry, Storage};
use crate::error::AppError;
use crate::feed::query::FeedQueryBuilder;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PostRequest {
    pub text: String,
}

async fn load_entries(state: &AppState, query: &BoundQuery) -> Result<Vec<FeedEntry>, AppError> {
    let records = state.storage.execute(query).await?;
    let entries = records
        .iter()
        .map(FeedEntry::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}

pub async fn get_feed(
    identity: Identity,
    params: web::Query<FeedParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = FeedQueryBuilder::search(params.q.as_deref());

    match load_entries(&state, &query).await {
        Ok(entries) => {
            state
                .audit
                .activity(format!("User {} fetched tweets", identity.username));
            Ok(HttpResponse::Ok().json(entries))
        }
        Err(e) => {
            state
                .audit
                .error(format!("Failed to fetch tweets for {}: {}", identity.username, e));
            Err(e)
        }
    }
}

pub async fn post_feed(
    identity: Identity,
    body: web::Json<PostRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let query = FeedQueryBuilder::insert(&identity, &body.text);

    match state.storage.execute(&query).await {
        Ok(_) => {
            state.audit.activity(format!(
                "User {} posted a tweet: \"{}\"",
                identity.username, body.text
            ));
            Ok(HttpResponse::Created().json(serde_json::json!({
                "message": "Tweet posted successfully"
            })))
        }
        Err(e) => {
            state
                .audit
                .error(format!("Failed to post tweet for {}: {}", identity.username, e));
            Err(e.into())
        }
    }
}
