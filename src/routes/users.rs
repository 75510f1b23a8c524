//! User routes

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::auth::{Authenticated, Identity};
use crate::error::Result;
use crate::metadata::UserRecord;
use crate::state::AppState;
use crate::upload::UploadError;

/// Create the users router
pub fn router() -> Router<AppState> {
    Router::new().route("/user", post(register))
}

#[derive(Serialize)]
struct UserProfile {
    #[serde(flatten)]
    identity: Identity,
    alloted_size: u64,
}

/// POST /user
///
/// Registers the caller with the default allotment on first sight.
async fn register(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
) -> Result<Json<UserProfile>> {
    let metadata = state.metadata();

    if let Some(user) = metadata.get_user(&identity.id).await.map_err(UploadError::from)? {
        tracing::info!(user_id = %user.id, "User present");
        return Ok(Json(UserProfile {
            identity,
            alloted_size: user.alloted_size,
        }));
    }

    let record = UserRecord {
        id: identity.id.clone(),
        email: identity.email.clone(),
        name: identity.name.clone().unwrap_or_default(),
        picture: identity.picture.clone(),
        alloted_size: state.config().quota.default_allotment,
    };
    metadata.create_user(&record).await.map_err(UploadError::from)?;

    tracing::info!(user_id = %record.id, alloted_size = record.alloted_size, "User registered");

    Ok(Json(UserProfile {
        identity,
        alloted_size: record.alloted_size,
    }))
}
