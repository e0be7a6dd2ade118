use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Profiles,
    Tasks,
    Transactions,
    Inventory,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Tasks => "tasks",
            Self::Transactions => "transactions",
            Self::Inventory => "inventory",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub user_id: String,
    pub collection: Collection,
    pub at: DateTime<Utc>,
}

/// Server-sent events for every document change owned by the caller.
pub async fn live_changes(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, AppError> {
    let backend = state.backend()?;
    let receiver = backend.subscribe();
    debug!(user_id = %user.user_id, "live subscriber attached");

    let user_id = user.user_id;
    let stream = futures::stream::unfold(receiver, move |mut receiver| {
        let user_id = user_id.clone();
        async move {
            loop {
                match receiver.recv().await {
                    Ok(change) if change.user_id == user_id => {
                        let event = Event::default()
                            .event(change.collection.as_str())
                            .json_data(&change);
                        return Some((event, receiver));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%user_id, skipped, "live subscriber lagged; events dropped");
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
