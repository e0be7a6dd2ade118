use crate::errors::ServiceError;
use crate::live::Collection;
use crate::models::{AppData, PersonalDetails, ProfileUpdateRequest, UserProfile};
use crate::storage::Backend;
use chrono::{DateTime, Utc};
use tracing::info;

const MAX_FIELD_LEN: usize = 200;

/// Read-or-create. Only the first access takes the write path.
pub async fn load(backend: &Backend, user_id: &str) -> Result<UserProfile, ServiceError> {
    if let Some(profile) = backend.read(|data| data.profiles.get(user_id).cloned()).await {
        return Ok(profile);
    }
    let profile = backend
        .transact(|data| Ok(get_or_create(data, user_id, Utc::now()).clone()))
        .await?;
    backend.notify(user_id, &[Collection::Profiles]);
    Ok(profile)
}

/// Returns the caller's profile, creating an empty one on first access.
pub fn get_or_create<'a>(data: &'a mut AppData, user_id: &str, now: DateTime<Utc>) -> &'a mut UserProfile {
    data.profiles.entry(user_id.to_string()).or_insert_with(|| {
        info!(user_id, "profile created");
        UserProfile::new(user_id, now)
    })
}

/// `None` keeps a field, an empty string clears it, anything else replaces it.
pub fn apply_details(details: &mut PersonalDetails, update: ProfileUpdateRequest) -> Result<(), ServiceError> {
    let fields = [
        (&mut details.display_name, update.display_name, "display name"),
        (&mut details.phone, update.phone, "phone"),
        (&mut details.address, update.address, "address"),
        (&mut details.city, update.city, "city"),
        (&mut details.state, update.state, "state"),
        (&mut details.zip_code, update.zip_code, "zip code"),
    ];

    let mut staged = Vec::with_capacity(fields.len());
    for (slot, value, label) in fields {
        let Some(value) = value else {
            continue;
        };
        let value = value.trim();
        if value.chars().count() > MAX_FIELD_LEN {
            return Err(ServiceError::validation(format!(
                "{label} must be at most {MAX_FIELD_LEN} characters"
            )));
        }
        staged.push((slot, (!value.is_empty()).then(|| value.to_string())));
    }

    for (slot, value) in staged {
        *slot = value;
    }
    Ok(())
}

pub fn update_details(
    data: &mut AppData,
    user_id: &str,
    update: ProfileUpdateRequest,
    now: DateTime<Utc>,
) -> Result<UserProfile, ServiceError> {
    let profile = get_or_create(data, user_id, now);
    apply_details(&mut profile.details, update)?;
    profile.updated_at = now;
    Ok(profile.clone())
}
