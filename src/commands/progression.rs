use crate::models::progression::{PlantUnlockInput, ProgressionProfile, ProgressionRecord};

use super::{run_blocking, AppState, CommandResult};

pub async fn progression_get(
    state: &AppState,
    authorization: Option<&str>,
) -> CommandResult<ProgressionProfile> {
    let user = state.authorize(authorization)?;
    let service = state.progression();
    run_blocking(move || service.profile(&user.user_id)).await
}

/// Called by the identity provider once an account exists; not bearer-gated.
pub async fn progression_initialize(
    state: &AppState,
    user_id: String,
) -> CommandResult<ProgressionRecord> {
    let service = state.progression();
    run_blocking(move || service.initialize(&user_id)).await
}

pub async fn progression_unlock_plant(
    state: &AppState,
    authorization: Option<&str>,
    payload: PlantUnlockInput,
) -> CommandResult<ProgressionRecord> {
    let user = state.authorize(authorization)?;
    let service = state.progression();
    run_blocking(move || service.unlock_plant(&user.user_id, &payload.plant_type)).await
}
