use crate::models::settings::{AppSettings, SettingsUpdateInput};

use super::{run_blocking, AppState, CommandResult};

pub async fn settings_get(
    state: &AppState,
    authorization: Option<&str>,
) -> CommandResult<AppSettings> {
    state.authorize(authorization)?;
    let service = state.settings();
    run_blocking(move || service.get()).await
}

pub async fn settings_update(
    state: &AppState,
    authorization: Option<&str>,
    payload: SettingsUpdateInput,
) -> CommandResult<AppSettings> {
    state.authorize(authorization)?;
    let service = state.settings();
    run_blocking(move || service.update(payload)).await
}
