use serde_json::Value;
use tauri::State;

use crate::api::{ApiRequest, ApiResponse};
use crate::bridge::{BridgeRequest, BridgeResponse};
use crate::state::AppState;
use crate::AppResult;

/// Local host operations. Unknown operations fail to deserialize and never
/// reach the host.
#[tauri::command]
pub async fn bridge(
    state: State<'_, AppState>,
    request: BridgeRequest,
) -> AppResult<BridgeResponse> {
    state.bridge().dispatch(request).await
}

/// Remote REST calls made with the host's client, so the bearer token
/// never leaves the host.
#[tauri::command]
pub async fn api(
    state: State<'_, AppState>,
    request: ApiRequest,
) -> AppResult<ApiResponse<Value>> {
    request.send(&state.api).await
}
