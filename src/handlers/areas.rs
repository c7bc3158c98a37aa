use axum::response::Json;

use crate::{
    models::{area::registry, AreaInfo},
    ApiResponse, ApiResult,
};

/// Area registry
#[utoipa::path(
    get,
    path = "/api/v1/areas",
    summary = "List areas",
    description = "Every production area with its display name and whether it can receive pieces",
    responses(
        (status = 200, description = "Areas listed", body = ApiResponse<Vec<AreaInfo>>),
    )
)]
pub async fn list_areas() -> ApiResult<Vec<AreaInfo>> {
    Ok(Json(ApiResponse::success(registry())))
}
