//! Drill catalog endpoints (static reference data)

use axum::{extract::Path, routing::get, Json, Router};
use serde::Serialize;

use super::AppState;
use crate::analysis::drills::{drills_in_category, find_drill, Drill, CATEGORIES, DRILLS};
use crate::error::{ApiError, ApiResult};

#[derive(Debug, Serialize)]
pub struct DrillListResponse {
    pub drills: &'static [Drill],
    pub categories: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category: String,
    pub drills: Vec<&'static Drill>,
}

/// GET /drills
pub async fn list_drills() -> Json<DrillListResponse> {
    Json(DrillListResponse {
        drills: DRILLS,
        categories: CATEGORIES,
    })
}

/// GET /drill/:name
pub async fn get_drill(Path(name): Path<String>) -> ApiResult<Json<&'static Drill>> {
    find_drill(&name)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("drill {}", name)))
}

/// GET /drills/category/:category
pub async fn drills_by_category(Path(category): Path<String>) -> Json<CategoryResponse> {
    Json(CategoryResponse {
        drills: drills_in_category(&category),
        category,
    })
}

pub fn drill_routes() -> Router<AppState> {
    Router::new()
        .route("/drills", get(list_drills))
        .route("/drill/:name", get(get_drill))
        .route("/drills/category/:category", get(drills_by_category))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::oracle::testing::ScriptedOracle;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_list_drills() {
        let app = test_app(Arc::new(ScriptedOracle::default()));
        let response = app.oneshot(empty_request("GET", "/drills")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert!(body["drills"].as_array().unwrap().len() >= 10);
        assert_eq!(body["categories"][0], "fundamentals");
    }

    #[tokio::test]
    async fn test_get_drill_by_slug() {
        let app = test_app(Arc::new(ScriptedOracle::default()));
        let response = app
            .oneshot(empty_request("GET", "/drill/crossover"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "Crossover Practice");
    }

    #[tokio::test]
    async fn test_unknown_drill_is_404() {
        let app = test_app(Arc::new(ScriptedOracle::default()));
        let response = app
            .oneshot(empty_request("GET", "/drill/moonwalk"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_category_listing() {
        let app = test_app(Arc::new(ScriptedOracle::default()));
        let response = app
            .oneshot(empty_request("GET", "/drills/category/advanced"))
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["category"], "advanced");
        let drills = body["drills"].as_array().unwrap();
        assert!(!drills.is_empty());
        assert!(drills.iter().all(|d| d["category"] == "advanced"));
    }
}
