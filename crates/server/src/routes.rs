//! Router and handlers.
//!
//! The predictor is loaded once at startup and shared read-only; handlers
//! never mutate it, so no locking is involved.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Serialize;

use hearth_predict::{InputField, PredictError, Predictor, RawForm, Stage};

use crate::pages::{render, PageState};

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
}

/// Builds the router.
///
/// Routes:
/// - `GET /` -- landing page
/// - `GET /predict` -- input form
/// - `POST /predict` -- form submission, re-renders the form with a price or an error
/// - `POST /api/predict` -- JSON prediction
/// - `GET /api/inputs` -- exposed inputs with defaults and options
/// - `GET /health` -- liveness plus model identity
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(landing_handler))
        .route("/predict", get(form_handler).post(submit_handler))
        .route("/api/predict", post(api_predict_handler))
        .route("/api/inputs", get(inputs_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

fn status_for(err: &PredictError) -> StatusCode {
    if err.is_user_error() {
        StatusCode::UNPROCESSABLE_ENTITY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn log_failure(err: &PredictError) {
    if err.is_user_error() {
        log::debug!("rejected request: {err}");
    } else {
        log::error!("prediction failed at {}: {err}", err.stage());
    }
}

async fn landing_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let p = &state.predictor;
    Html(render(&PageState::Landing, p.name(), &p.inputs()))
}

async fn form_handler(State(state): State<Arc<AppState>>) -> Html<String> {
    let p = &state.predictor;
    Html(render(&PageState::Form, p.name(), &p.inputs()))
}

async fn submit_handler(
    State(state): State<Arc<AppState>>,
    Form(fields): Form<HashMap<String, String>>,
) -> Response {
    let p = &state.predictor;
    let form: RawForm = fields.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
    let inputs = p.inputs();

    match p.run(&form) {
        Ok(prediction) => {
            log::info!("{}: predicted {}", p.name(), prediction.display);
            let page = PageState::Result { submitted: &fields, prediction: &prediction };
            Html(render(&page, p.name(), &inputs)).into_response()
        }
        Err(error) => {
            log_failure(&error);
            let page = PageState::Failed { submitted: &fields, error: &error };
            (status_for(&error), Html(render(&page, p.name(), &inputs))).into_response()
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub stage: Stage,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

impl From<&PredictError> for ErrorBody {
    fn from(err: &PredictError) -> Self {
        Self {
            error: ErrorDetail {
                stage: err.stage(),
                kind: err.kind(),
                message: err.public_message(),
            },
        }
    }
}

/// Body that never reached the predictor: not JSON, or a value that is
/// neither a number nor a string.
fn rejected_body(rejection: &JsonRejection) -> Response {
    log::debug!("rejected request body: {rejection}");
    let body = ErrorBody {
        error: ErrorDetail {
            stage: Stage::Collection,
            kind: "input_translation",
            message: rejection.body_text(),
        },
    };
    (rejection.status(), Json(body)).into_response()
}

async fn api_predict_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawForm>, JsonRejection>,
) -> Response {
    let form = match payload {
        Ok(Json(form)) => form,
        Err(rejection) => return rejected_body(&rejection),
    };

    match state.predictor.run(&form) {
        Ok(prediction) => {
            log::info!("{}: predicted {} (api)", state.predictor.name(), prediction.display);
            Json(prediction).into_response()
        }
        Err(error) => {
            log_failure(&error);
            (status_for(&error), Json(ErrorBody::from(&error))).into_response()
        }
    }
}

async fn inputs_handler(State(state): State<Arc<AppState>>) -> Json<Vec<InputField>> {
    Json(state.predictor.inputs())
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub model: String,
    pub model_version: String,
    pub features: usize,
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let p = &state.predictor;
    Json(HealthResponse {
        status: "ok",
        model: p.name().to_string(),
        model_version: p.model().version.clone(),
        features: p.schema().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use axum::body::Body;
    use axum::http::Request;
    use hearth_predict::{
        Artifacts, DefaultTable, FeatureSchema, MissingPolicy, ModelMetadata, TrainedModel,
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Three features, log-price label. At the defaults the linear model
    /// outputs exactly 12.5, i.e. a price of about $268,336.
    fn test_state() -> Arc<AppState> {
        state_with_intercept(12.0)
    }

    fn state_with_intercept(intercept: f64) -> Arc<AppState> {
        let artifacts = Artifacts {
            schema: FeatureSchema::from_json(r#"["OverallQual","GrLivArea","KitchenQual"]"#)
                .unwrap(),
            defaults: DefaultTable::new(HashMap::from([
                ("OverallQual".to_string(), 5.0),
                ("GrLivArea".to_string(), 1500f64.ln_1p()),
                ("KitchenQual".to_string(), 1.0),
            ]))
            .unwrap(),
            metadata: ModelMetadata::from_json(
                r#"{"version": "t1",
                    "categorical": {"KitchenQual": {"Fair": 1, "Good": 3}},
                    "log_features": ["GrLivArea"]}"#,
            )
            .unwrap(),
            model: TrainedModel::from_json(
                &serde_json::json!({
                    "version": "t1", "kind": "linear", "intercept": intercept,
                    "coefficients": [0.1, 0.0, 0.0],
                })
                .to_string(),
            )
            .unwrap(),
            top_features: None,
        };
        let predictor = Predictor::new("test-ridge", artifacts, true, MissingPolicy::Zero).unwrap();
        Arc::new(AppState { predictor: Arc::new(predictor) })
    }

    async fn body_string(resp: Response) -> String {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    fn form_post(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/predict")
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn landing_page_links_to_form() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let html = body_string(resp).await;
        assert!(html.contains("test-ridge"));
        assert!(html.contains("/predict"));
    }

    #[tokio::test]
    async fn form_page_lists_inputs() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(Request::builder().uri("/predict").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let html = body_string(resp).await;
        assert!(html.contains("name=\"OverallQual\""));
        assert!(html.contains("<option value=\"Fair\" selected>"));
    }

    #[tokio::test]
    async fn form_submit_renders_price() {
        let app = build_router(test_state());
        let resp = app.oneshot(form_post("OverallQual=10&GrLivArea=&KitchenQual=Good")).await.unwrap();
        assert_eq!(resp.status(), 200);
        let html = body_string(resp).await;
        // 12.0 + 0.1 * 10 = 13.0 -> expm1(13) = 442,412.39
        assert!(html.contains("Predicted Price: $442,412"), "{html}");
    }

    #[tokio::test]
    async fn form_submit_unknown_label_is_422() {
        let app = build_router(test_state());
        let resp = app.oneshot(form_post("KitchenQual=Excellent")).await.unwrap();
        assert_eq!(resp.status(), 422);
        let html = body_string(resp).await;
        assert!(html.contains("collection failed"));
        assert!(html.contains("Excellent"));
    }

    #[tokio::test]
    async fn api_predict_returns_price() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(json_post("/api/predict", serde_json::json!({"OverallQual": 5})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["raw"], 12.5);
        assert_eq!(body["display"], "$268,336");
        assert_eq!(body["label_is_log_transformed"], true);
        assert_eq!(body["model_version"], "t1");
        assert!(body["predicted_at"].is_string());
    }

    #[tokio::test]
    async fn api_predict_reports_stage() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(json_post("/api/predict", serde_json::json!({"KitchenQual": "Excellent"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"]["stage"], "collection");
        assert_eq!(body["error"]["kind"], "input_translation");
    }

    #[tokio::test]
    async fn api_predict_null_value_gets_json_error() {
        let app = build_router(test_state());
        let resp = app
            .oneshot(json_post("/api/predict", serde_json::json!({"OverallQual": null})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 422);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"]["stage"], "collection");
        assert_eq!(body["error"]["kind"], "input_translation");
        assert!(body["error"]["message"].as_str().unwrap().contains("OverallQual"));
    }

    #[tokio::test]
    async fn api_predict_malformed_json_gets_json_error() {
        let app = build_router(test_state());
        let req = Request::builder()
            .method("POST")
            .uri("/api/predict")
            .header("content-type", "application/json")
            .body(Body::from("{\"OverallQual\": "))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"]["stage"], "collection");
    }

    #[tokio::test]
    async fn overflowing_price_is_a_generic_500() {
        // expm1(1e6) is infinite
        let app = build_router(state_with_intercept(1.0e6));
        let resp = app
            .oneshot(json_post("/api/predict", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), 500);

        let body: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(body["error"]["stage"], "inference");
        assert_eq!(body["error"]["kind"], "inference");
        assert_eq!(body["error"]["message"], "prediction failed");
    }

    #[tokio::test]
    async fn overflowing_price_in_form_shows_stage() {
        let app = build_router(state_with_intercept(1.0e6));
        let resp = app.oneshot(form_post("OverallQual=5")).await.unwrap();
        assert_eq!(resp.status(), 500);
        let html = body_string(resp).await;
        assert!(html.contains("inference failed"), "{html}");
        assert!(html.contains("prediction failed"));
    }

    #[tokio::test]
    async fn api_inputs_and_health() {
        let state = test_state();

        let resp = build_router(Arc::clone(&state))
            .oneshot(Request::builder().uri("/api/inputs").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let inputs: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(inputs.as_array().unwrap().len(), 3);
        assert_eq!(inputs[1]["kind"], "log");
        assert_eq!(inputs[1]["default"], "1500");

        let resp = build_router(state)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
        assert_eq!(health["status"], "ok");
        assert_eq!(health["features"], 3);
    }
}
