#[cfg(feature = "server")]
pub mod http {
    use axum::{
        extract::State,
        http::StatusCode,
        response::{IntoResponse, Json},
        routing::{get, post},
        Router,
    };
    use rulebook::{
        CoverageEntry, Engine, ExecutionOptions, RulebookError, ValidationReport, Validator,
    };
    use serde::{Deserialize, Serialize};
    use std::collections::BTreeMap;
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tower_http::cors::CorsLayer;
    use tracing::{error, info};

    /// Programs loaded at startup, keyed by name
    type SharedPrograms = Arc<BTreeMap<String, Engine>>;

    type ApiError = (StatusCode, Json<ErrorResponse>);

    /// Either an inline program document or the name of a loaded one
    #[derive(Debug, Deserialize)]
    struct ProgramSelector {
        #[serde(default)]
        program: Option<serde_json::Value>,
        #[serde(default)]
        name: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    struct ValidateRequest {
        program: serde_json::Value,
    }

    #[derive(Debug, Deserialize)]
    struct RunRequest {
        #[serde(flatten)]
        selector: ProgramSelector,
        #[serde(default)]
        facts: serde_json::Value,
        #[serde(default)]
        options: Option<ExecutionOptions>,
    }

    #[derive(Debug, Serialize)]
    struct ValidateResponse {
        valid: bool,
        #[serde(flatten)]
        report: ValidationReport,
    }

    #[derive(Debug, Serialize)]
    struct CoverageResponse {
        rules: Vec<CoverageEntry>,
    }

    #[derive(Debug, Serialize)]
    struct ErrorResponse {
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        report: Option<ValidationReport>,
    }

    pub async fn start_server(
        programs: BTreeMap<String, Engine>,
        host: &str,
        port: u16,
    ) -> anyhow::Result<()> {
        let app = router(programs);

        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
        info!("Rulebook server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    pub fn router(programs: BTreeMap<String, Engine>) -> Router {
        Router::new()
            .route("/health", get(health_check))
            .route("/validate", post(validate))
            .route("/run", post(run))
            .route("/coverage", post(coverage))
            .layer(CorsLayer::permissive())
            .with_state(Arc::new(programs))
    }

    async fn health_check(State(programs): State<SharedPrograms>) -> impl IntoResponse {
        let names: Vec<&String> = programs.keys().collect();
        Json(serde_json::json!({
            "status": "ok",
            "service": "rulebook",
            "version": env!("CARGO_PKG_VERSION"),
            "programs": names,
        }))
    }

    /// Always answers 200 for a decodable program; `valid` carries the verdict
    async fn validate(
        Json(payload): Json<ValidateRequest>,
    ) -> Result<impl IntoResponse, ApiError> {
        let program =
            rulebook::serializers::program_from_value(payload.program).map_err(bad_request)?;
        let report = Validator::new().validate(&program);
        info!(
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "Validated program"
        );

        Ok(Json(ValidateResponse {
            valid: report.is_valid(),
            report,
        }))
    }

    async fn run(
        State(programs): State<SharedPrograms>,
        Json(payload): Json<RunRequest>,
    ) -> Result<impl IntoResponse, ApiError> {
        let result = with_engine(&programs, payload.selector, |engine| {
            let options = payload
                .options
                .clone()
                .unwrap_or_else(|| engine.options().clone());
            engine.run_with(&payload.facts, &options)
        })?
        .map_err(|e| {
            error!("Execution failed: {}", e);
            bad_request(e)
        })?;

        info!(
            firings = result.rule_firings,
            passes = result.passes,
            success = result.success,
            "Executed program"
        );
        let body = rulebook::serializers::result_to_json(&result).map_err(bad_request)?;
        Ok(Json(body))
    }

    async fn coverage(
        State(programs): State<SharedPrograms>,
        Json(selector): Json<ProgramSelector>,
    ) -> Result<impl IntoResponse, ApiError> {
        let rules = with_engine(&programs, selector, |engine| engine.assess_coverage())?;
        Ok(Json(CoverageResponse { rules }))
    }

    /// Resolve the selector and hand the engine to `f`
    fn with_engine<T>(
        programs: &BTreeMap<String, Engine>,
        selector: ProgramSelector,
        f: impl FnOnce(&Engine) -> T,
    ) -> Result<T, ApiError> {
        match (selector.program, selector.name) {
            (Some(document), _) => {
                let program =
                    rulebook::serializers::program_from_value(document).map_err(bad_request)?;
                let engine = Engine::new(program).map_err(bad_request)?;
                Ok(f(&engine))
            }
            (None, Some(name)) => match programs.get(&name) {
                Some(engine) => Ok(f(engine)),
                None => Err((
                    StatusCode::NOT_FOUND,
                    Json(ErrorResponse {
                        error: format!("Program '{}' not found", name),
                        report: None,
                    }),
                )),
            },
            (None, None) => Err((
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "Request must carry a program or a program name".to_string(),
                    report: None,
                }),
            )),
        }
    }

    fn bad_request(error: RulebookError) -> ApiError {
        let report = match &error {
            RulebookError::InvalidProgram(report) => Some(report.clone()),
            _ => None,
        };
        let error = match &error {
            RulebookError::InvalidProgram(report) => {
                format!("Program rejected with {} error(s)", report.errors.len())
            }
            other => other.to_string(),
        };
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse { error, report }),
        )
    }

}
