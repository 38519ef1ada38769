use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Path of the interactive API explorer.
pub const SWAGGER_UI_PATH: &str = "/docs";
/// Path of the raw OpenAPI document.
pub const OPENAPI_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI over the fantasy API document. Stateless; merged into the stateful tree.
pub fn router() -> Router<SharedState> {
    SwaggerUi::new(SWAGGER_UI_PATH)
        .url(OPENAPI_PATH, ApiDoc::openapi())
        .into()
}
