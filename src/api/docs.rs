//! OpenAPI description of the public endpoints.

use utoipa::OpenApi;

use super::handlers::{self, HealthResponse, ServiceStatus, StatusResponse};

/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(title = "orbit", description = "Health and status endpoints"),
    paths(handlers::health, handlers::status),
    components(schemas(HealthResponse, StatusResponse, ServiceStatus)),
    tags(
        (name = "health", description = "Liveness check"),
        (name = "status", description = "Service status")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_both_endpoints() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();

        assert!(doc["paths"]["/health"]["get"].is_object());
        assert!(doc["paths"]["/api/v1/status"]["get"].is_object());
        assert!(doc["components"]["schemas"]["HealthResponse"].is_object());
    }
}
