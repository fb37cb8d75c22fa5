//! OpenAPI documentation for the chatbot API.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health_check,
        crate::api::handlers::chat,
    ),
    components(
        schemas(
            crate::api::models::ChatRequest,
            crate::api::models::ChatResponse,
            crate::api::models::HealthResponse,
            crate::api::models::MethodErrorResponse,
            crate::api::models::ApiErrorResponse,
            crate::api::models::ApiErrorDetail,
        )
    ),
    tags(
        (name = "health", description = "Liveness endpoint"),
        (name = "chat", description = "Single-turn chat relayed to the completion API")
    ),
    info(
        title = "Chatbot Proxy API",
        version = "1.0.0",
        description = "Forwards a user message to a chat completion API and returns the reply."
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_both_endpoints() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/test/"));
        assert!(doc.paths.paths.contains_key("/chat/"));
    }

    #[test]
    fn test_openapi_health_check_lists_every_method() {
        let doc = ApiDoc::openapi();
        let item = &doc.paths.paths["/test/"];
        assert!(item.get.is_some());
        assert!(item.post.is_some());
        assert!(item.put.is_some());
        assert!(item.delete.is_some());
        assert!(item.patch.is_some());
        assert!(item.options.is_some());

        let chat = doc.paths.paths["/chat/"].post.as_ref().unwrap();
        assert!(chat.responses.responses.contains_key("413"));
    }

    #[test]
    fn test_openapi_serializes() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("Chatbot Proxy API"));
        assert!(json.contains("ChatRequest"));
    }
}
