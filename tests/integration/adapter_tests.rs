//! HTTP adapter tests against wiremock vendors

#[cfg(test)]
mod tests {
    use provider_gateway::config::{ProviderDescriptor, ProviderSettings};
    use provider_gateway::core::providers::{
        ChatMessage, CompletionRequest, GatewayRequest, HttpMessagingAdapter, MessageRequest,
        OpenAiCompatibleAdapter, ProviderAdapter,
    };
    use provider_gateway::AdapterErrorCode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn completion_adapter(server: &MockServer) -> OpenAiCompatibleAdapter {
        let descriptor =
            ProviderDescriptor::openai_compatible("openai", "sk-test").with_base_url(server.uri());
        let mut adapter = OpenAiCompatibleAdapter::new(&descriptor);
        adapter.initialize(&descriptor).await.unwrap();
        adapter
    }

    async fn messaging_adapter(server: &MockServer) -> HttpMessagingAdapter {
        let mut descriptor = ProviderDescriptor::http_messaging("wati", "tok", server.uri());
        if let ProviderSettings::HttpMessaging(settings) = &mut descriptor.settings {
            settings.sender_id = Some("+15550199".to_string());
            settings.health_path = Some("/health".to_string());
        }
        let mut adapter = HttpMessagingAdapter::new(&descriptor);
        adapter.initialize(&descriptor).await.unwrap();
        adapter
    }

    fn completion() -> GatewayRequest {
        GatewayRequest::Completion(CompletionRequest {
            model: Some("gpt-4o".to_string()),
            messages: vec![ChatMessage::system("Be brief."), ChatMessage::user("Hi")],
            max_tokens: Some(64),
            temperature: None,
        })
    }

    // ==================== Completion Adapter Tests ====================

    #[tokio::test]
    async fn test_completion_success_normalizes_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o", "max_tokens": 64})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-2024-08-06",
                "choices": [{"message": {"role": "assistant", "content": "Hello"}}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let response = adapter.execute(&completion()).await.unwrap();

        assert_eq!(response.usage.input_tokens, 12);
        assert_eq!(response.usage.output_tokens, 3);
        assert_eq!(response.model.as_deref(), Some("gpt-4o-2024-08-06"));
        assert_eq!(response.payload["choices"][0]["message"]["content"], "Hello");
    }

    #[tokio::test]
    async fn test_completion_server_error_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": {"message": "boom"}})),
            )
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let err = adapter.execute(&completion()).await.unwrap_err();

        assert_eq!(err.code, AdapterErrorCode::ServerError);
        assert!(err.retryable);
        assert_eq!(err.status, Some(500));
        assert!(err.message.contains("boom"));
    }

    #[tokio::test]
    async fn test_completion_rate_limit_keeps_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let err = adapter.execute(&completion()).await.unwrap_err();

        assert_eq!(err.code, AdapterErrorCode::RateLimited);
        assert!(err.retryable);
        assert_eq!(err.retry_after_secs, Some(30));
    }

    #[tokio::test]
    async fn test_overloaded_body_code_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "overloaded_error", "message": "Overloaded"}
            })))
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let err = adapter.execute(&completion()).await.unwrap_err();
        assert_eq!(err.code, AdapterErrorCode::Overloaded);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn test_completion_auth_failure_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let err = adapter.execute(&completion()).await.unwrap_err();
        assert_eq!(err.code, AdapterErrorCode::Unauthorized);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_completion_without_choices_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "list"})))
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let err = adapter.execute(&completion()).await.unwrap_err();
        assert_eq!(err.code, AdapterErrorCode::InvalidResponse);
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn test_completion_deadline_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(2))
                    .set_body_json(json!({"choices": []})),
            )
            .mount(&server)
            .await;
        let descriptor = ProviderDescriptor::openai_compatible("openai", "sk-test")
            .with_base_url(server.uri())
            .with_timeout_ms(100);
        let mut adapter = OpenAiCompatibleAdapter::new(&descriptor);
        adapter.initialize(&descriptor).await.unwrap();

        let err = adapter.execute(&completion()).await.unwrap_err();
        assert_eq!(err.code, AdapterErrorCode::Timeout);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn test_completion_health_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;
        let adapter = completion_adapter(&server).await;

        let report = adapter.health_check().await;
        assert!(report.is_healthy);
        assert_eq!(report.provider, "openai");
        assert!(adapter.is_healthy());
    }

    // ==================== Messaging Adapter Tests ====================

    #[tokio::test]
    async fn test_message_send_posts_recipient_and_sender() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("authorization", "Bearer tok"))
            .and(body_partial_json(json!({
                "to": "+15550100",
                "body": "Your code is 1234",
                "from": "+15550199"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "wamid.1"})))
            .expect(1)
            .mount(&server)
            .await;
        let adapter = messaging_adapter(&server).await;

        let response = adapter
            .execute(&GatewayRequest::message("+15550100", "Your code is 1234"))
            .await
            .unwrap();

        assert_eq!(response.payload["id"], "wamid.1");
        assert_eq!(response.usage.messages, 1);
    }

    #[tokio::test]
    async fn test_message_template_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(body_partial_json(json!({"template": "order_shipped"})))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;
        let adapter = messaging_adapter(&server).await;

        let request = GatewayRequest::Message(MessageRequest {
            to: "+15550100".to_string(),
            body: "Shipped".to_string(),
            template: Some("order_shipped".to_string()),
        });
        let response = adapter.execute(&request).await.unwrap();

        // Empty 2xx bodies normalize to an empty object
        assert_eq!(response.payload, json!({}));
    }

    #[tokio::test]
    async fn test_message_vendor_errors_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({"message": "token expired"})))
            .mount(&server)
            .await;
        let adapter = messaging_adapter(&server).await;

        let err = adapter
            .execute(&GatewayRequest::message("+15550100", "hi"))
            .await
            .unwrap_err();
        assert_eq!(err.code, AdapterErrorCode::Unauthorized);
        assert!(err.message.contains("token expired"));
    }

    #[tokio::test]
    async fn test_message_health_uses_health_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let adapter = messaging_adapter(&server).await;

        let report = adapter.health_check().await;
        assert!(!report.is_healthy);
        assert_eq!(report.message, "HTTP 500");
        assert!(!adapter.is_healthy());
    }

    #[tokio::test]
    async fn test_unreachable_vendor_is_a_network_error() {
        let descriptor = ProviderDescriptor::openai_compatible("openai", "sk-test")
            .with_base_url("http://127.0.0.1:9");
        let mut adapter = OpenAiCompatibleAdapter::new(&descriptor);
        adapter.initialize(&descriptor).await.unwrap();

        let err = adapter.execute(&completion()).await.unwrap_err();
        assert!(matches!(
            err.code,
            AdapterErrorCode::NetworkError | AdapterErrorCode::Timeout
        ));
        assert!(err.retryable);
    }
}
