#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::SecurityConfig;
    use crate::tests::{test_app, test_app_with, test_config};

    #[tokio::test]
    async fn test_healthz_endpoint() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_readyz_endpoint() {
        let app = test_app().await;
        let (status, body) = app.request(Method::GET, "/readyz", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ready");
    }

    #[tokio::test]
    async fn test_version_endpoint() {
        let app = test_app().await;
        let (status, body) = app.request(Method::GET, "/version", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "book-exchange");
        assert!(body["version"].is_string());
    }

    #[tokio::test]
    async fn test_metrics_endpoints() {
        let app = test_app().await;
        app.signup("reader@example.com").await;

        let (status, body) = app.request(Method::GET, "/metrics", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["signups"], 1);
        assert_eq!(body["emails_sent"], 1);

        let (status, body) = app.request(Method::GET, "/metrics/prometheus", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let text = body.as_str().unwrap();
        assert!(text.contains("# TYPE book_exchange_signups counter"));
        assert!(text.contains("book_exchange_signups 1"));
        assert!(text.contains("book_exchange_uptime_seconds"));
    }

    #[tokio::test]
    async fn test_security_headers_present() {
        let app = test_app().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/does-not-exist").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let headers = response.headers();
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["cache-control"], "no-store");
        assert!(headers.get("strict-transport-security").is_none());
    }

    #[tokio::test]
    async fn test_hsts_when_enabled() {
        let mut config = test_config();
        config.security = Some(SecurityConfig { enable_hsts: Some(true), ..Default::default() });
        let app = test_app_with(config).await;

        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()["strict-transport-security"], "max-age=31536000");
    }

    #[tokio::test]
    async fn test_global_rate_limit() {
        let mut config = test_config();
        config.rate_limit.global_max_requests = 3;
        let app = test_app_with(config).await;

        for _ in 0..3 {
            let (status, _) = app.request(Method::GET, "/healthz", None, None).await;
            assert_eq!(status, StatusCode::OK);
        }
        let (status, body) = app.request(Method::GET, "/healthz", None, None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
        assert_eq!(app.state.global_limiter.tracked_ips().await, 1);
    }
}
