//! HTTP server for anonymous drawings.
//!
//! Serves the gallery, sharing and bumping endpoints over a journaled
//! [`drawings_kv::KvEngine`], renders drawings as PNG, and runs the
//! background task that purges expired rate-limit markers.

pub mod config;
pub mod error;
pub mod handler;
pub mod png;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{ApiError, AppState};
pub use png::PngEncoder;
pub use server::{spawn_sweeper, DrawingsServer};

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::extract::connect_info::MockConnectInfo;
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use axum::Router;
    use drawings_core::Canvas;
    use drawings_kv::ManualClock;
    use tower::util::ServiceExt;

    fn server() -> (DrawingsServer, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let server =
            DrawingsServer::open_with_clock(ServerConfig::default(), clock.clone()).unwrap();
        (server, clock)
    }

    fn app(server: &DrawingsServer, host: u8) -> Router {
        server
            .router()
            .layer(MockConnectInfo(SocketAddr::from(([10, 0, 0, host], 40_000))))
    }

    fn varied() -> Vec<u8> {
        (0..Canvas::DEFAULT.buffer_len())
            .map(|i| (i % 200) as u8)
            .collect()
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Vec<u8>) -> Response {
        app.clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&body_text(response).await).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    async fn share(app: &Router, gallery: &str) -> String {
        let uri = format!("/share?gallery={gallery}");
        let response = send(app, Method::POST, &uri, varied()).await;
        assert_eq!(response.status(), StatusCode::OK);
        body_text(response).await
    }

    #[tokio::test]
    async fn shared_drawing_is_listed_and_viewable() {
        let (server, _clock) = server();
        let app = app(&server, 1);
        let id = share(&app, "art").await;
        assert_eq!(id.len(), 8);

        let listing = body_json(send(&app, Method::GET, "/galleries/art", vec![]).await).await;
        assert_eq!(listing["ids"], serde_json::json!([id]));
        assert_eq!(listing["title"], "art");
        assert_eq!(listing["shareable"], true);

        let all = body_json(send(&app, Method::GET, "/galleries/all", vec![]).await).await;
        assert_eq!(all["ids"], serde_json::json!([id]));
        assert_eq!(all["shareable"], false);

        let front = body_json(send(&app, Method::GET, "/", vec![]).await).await;
        assert_eq!(front["ids"], serde_json::json!([]));

        let view = body_json(send(&app, Method::GET, &format!("/{id}"), vec![]).await).await;
        assert_eq!(view["gallery"], "art");
        assert_eq!(view["bump"], "not_bumpable");
        assert_eq!(view["created_at"], "1970-01-01T00:00:01.000Z");
        assert_eq!(view["image_url"], format!("/{id}.png"));
    }

    #[tokio::test]
    async fn image_is_png() {
        let (server, _clock) = server();
        let app = app(&server, 1);
        let id = share(&app, "public").await;

        let response = send(&app, Method::GET, &format!("/{id}.png"), vec![]).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..4], b"\x89PNG");

        let missing = send(&app, Method::GET, "/zzzzzzzz.png", vec![]).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn share_errors_map_to_statuses() {
        let (server, clock) = server();
        let app = app(&server, 1);

        let blank = vec![0x33; Canvas::DEFAULT.buffer_len()];
        let response = send(&app, Method::POST, "/share", blank).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, Method::POST, "/share", vec![1, 2, 3]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, Method::POST, "/share?gallery=a--b", varied()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        share(&app, "public").await;
        let response = send(&app, Method::POST, "/share", varied()).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        clock.advance(15_000);
        share(&app, "public").await;
    }

    #[tokio::test]
    async fn bump_redirects_and_reorders() {
        let (server, clock) = server();
        let first = share(&app(&server, 1), "public").await;
        clock.set(2_000);
        let second = share(&app(&server, 2), "public").await;

        let front = body_json(send(&app(&server, 3), Method::GET, "/", vec![]).await).await;
        assert_eq!(front["ids"], serde_json::json!([second, first]));

        clock.set(5_000);
        let bumper = app(&server, 3);
        let response = send(&bumper, Method::POST, &format!("/{first}"), vec![]).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), format!("/{first}"));

        let front = body_json(send(&bumper, Method::GET, "/", vec![]).await).await;
        assert_eq!(front["ids"], serde_json::json!([first, second]));

        let view = body_json(send(&bumper, Method::GET, &format!("/{first}"), vec![]).await).await;
        assert_eq!(view["score"], 3_000);
        assert_eq!(view["bump"], "already_bumped");

        let again = send(&bumper, Method::POST, &format!("/{first}"), vec![]).await;
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn bump_errors_map_to_statuses() {
        let (server, _clock) = server();
        let app = app(&server, 1);
        let art = share(&app, "art").await;

        let response = send(&app, Method::POST, &format!("/{art}"), vec![]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, Method::POST, "/zzzzzzzz", vec![]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, Method::POST, "/not-an-id", vec![]).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn gallery_redirects() {
        let (server, _clock) = server();
        let app = app(&server, 1);

        let response = send(&app, Method::GET, "/galleries?name=My%20Cool-Art", vec![]).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/galleries/my-cool-art");

        let response = send(&app, Method::GET, "/galleries/public", vec![]).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(location(&response), "/");

        let response = send(&app, Method::GET, "/galleries/a--b", vec![]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, Method::GET, "/galleries/my-cool-art", vec![]).await;
        let listing = body_json(response).await;
        assert_eq!(listing["title"], "my cool art");
    }

    #[tokio::test]
    async fn draw_validates_target() {
        let (server, _clock) = server();
        let app = app(&server, 1);

        let target = body_json(send(&app, Method::GET, "/draw", vec![]).await).await;
        assert_eq!(target["gallery"], "public");
        assert_eq!(target["width"], 320);
        assert_eq!(target["height"], 240);
        assert_eq!(target["palette"].as_array().unwrap().len(), 16);

        let target = body_json(send(&app, Method::GET, "/draw?art", vec![]).await).await;
        assert_eq!(target["share_url"], "/share?gallery=art");

        let response = send(&app, Method::GET, "/draw?all", vec![]).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found() {
        let (server, _clock) = server();
        let app = app(&server, 1);
        for uri in ["/favicon.ico", "/abcdefgh", "/ABCDEFGH"] {
            let response = send(&app, Method::GET, uri, vec![]).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[test]
    fn internal_errors_hide_details() {
        let err = ApiError::from(drawings_core::DrawingsError::Record("bad bytes".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let conflict = ApiError::from(drawings_core::DrawingsError::Conflict);
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
    }
}
