//! Shared test harness.
//! Note: #[allow(dead_code)] because each test file compiles common/ separately.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::Router;
use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::routing::get;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::ServiceExt;

use mediaviewer_api::homeserver::{
    HomeserverResolver, OverrideSource, ResolverConfig, WellKnownCache,
};
use mediaviewer_api::routes;
use mediaviewer_api::state::{AppState, AppStateInner};
use mediaviewer_db::Database;
use mediaviewer_db::shortcut_id::ShortcutMinter;

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestApp {
    pub fn new(config: ResolverConfig) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let db = Database::open(&temp_dir.path().join("mediaviewer.db"))
            .expect("Failed to open database");

        let frontend_dir = temp_dir.path().join("frontend");
        std::fs::create_dir_all(&frontend_dir).expect("Failed to create frontend directory");
        std::fs::write(frontend_dir.join("index.html"), "<html>viewer</html>")
            .expect("Failed to write index.html");
        std::fs::write(frontend_dir.join("index.js"), "console.log('viewer')")
            .expect("Failed to write index.js");

        let resolver = HomeserverResolver::new(config, Arc::new(WellKnownCache::new()))
            .expect("Failed to build resolver");

        let state: AppState = Arc::new(AppStateInner {
            db,
            minter: ShortcutMinter::new(1).expect("valid node id"),
            resolver,
            trust_forward_headers: false,
            frontend_dir,
        });

        let router = routes::router(state.clone())
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    pub async fn post_json(&self, path: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::post(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = self.send(req).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    pub async fn get(&self, path: &str, authorization: Option<&str>) -> (StatusCode, Vec<u8>) {
        let mut req = Request::get(path);
        if let Some(auth) = authorization {
            req = req.header(header::AUTHORIZATION, auth);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn get_json(
        &self,
        path: &str,
        authorization: Option<&str>,
    ) -> (StatusCode, serde_json::Value) {
        let (status, bytes) = self.get(path, authorization).await;
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    async fn send(&self, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }
}

#[allow(dead_code)]
pub fn static_overrides(pairs: &[(&str, &str)]) -> OverrideSource {
    OverrideSource::Static(
        pairs
            .iter()
            .map(|(domain, url)| (domain.to_string(), url.to_string()))
            .collect(),
    )
}

/// Resolver config that discovers over plain HTTP, for talking to
/// [`spawn_well_known`].
#[allow(dead_code)]
pub fn http_discovery() -> ResolverConfig {
    ResolverConfig {
        overrides: OverrideSource::Static(Default::default()),
        scheme: "http".into(),
        ..Default::default()
    }
}

/// A local stand-in for a homeserver's `.well-known/matrix/client`.
#[allow(dead_code)]
pub struct WellKnownServer {
    /// `127.0.0.1:<port>`, usable as a server name.
    pub domain: String,
    pub hits: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl WellKnownServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

#[allow(dead_code)]
pub async fn spawn_well_known(status: StatusCode, body: &'static str) -> WellKnownServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));

    let counter = hits.clone();
    let app = Router::new().route(
        "/.well-known/matrix/client",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (status, body)
            }
        }),
    );
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    WellKnownServer {
        domain: addr.to_string(),
        hits,
    }
}
