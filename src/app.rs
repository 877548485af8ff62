#![cfg(feature = "web")]

use axum::{
    Extension, Router,
    extract::{Query, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_extra::extract::cookie::CookieJar;
use log::{error, info, warn};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::error::ConnectionError;
use crate::gateway::{Gateway, TableRef, TableSource};
use crate::loader::CsvDirectory;
use crate::login::{
    SESSION_COOKIE, handle_login, handle_logout, require_auth, require_lawyer, serve_login_page,
};
use crate::render::Views;
use crate::session::{Session, SessionStore};
use crate::settings::{Settings, SourceKind};
use crate::sheets::{GoogleSheets, ServiceAccountKey};
use crate::views::{CasesPage, SettingsPage, Sidebar};

/// Shared state of the running portal
pub struct AppState {
    /// Established once at startup and never retried
    pub connection: Result<Gateway, ConnectionError>,
    pub sessions: SessionStore,
    pub views: Views,
    /// Mark the session cookie `Secure`; off only for plain-HTTP demos
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(
        connection: Result<Gateway, ConnectionError>,
        sessions: SessionStore,
        views: Views,
    ) -> Self {
        if let Err(e) = &connection {
            error!("data source unavailable, all data operations disabled: {}", e);
        }
        AppState {
            connection,
            sessions,
            views,
            secure_cookies: true,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// `None` when the startup connection failed
    pub fn gateway(&self) -> Option<&Gateway> {
        self.connection.as_ref().ok()
    }

    /// Text for the banner shown on every page after a failed connection
    pub fn connection_banner(&self) -> Option<String> {
        self.connection.as_ref().err().map(|e| e.to_string())
    }

    /// Resolve the request's session cookie
    pub fn session_from(&self, jar: &CookieJar) -> Session {
        jar.get(SESSION_COOKIE)
            .map(|cookie| self.sessions.resolve(cookie.value()))
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct CaseQuery {
    case: Option<String>,
}

/// Open the configured table source
pub fn open_source(settings: &Settings) -> Result<Arc<dyn TableSource>, ConnectionError> {
    match settings.source.kind {
        SourceKind::Google => {
            let key = ServiceAccountKey::load(&settings.source.credentials_file)?;
            let sheets = GoogleSheets::new(
                key,
                &settings.source.spreadsheet_id,
                &settings.source.api_base,
            )?;
            Ok(Arc::new(sheets))
        }
        SourceKind::Csv => Ok(Arc::new(CsvDirectory::new(&settings.source.csv_dir))),
    }
}

/// Open the source and check its tables, once
pub async fn connect(settings: &Settings) -> Result<Gateway, ConnectionError> {
    let source = open_source(settings)?;
    Gateway::connect(source, settings.tables.clone()).await
}

/// Build the router over an already prepared state
pub fn router(state: Arc<AppState>) -> Router {
    let lawyer_only = Router::new()
        .route("/settings", get(serve_settings))
        .route_layer(middleware::from_fn(require_lawyer));

    let protected = Router::new()
        .route("/cases", get(serve_cases))
        .merge(lawyer_only)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/", get(serve_root))
        .route("/login", get(serve_login_page).post(handle_login))
        .route("/logout", post(handle_logout))
        .merge(protected)
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let connection = connect(&settings).await;
    let state = Arc::new(AppState::new(
        connection,
        SessionStore::new(settings.server.session_ttl()),
        Views::new()?,
    )
    .with_secure_cookies(settings.server.secure_cookies));

    let app = router(state);

    let listener = TcpListener::bind(&settings.server.bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed = started.elapsed();
    if status.is_server_error() {
        warn!("{} {} -> {} ({:?})", method, path, status, elapsed);
    } else {
        info!("{} {} -> {} ({:?})", method, path, status, elapsed);
    }
    response
}

async fn serve_root(State(state): State<Arc<AppState>>, jar: CookieJar) -> Redirect {
    if state.session_from(&jar).is_logged_in() {
        Redirect::to("/cases")
    } else {
        Redirect::to("/login")
    }
}

async fn serve_cases(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Query(query): Query<CaseQuery>,
) -> Response {
    let selected = query.case.as_deref();
    let mut page = match state.gateway() {
        Some(gateway) => {
            let processes = gateway.load_table(TableRef::Processes).await;
            let history = gateway.load_table(TableRef::History).await;
            CasesPage::build(&session, &processes, &history, selected)
        }
        None => CasesPage {
            sidebar: Sidebar::for_session(&session, "cases"),
            ..Default::default()
        },
    };
    page.banner = state.connection_banner();

    state.views.cases(&page).into_response()
}

async fn serve_settings(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
) -> Response {
    let mut page = SettingsPage {
        banner: state.connection_banner(),
        sidebar: Sidebar::for_session(&session, "settings"),
        active_sessions: state.sessions.len(),
        ..Default::default()
    };

    if let Some(gateway) = state.gateway() {
        let names = gateway.names();
        page.source = gateway.backend_tag().to_string();
        page.clients_table = names.clients.clone();
        page.processes_table = names.processes.clone();
        page.history_table = names.history.clone();
        page.history_available = gateway.has_history();
    }

    state.views.settings(&page).into_response()
}
