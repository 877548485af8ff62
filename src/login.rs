use log::{debug, info, warn};
use serde::Deserialize;

use crate::gateway::{Gateway, TableRef};
use crate::records::Client;
use crate::session::Identity;
use crate::table::Table;

#[cfg(feature = "web")]
use crate::app::AppState;
#[cfg(feature = "web")]
use crate::session::Session;
#[cfg(feature = "web")]
use crate::views::LoginPage;
#[cfg(feature = "web")]
use axum::{
    Extension, Form,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
#[cfg(feature = "web")]
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
#[cfg(feature = "web")]
use std::sync::Arc;

/// Name of the cookie carrying the session id
#[cfg(feature = "web")]
pub const SESSION_COOKIE: &str = "session";

/// Login form data
///
/// Missing form fields read as empty strings, which never match a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    /// Email address typed by the user
    #[serde(default)]
    pub email: String,

    /// Password in plaintext (only compared, never logged)
    #[serde(default)]
    pub password: String,
}

/// Find the user matching an email and password in the Clients table.
///
/// Both inputs and the stored values are trimmed, then compared exactly (case
/// sensitive). The first matching row wins. Rows without a client id never match,
/// and a table missing a required column matches nobody.
///
/// # Arguments
/// * `clients` - The Clients table as loaded
/// * `email` - Submitted email address
/// * `password` - Submitted password in plaintext
///
/// # Returns
/// * `Option<Identity>` - The logged-in identity, or `None` on any mismatch
pub fn match_credentials(clients: &Table, email: &str, password: &str) -> Option<Identity> {
    let email = email.trim();
    let password = password.trim();

    let rows = match Client::from_table(clients) {
        Ok(rows) => rows,
        Err(e) => {
            warn!("cannot authenticate against malformed clients table: {}", e);
            return None;
        }
    };

    rows.into_iter()
        .filter(|client| !client.id.is_empty())
        .find(|client| client.email.trim() == email && client.password.trim() == password)
        .map(|client| Identity {
            user_id: client.id,
            name: client.name,
            role: client.role,
            role_label: client.role_label,
        })
}

/// Check credentials against the live Clients table.
///
/// Returns `None` for unknown users, wrong passwords and unreadable tables alike.
///
/// # Arguments
/// * `gateway` - Connected data gateway
/// * `email` - Submitted email address
/// * `password` - Submitted password
///
/// # Returns
/// * `Option<Identity>` - The identity to store in the new session
pub async fn authenticate(gateway: &Gateway, email: &str, password: &str) -> Option<Identity> {
    let clients = gateway.load_table(TableRef::Clients).await;
    if clients.is_empty() {
        debug!("clients table is empty, no user can log in");
        return None;
    }

    let identity = match_credentials(&clients, email, password);
    match &identity {
        Some(identity) => info!("user {} logged in", identity.user_id),
        None => info!("rejected login for '{}'", email.trim()),
    }
    identity
}

/// Serve the login page, or skip it when already logged in
#[cfg(feature = "web")]
pub async fn serve_login_page(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if state.session_from(&jar).is_logged_in() {
        return Redirect::to("/cases").into_response();
    }
    state
        .views
        .login(&LoginPage::new(state.connection_banner()))
        .into_response()
}

/// Handle login form submissions.
///
/// On success a session is created and its id stored in an HTTP-only cookie. Every
/// failure shows the same message so the form does not reveal which emails exist.
#[cfg(feature = "web")]
pub async fn handle_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(credentials): Form<Credentials>,
) -> Response {
    let mut page = LoginPage::new(state.connection_banner());
    page.email = credentials.email.trim().to_string();

    let Some(gateway) = state.gateway() else {
        page.error = Some("Connection error.".to_string());
        return (StatusCode::SERVICE_UNAVAILABLE, state.views.login(&page)).into_response();
    };

    let Some(identity) = authenticate(gateway, &credentials.email, &credentials.password).await
    else {
        page.error = Some("Invalid credentials.".to_string());
        return (StatusCode::UNAUTHORIZED, state.views.login(&page)).into_response();
    };

    let purged = state.sessions.purge_expired();
    if purged > 0 {
        debug!("purged {} expired sessions", purged);
    }
    let session_id = state.sessions.create(identity);
    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            state.sessions.ttl().as_secs().try_into().unwrap_or(i64::MAX),
        ));

    (jar.add(cookie), Redirect::to("/cases")).into_response()
}

/// Handle logout: forget the session and clear the cookie
#[cfg(feature = "web")]
pub async fn handle_logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.destroy(cookie.value()) {
            debug!("session ended");
        }
    }

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/");
    (jar.remove(removal), Redirect::to("/login"))
}

/// Authentication middleware
///
/// Resolves the session cookie into a [`Session`] and hands it to the handler as a
/// request extension. Logged-out visitors are sent to the login page.
#[cfg(feature = "web")]
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let session = state.session_from(&jar);
    if !session.is_logged_in() {
        return Redirect::to("/login").into_response();
    }

    request.extensions_mut().insert(session);
    next.run(request).await
}

/// Lawyer-only gate, layered after [`require_auth`]
#[cfg(feature = "web")]
pub async fn require_lawyer(
    Extension(session): Extension<Session>,
    request: Request,
    next: Next,
) -> Response {
    if !session.is_lawyer() {
        return (StatusCode::FORBIDDEN, "Restricted to lawyers").into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{MemorySource, TableNames};
    use crate::records::Role;
    use std::sync::Arc;

    fn clients(rows: &[&[&str]]) -> Table {
        Table::from_grid(
            "Clientes",
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    const HEADER: &[&str] = &["Email", "Senha", "IDCliente", "NomeCompleto", "Role"];

    #[test]
    fn matches_trimmed_credentials() {
        let table = clients(&[HEADER, &[" a@x.com ", "p1 ", "1", "Ana", "Cliente"]]);
        let identity = match_credentials(&table, "a@x.com  ", " p1").unwrap();
        assert_eq!(identity.user_id, "1");
        assert_eq!(identity.name, "Ana");
        assert_eq!(identity.role, Role::Client);
    }

    #[test]
    fn comparison_is_case_sensitive() {
        let table = clients(&[HEADER, &["a@x.com", "p1", "1", "Ana", "Cliente"]]);
        assert!(match_credentials(&table, "A@x.com", "p1").is_none());
        assert!(match_credentials(&table, "a@x.com", "P1").is_none());
    }

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let table = clients(&[HEADER, &["a@x.com", "p1", "1", "Ana", "Cliente"]]);
        assert_eq!(
            match_credentials(&table, "nobody@x.com", "p1"),
            match_credentials(&table, "a@x.com", "wrong")
        );
    }

    #[test]
    fn first_matching_row_wins() {
        let table = clients(&[
            HEADER,
            &["a@x.com", "p1", "1", "Ana", "Cliente"],
            &["a@x.com", "p1", "2", "Ana Duplicate", "Advogado"],
        ]);
        let identity = match_credentials(&table, "a@x.com", "p1").unwrap();
        assert_eq!(identity.user_id, "1");
        assert!(!identity.is_lawyer());
    }

    #[test]
    fn lawyer_role_is_recognised() {
        let table = clients(&[HEADER, &["b@x.com", "p2", "9", "Bruno", "Advogado"]]);
        let identity = match_credentials(&table, "b@x.com", "p2").unwrap();
        assert!(identity.is_lawyer());
        assert_eq!(identity.role_label, "Advogado");
    }

    #[test]
    fn missing_role_column_defaults_to_client() {
        let table = clients(&[
            &["Email", "Senha", "IDCliente", "NomeCompleto"],
            &["a@x.com", "p1", "1", "Ana"],
        ]);
        let identity = match_credentials(&table, "a@x.com", "p1").unwrap();
        assert_eq!(identity.role, Role::Client);
        assert_eq!(identity.role_label, "Cliente");
    }

    #[test]
    fn row_without_client_id_never_logs_in() {
        let table = clients(&[
            HEADER,
            &["x@x.com", "p", "", "Orphan", "Cliente"],
            &["y@x.com", "p", "   ", "Blank", "Advogado"],
        ]);
        assert!(match_credentials(&table, "x@x.com", "p").is_none());
        assert!(match_credentials(&table, "y@x.com", "p").is_none());
    }

    #[test]
    fn blank_id_row_does_not_shadow_a_later_valid_row() {
        let table = clients(&[
            HEADER,
            &["a@x.com", "p1", "", "Ana Draft", "Cliente"],
            &["a@x.com", "p1", "1", "Ana", "Cliente"],
        ]);
        let identity = match_credentials(&table, "a@x.com", "p1").unwrap();
        assert_eq!(identity.user_id, "1");
        assert_eq!(identity.name, "Ana");
    }

    #[test]
    fn malformed_table_matches_nobody() {
        let table = clients(&[&["Email", "Senha"], &["a@x.com", "p1"]]);
        assert!(match_credentials(&table, "a@x.com", "p1").is_none());
        assert!(match_credentials(&Table::empty("Clientes"), "a@x.com", "p1").is_none());
    }

    #[tokio::test]
    async fn authenticate_fails_quietly_when_source_drops() {
        let source = Arc::new(
            MemorySource::new()
                .with_sheet("Clientes", &[HEADER, &["a@x.com", "p1", "1", "Ana", ""]])
                .with_sheet("ProcessosJuridicos", &[&["IDCliente", "NumeroProcesso"]]),
        );
        let gateway = Gateway::connect(source.clone(), TableNames::default())
            .await
            .unwrap();

        assert!(authenticate(&gateway, "a@x.com", "p1").await.is_some());
        source.set_unreachable(true);
        assert!(authenticate(&gateway, "a@x.com", "p1").await.is_none());
    }
}
