#![cfg(feature = "web")]

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use handlebars::{Handlebars, TemplateError};
use log::error;
use serde::Serialize;

use crate::views::{CasesPage, LoginPage, SettingsPage};

/// Handlebars registry with every page template compiled in
pub struct Views {
    registry: Handlebars<'static>,
}

/// A template failed to render; shown to the visitor as a bare 500
#[derive(Debug)]
pub struct RenderFailure;

impl IntoResponse for RenderFailure {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, "Page could not be rendered").into_response()
    }
}

impl Views {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        registry.register_partial("head", include_str!("templates/partials/head.hbs"))?;
        registry.register_partial("banner", include_str!("templates/partials/banner.hbs"))?;
        registry.register_partial("sidebar", include_str!("templates/partials/sidebar.hbs"))?;

        registry.register_template_string("login", include_str!("templates/login.hbs"))?;
        registry.register_template_string("cases", include_str!("templates/cases.hbs"))?;
        registry.register_template_string("settings", include_str!("templates/settings.hbs"))?;

        Ok(Views { registry })
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<Html<String>, RenderFailure> {
        self.registry.render(name, data).map(Html).map_err(|e| {
            error!("rendering '{}' failed: {}", name, e);
            RenderFailure
        })
    }

    pub fn login(&self, page: &LoginPage) -> Result<Html<String>, RenderFailure> {
        self.render("login", page)
    }

    pub fn cases(&self, page: &CasesPage) -> Result<Html<String>, RenderFailure> {
        self.render("cases", page)
    }

    pub fn settings(&self, page: &SettingsPage) -> Result<Html<String>, RenderFailure> {
        self.render("settings", page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Case;
    use crate::views::{CaseOption, HistoryLine, Notice, Sidebar};

    fn body(html: Result<Html<String>, RenderFailure>) -> String {
        html.unwrap().0
    }

    #[test]
    fn templates_compile() {
        assert!(Views::new().is_ok());
    }

    #[test]
    fn login_page_escapes_echoed_email() {
        let views = Views::new().unwrap();
        let page = LoginPage {
            banner: None,
            error: Some("Invalid credentials.".into()),
            email: "<script>@x.com".into(),
        };
        let html = body(views.login(&page));
        assert!(html.contains("Invalid credentials."));
        assert!(html.contains("&lt;script&gt;@x.com"));
        assert!(!html.contains("<script>@x.com"));
    }

    #[test]
    fn banner_is_shown_when_connection_failed() {
        let views = Views::new().unwrap();
        let html = body(views.login(&LoginPage::new(Some("required table 'Clientes' not found".into()))));
        assert!(html.contains("class=\"banner\""));
    }

    #[test]
    fn settings_link_only_for_lawyers() {
        let views = Views::new().unwrap();
        let mut page = CasesPage {
            sidebar: Sidebar {
                user_name: "Ana".into(),
                role_label: "Cliente".into(),
                is_lawyer: false,
                active: "cases",
            },
            ..Default::default()
        };
        assert!(!body(views.cases(&page)).contains("href=\"/settings\""));

        page.sidebar.is_lawyer = true;
        assert!(body(views.cases(&page)).contains("href=\"/settings\""));
    }

    #[test]
    fn cases_page_renders_selection_and_history() {
        let views = Views::new().unwrap();
        let page = CasesPage {
            options: vec![CaseOption {
                number: "P001".into(),
                selected: true,
            }],
            selected: Some(Case {
                number: "P001".into(),
                client_id: "1".into(),
                case_type: "Cível".into(),
                status: "Ativo".into(),
                start_date: "01/02/2024".into(),
                description: "Ação de cobrança".into(),
                next_deadline: "20/05/2024".into(),
            }),
            history: vec![HistoryLine {
                date: "10/03/2024".into(),
                description: "Audiência marcada".into(),
            }],
            notice: None,
            history_notice: Some(Notice::warning("unused")),
            ..Default::default()
        };
        let html = body(views.cases(&page));
        assert!(html.contains("<option value=\"P001\" selected>P001</option>"));
        assert!(html.contains("Case: P001"));
        assert!(html.contains("20/05/2024"));
        assert!(html.contains("<strong>10/03/2024</strong> | Audiência marcada"));
        assert!(html.contains("notice-warning"));
    }
}
