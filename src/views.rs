//! Page models handed to the templates.
//!
//! Building a page never fails: every data problem becomes a [`Notice`] shown in
//! place of the missing content.

use serde::Serialize;

use crate::filter::{display_date, filter_cases, find_case, history};
use crate::records::{Case, HistoryEntry, columns};
use crate::session::Session;
use crate::table::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// A message box rendered instead of (or above) page content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Notice {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginPage {
    /// Connection problem detected at startup
    pub banner: Option<String>,
    pub error: Option<String>,
    /// Echoed back after a failed attempt; the password never is
    pub email: String,
}

impl LoginPage {
    pub fn new(banner: Option<String>) -> Self {
        LoginPage {
            banner,
            ..Default::default()
        }
    }
}

/// Menu column shown on every logged-in page
#[derive(Debug, Clone, Default, Serialize)]
pub struct Sidebar {
    pub user_name: String,
    pub role_label: String,
    pub is_lawyer: bool,
    pub active: &'static str,
}

impl Sidebar {
    pub fn for_session(session: &Session, active: &'static str) -> Self {
        match session.identity() {
            Some(identity) => Sidebar {
                user_name: identity.name.clone(),
                role_label: identity.role_label.clone(),
                is_lawyer: identity.is_lawyer(),
                active,
            },
            None => Sidebar {
                active,
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseOption {
    pub number: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryLine {
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CasesPage {
    pub banner: Option<String>,
    pub sidebar: Sidebar,
    /// Replaces the picker when there is nothing to pick from
    pub notice: Option<Notice>,
    pub options: Vec<CaseOption>,
    pub selected: Option<Case>,
    pub history: Vec<HistoryLine>,
    pub history_notice: Option<Notice>,
}

impl CasesPage {
    /// Assemble the case page from freshly loaded tables.
    ///
    /// `selected` is the case number picked by the user; it is only honoured when
    /// that case is visible to the session.
    pub fn build(
        session: &Session,
        processes: &Table,
        history_table: &Table,
        selected: Option<&str>,
    ) -> CasesPage {
        let mut page = CasesPage {
            sidebar: Sidebar::for_session(session, "cases"),
            ..Default::default()
        };

        if processes.is_empty() {
            page.notice = Some(Notice::info("No cases loaded."));
            return page;
        }

        let cases = match Case::from_table(processes) {
            Ok(cases) => cases,
            Err(e) => {
                page.notice = Some(Notice::error(format!("Configuration error: {}.", e)));
                return page;
            }
        };

        let visible = filter_cases(&cases, session);
        if visible.is_empty() {
            page.notice = Some(Notice::warning("No cases linked to your account."));
            return page;
        }

        let chosen = selected
            .filter(|number| !number.trim().is_empty())
            .and_then(|number| find_case(&visible, number));

        page.options = visible
            .iter()
            .map(|case| CaseOption {
                number: case.number.clone(),
                selected: chosen.is_some_and(|c| std::ptr::eq(c, *case)),
            })
            .collect();

        let Some(case) = chosen else {
            page.notice = Some(Notice::info("Select a case above."));
            return page;
        };
        page.selected = Some(case.clone());

        if history_table.is_empty() || !history_table.has_column(columns::CASE_NUMBER) {
            page.history_notice = Some(Notice::warning("History is empty."));
            return page;
        }

        let entries = HistoryEntry::from_table(history_table).unwrap_or_default();
        page.history = history(&entries, &case.number)
            .into_iter()
            .map(|entry| HistoryLine {
                date: display_date(&entry.updated),
                description: entry.description.clone(),
            })
            .collect();
        if page.history.is_empty() {
            page.history_notice = Some(Notice::warning("No updates recorded."));
        }

        page
    }
}

/// Read-only summary of the data source, for lawyers
#[derive(Debug, Clone, Default, Serialize)]
pub struct SettingsPage {
    pub banner: Option<String>,
    pub sidebar: Sidebar,
    pub source: String,
    pub clients_table: String,
    pub processes_table: String,
    pub history_table: String,
    pub history_available: bool,
    pub active_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::Role;
    use crate::session::Identity;

    fn table(name: &str, rows: &[&[&str]]) -> Table {
        Table::from_grid(
            name,
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn processes() -> Table {
        table(
            "ProcessosJuridicos",
            &[
                &["IDCliente", "NumeroProcesso", "TipoProcesso", "Status"],
                &["1", "P001", "Cível", "Ativo"],
                &["2", "P002", "Trabalhista", "Arquivado"],
            ],
        )
    }

    fn history_table() -> Table {
        table(
            "HistoricoProcessos",
            &[
                &["NumeroProcesso", "DataAtualizacao", "DescricaoHistorico"],
                &["P001", "01/02/2024", "Petição inicial"],
                &["P001", "10/03/2024", "Audiência marcada"],
                &["P002", "11/03/2024", "Outro"],
            ],
        )
    }

    fn client(id: &str) -> Session {
        Session::LoggedIn(Identity {
            user_id: id.into(),
            name: "Ana".into(),
            role: Role::Client,
            role_label: "Cliente".into(),
        })
    }

    #[test]
    fn empty_processes_is_informational() {
        let page = CasesPage::build(
            &client("1"),
            &Table::empty("ProcessosJuridicos"),
            &history_table(),
            None,
        );
        assert_eq!(page.notice, Some(Notice::info("No cases loaded.")));
    }

    #[test]
    fn missing_client_id_column_names_the_column() {
        let t = table("ProcessosJuridicos", &[&["NumeroProcesso"], &["P001"]]);
        let page = CasesPage::build(&client("1"), &t, &history_table(), None);
        let notice = page.notice.unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert!(notice.text.contains("'IDCliente'"));
    }

    #[test]
    fn client_without_cases_gets_warning() {
        let page = CasesPage::build(&client("5"), &processes(), &history_table(), None);
        assert_eq!(
            page.notice,
            Some(Notice::warning("No cases linked to your account."))
        );
        assert!(page.options.is_empty());
    }

    #[test]
    fn picker_lists_visible_cases_until_one_is_chosen() {
        let page = CasesPage::build(&client("1"), &processes(), &history_table(), None);
        assert_eq!(
            page.options,
            vec![CaseOption {
                number: "P001".into(),
                selected: false
            }]
        );
        assert_eq!(page.notice, Some(Notice::info("Select a case above.")));
        assert!(page.selected.is_none());
    }

    #[test]
    fn selected_case_shows_details_and_sorted_history() {
        let page = CasesPage::build(&client("1"), &processes(), &history_table(), Some("P001"));
        let case = page.selected.unwrap();
        assert_eq!(case.case_type, "Cível");
        assert_eq!(case.start_date, "-");
        assert!(page.options[0].selected);
        assert_eq!(
            page.history,
            vec![
                HistoryLine {
                    date: "10/03/2024".into(),
                    description: "Audiência marcada".into()
                },
                HistoryLine {
                    date: "01/02/2024".into(),
                    description: "Petição inicial".into()
                },
            ]
        );
        assert!(page.history_notice.is_none());
    }

    #[test]
    fn another_clients_case_cannot_be_selected() {
        let page = CasesPage::build(&client("1"), &processes(), &history_table(), Some("P002"));
        assert!(page.selected.is_none());
        assert!(page.history.is_empty());
    }

    #[test]
    fn absent_history_table_is_a_warning_not_an_error() {
        let page = CasesPage::build(
            &client("1"),
            &processes(),
            &Table::empty("HistoricoProcessos"),
            Some("P001"),
        );
        assert!(page.selected.is_some());
        assert_eq!(page.history_notice, Some(Notice::warning("History is empty.")));
    }

    #[test]
    fn case_without_updates() {
        let t = table(
            "HistoricoProcessos",
            &[&["NumeroProcesso", "DataAtualizacao"], &["P009", "01/01/2024"]],
        );
        let page = CasesPage::build(&client("1"), &processes(), &t, Some("P001"));
        assert_eq!(page.history_notice, Some(Notice::warning("No updates recorded.")));
    }

    #[test]
    fn sidebar_reflects_role() {
        let lawyer = Session::LoggedIn(Identity {
            user_id: "9".into(),
            name: "Bruno".into(),
            role: Role::Lawyer,
            role_label: "Advogado".into(),
        });
        let sidebar = Sidebar::for_session(&lawyer, "cases");
        assert!(sidebar.is_lawyer);
        assert_eq!(sidebar.role_label, "Advogado");
        assert!(!Sidebar::for_session(&client("1"), "cases").is_lawyer);
    }
}
