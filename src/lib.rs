/*!
# Case Portal

A small web portal where a law firm's clients follow their legal cases, backed by a
shared spreadsheet.

## Overview

Everything the portal shows lives in three sheets of one spreadsheet document: the
registered users, the cases, and the dated history of each case. The portal never
writes to the document. Every page view reads the tables it needs afresh, so edits
made in the spreadsheet show up on the next page load.

## Architecture

### Data Layer
- **gateway**: [`Gateway`](gateway::Gateway) over a [`TableSource`](gateway::TableSource).
  The connection is checked once at startup; later read failures degrade to empty tables.
- **sheets**: Google Sheets API backend, authenticated with a service-account key
- **loader**: CSV directory backend for local use
- **table** / **records**: header-addressed rows and the typed records read from them

### Domain Layer
- **login**: credential matching against the clients table
- **session**: per-visitor login state and the server-side session store
- **filter**: which cases a session may see, and history ordering

### Presentation Layer
- **views**: page models; every data problem becomes a notice
- **render**: Handlebars templates compiled into the binary
- **app**: routing, middleware and startup

## Routes

- `/login` - Login form and submission
- `/logout` - Ends the session
- `/cases` - Case picker, case details and history (`?case=<number>`)
- `/settings` - Data source summary, lawyers only
*/

pub mod error;
pub mod filter;
pub mod gateway;
pub mod loader;
pub mod login;
pub mod records;
pub mod session;
pub mod settings;
pub mod sheets;
pub mod table;
pub mod views;

#[cfg(feature = "web")]
pub mod app;
#[cfg(feature = "web")]
pub mod render;

pub use error::{ConnectionError, GatewayError, SchemaError};
pub use gateway::{Gateway, TableNames, TableRef, TableSource};
pub use records::{Case, Client, HistoryEntry, Role};
pub use session::{Identity, Session, SessionStore};
pub use table::Table;
