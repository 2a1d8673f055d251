//! Books Module
//!
//! HTTP surface over the `books` collection held by [`crate::db::Database`].
//!
//! | Route | Verb | Result |
//! |---|---|---|
//! | `/books` | GET | every record, insertion order |
//! | `/books` | POST | `201` with the stored record and its generated id |
//! | `/books/:id` | GET | the record or `404` |
//! | `/books/:id` | PUT | shallow merge, `200` with the merged record or `404` |
//! | `/books/:id` | DELETE | `200` with an empty body or `404` |
//!
//! # Usage
//!
//! ```rust,ignore
//! use libris::books;
//!
//! let app = Router::new()
//!     .merge(books::routes())
//!     .with_state(app_state);
//! ```

mod handler;
mod routes;

pub use routes::routes;
