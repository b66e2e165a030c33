//! PostgreSQL implementation of the source store.

mod queries;
mod source;

pub use source::PostgresSource;
