pub mod config;
pub mod error;
pub mod mail;
pub mod model;
pub mod promo;
pub mod store;
pub mod timeline;
pub mod watcher;

#[cfg(test)]
mod test_http;
