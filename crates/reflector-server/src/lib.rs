//! Cartridge Reflector HTTP service
//!
//! Serves the manifest transformation engine over a small HTTP/1.1
//! listener built on `std::net`.

pub mod http;
pub mod routes;
pub mod server;

pub use http::{HttpError, HttpRequest, HttpResponse};
pub use routes::{Router, REFLECT_HEADER};
pub use server::{handle_connection, Server, ServerConfig};
