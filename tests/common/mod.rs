#![allow(dead_code)]

pub mod http_stub;
pub mod test_helpers;

pub use http_stub::StubServer;
pub use test_helpers::*;
