pub use self::engine_service::EngineService;
pub use self::request_service::{RequestService, RequestServiceBuilder};

mod engine_service;
mod request_service;
