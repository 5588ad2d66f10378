//! parkcast：带浏览器式会话引导的停车场 API 代理

pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod proxy;
pub mod server;
pub mod session;
pub mod token;
pub mod upstream;

pub use config::Config;
pub use error::ProxyError;
pub use proxy::ParkingProxy;
