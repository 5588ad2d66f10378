//! 停车场代理编排
//!
//! 每个入站请求：会话引导 → 标记发现 → 停车场 API 请求 → 响应整形

mod orchestrator;

pub use orchestrator::ParkingProxy;
