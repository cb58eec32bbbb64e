pub mod endpoint;
pub mod queue;
pub mod storage;
