pub mod frame_processor;
pub mod infrastructure;
pub mod pipeline_config;
pub mod pipeline_coordinator;
pub mod pipeline_logger;
