pub mod logger;
pub mod patch_pipeline;
