pub mod dtmf;
pub mod dtmf_processor;
pub mod processor;
