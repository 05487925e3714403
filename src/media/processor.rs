use crate::AudioFrame;
use anyhow::Result;

/// A stage of the per-track media pipeline, invoked once for every frame in
/// arrival order.
pub trait Processor: Send + Sync {
    fn process_frame(&self, frame: &mut AudioFrame) -> Result<()>;
}
