/// A unit of dispatch work: one backend exchange plus publishing its outcome.
pub type DispatchJob = Box<dyn FnOnce() + Send + 'static>;

/// Decides where dispatch jobs run relative to the sampler.
///
/// This is a port; infrastructure provides the threaded implementation,
/// [`InlineDispatchExecutor`] covers the single-threaded case.
pub trait DispatchExecutor: Send + Sync {
    fn submit(&self, job: DispatchJob);
}

/// Runs each job to completion on the submitting thread.
///
/// The sampler blocks for the whole exchange, so ticks that fire meanwhile
/// are lost rather than dropped by the busy flag.
pub struct InlineDispatchExecutor;

impl DispatchExecutor for InlineDispatchExecutor {
    fn submit(&self, job: DispatchJob) {
        job();
    }
}
