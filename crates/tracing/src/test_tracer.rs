use crate::{Tracer, TracerHandle};
use tracing_subscriber::EnvFilter;

///  Initializes a tracing subscriber for tests.
///
///  The filter is configurable via `RUST_LOG`, output goes through the test writer so it is
///  captured per test.
///
///  # Note
///
///  The subscriber will silently fail if it could not be installed.
#[derive(Debug, Clone, Default)]
#[non_exhaustive]
pub struct TestTracer;

impl Tracer for TestTracer {
    fn init(self) -> eyre::Result<TracerHandle> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        Ok(TracerHandle::default())
    }
}
