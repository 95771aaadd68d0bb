mod output;
pub use output::TaskOutput;

mod request;
pub use request::TaskRequest;

use async_trait::async_trait;
use jobrun_model::Config;

use crate::context::TaskContext;

/// One request-triggered job type.
///
/// Implementations are stateless with respect to requests: everything a single
/// invocation needs arrives through `req` and the configuration snapshot, and
/// every produced metric lives in the returned [`TaskOutput`].
///
/// Client-input problems short-circuit with an empty body and a 4xx status.
/// Once execution has started the output carries whatever metrics were
/// produced, together with the failure, so diagnostics reach the caller.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, ctx: &TaskContext, req: &TaskRequest, cfg: &Config) -> TaskOutput;
}
