//! The executor's view of the ledger.

use async_trait::async_trait;
use deferral_core::{Request, RequestId, Result};
use deferral_sdk::DeferralClient;

/// Ledger operations the executor relies on.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    /// Current record of a request, `None` if it is not live.
    async fn fetch(&self, id: RequestId) -> Result<Option<Request>>;

    /// All requests still awaiting execution.
    async fn pending(&self) -> Result<Vec<Request>>;

    /// Execute as the trigger authority. Returns the directed call's outcome.
    async fn execute(&self, id: RequestId, observed_cost: u64) -> Result<bool>;
}

#[async_trait]
impl LedgerGateway for DeferralClient {
    async fn fetch(&self, id: RequestId) -> Result<Option<Request>> {
        self.request(id).await
    }

    async fn pending(&self) -> Result<Vec<Request>> {
        let requests = self.requests().await?;
        Ok(requests.into_iter().filter(Request::is_pending).collect())
    }

    async fn execute(&self, id: RequestId, observed_cost: u64) -> Result<bool> {
        DeferralClient::execute(self, id, observed_cost).await
    }
}
