//! The transaction API scenario: create, get, update, list.
//!
//! Call order and checks follow the manual test flow against the transaction
//! service: a created transaction is fetched and completed, then the paged
//! listing is read. Get and update depend on the id returned by create, so
//! they are skipped when create fails; the listing always runs.

use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{IterationContext, Scenario};
use crate::metrics::collector::{HTTP_REQ_DURATION, HTTP_REQ_FAILED};

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRequest {
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub amount: f64,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct TransactionPage {
    pub content: Vec<Transaction>,
}

struct CallResult {
    status: StatusCode,
    body: Vec<u8>,
}

pub struct TransactionScenario {
    client: reqwest::Client,
    base_url: String,
    run_id: Uuid,
}

impl TransactionScenario {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            run_id: Uuid::new_v4(),
        }
    }

    fn sample_transaction(&self) -> TransactionRequest {
        TransactionRequest {
            amount: 100.0,
            currency: "USD".to_string(),
            kind: "PAYMENT".to_string(),
            status: "PENDING".to_string(),
            description: format!("Test transaction (run {})", self.run_id),
        }
    }

    /// Issue one request, recording its duration and failure outcome. Returns
    /// `None` on transport errors and timeouts; those are already recorded.
    async fn send(
        &self,
        ctx: &IterationContext,
        request: reqwest::RequestBuilder,
    ) -> Option<CallResult> {
        let started = Instant::now();
        let outcome = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body.to_vec()))
        }
        .await;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        ctx.collector.add_trend(HTTP_REQ_DURATION, elapsed_ms);

        match outcome {
            Ok((status, body)) => {
                let failed = !(status.is_success() || status.is_redirection());
                ctx.collector.add_rate(HTTP_REQ_FAILED, failed);
                Some(CallResult { status, body })
            }
            Err(err) => {
                ctx.collector.add_rate(HTTP_REQ_FAILED, true);
                if err.is_timeout() {
                    tracing::debug!("VU {} request timed out: {}", ctx.vu, err);
                } else {
                    tracing::debug!("VU {} request error: {}", ctx.vu, err);
                }
                None
            }
        }
    }

    /// POST a new transaction. Returns its id when the service accepted it.
    async fn create_transaction(&self, ctx: &IterationContext) -> Option<i64> {
        let request = self
            .client
            .post(format!("{}/transactions", self.base_url))
            .json(&self.sample_transaction());

        let result = self.send(ctx, request).await;
        let status_created = result
            .as_ref()
            .is_some_and(|r| r.status == StatusCode::CREATED);
        let id = result
            .as_ref()
            .and_then(|r| serde_json::from_slice::<Transaction>(&r.body).ok())
            .map(|t| t.id);

        ctx.collector
            .add_check("create transaction status is 201", status_created);
        ctx.collector
            .add_check("create response has transaction id", id.is_some());

        if status_created {
            id
        } else {
            None
        }
    }

    async fn get_transaction(&self, ctx: &IterationContext, id: i64) {
        let request = self
            .client
            .get(format!("{}/transactions/{}", self.base_url, id));

        let result = self.send(ctx, request).await;
        let status_ok = result.as_ref().is_some_and(|r| r.status == StatusCode::OK);
        let id_matches = result
            .as_ref()
            .and_then(|r| serde_json::from_slice::<Transaction>(&r.body).ok())
            .is_some_and(|t| t.id == id);

        ctx.collector
            .add_check("get transaction status is 200", status_ok);
        ctx.collector
            .add_check("get response matches created transaction", id_matches);
    }

    async fn update_transaction(&self, ctx: &IterationContext, id: i64) {
        let update = TransactionRequest {
            status: "COMPLETED".to_string(),
            description: format!("Updated test transaction (run {})", self.run_id),
            ..self.sample_transaction()
        };
        let request = self
            .client
            .put(format!("{}/transactions/{}", self.base_url, id))
            .json(&update);

        let result = self.send(ctx, request).await;
        let status_ok = result.as_ref().is_some_and(|r| r.status == StatusCode::OK);

        ctx.collector
            .add_check("update transaction status is 200", status_ok);
    }

    async fn list_transactions(&self, ctx: &IterationContext) {
        let request = self
            .client
            .get(format!("{}/transactions", self.base_url))
            .query(&[("page", "0"), ("size", "10")]);

        let result = self.send(ctx, request).await;
        let status_ok = result.as_ref().is_some_and(|r| r.status == StatusCode::OK);
        let has_content = result
            .as_ref()
            .is_some_and(|r| serde_json::from_slice::<TransactionPage>(&r.body).is_ok());

        ctx.collector
            .add_check("list transactions status is 200", status_ok);
        ctx.collector
            .add_check("list response has content", has_content);
    }
}

impl Scenario for TransactionScenario {
    fn execute(
        &self,
        ctx: IterationContext,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let created_id = self.create_transaction(&ctx).await;

            // Get and update need the created id
            if let Some(id) = created_id {
                self.get_transaction(&ctx, id).await;
                self.update_transaction(&ctx, id).await;
            }

            self.list_transactions(&ctx).await;
        })
    }
}
