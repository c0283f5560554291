//! Amboss Magma API integration.
//!
//! Fetches liquidity-sale offers over the Amboss GraphQL endpoint.
//! API: https://api.amboss.space/graphql
//! Auth: API key via the `x-api-key` header.
//!
//! The marketplace lists offers in two stages: a cheap listing query
//! returning ids and statuses, then one detail query per enabled offer.
//! Detail fetches run concurrently and a failed offer is dropped with a
//! warning instead of failing the whole snapshot.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::OfferSource;
use crate::types::{Offer, OfferCondition};

const GRAPHQL_URL: &str = "https://api.amboss.space/graphql";

/// Concurrent detail fetches per snapshot.
const DEFAULT_CONCURRENCY: usize = 8;

const OFFER_LIST_QUERY: &str = "{ getOffers { list { id status } } }";

const OFFER_DETAIL_QUERY: &str = "\
query Offer($id: String!) {
  getOffer(id: $id) {
    id
    account
    base_fee
    fee_rate
    amboss_fee_rate
    min_size
    max_size
    allow_parallel
    conditions { condition operator value }
  }
}";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct GraphqlRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct GraphqlResponse<T> {
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct OfferListData {
    #[serde(rename = "getOffers")]
    get_offers: OfferList,
}

#[derive(Debug, Deserialize)]
struct OfferList {
    #[serde(default)]
    list: Vec<OfferSummary>,
}

#[derive(Debug, Deserialize)]
struct OfferSummary {
    id: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct OfferDetailData {
    #[serde(rename = "getOffer")]
    get_offer: Option<OfferDetail>,
}

/// Raw offer detail as Amboss serializes it. Numeric fields arrive as
/// JSON numbers or as digit strings depending on the API version, so
/// they go through a tolerant deserializer.
#[derive(Debug, Deserialize)]
struct OfferDetail {
    id: String,
    #[serde(default)]
    account: String,
    #[serde(default, deserialize_with = "u64_or_string")]
    base_fee: u64,
    #[serde(default, deserialize_with = "u64_or_string")]
    fee_rate: u64,
    #[serde(default, deserialize_with = "u64_or_string")]
    amboss_fee_rate: u64,
    #[serde(default, deserialize_with = "u64_or_string")]
    min_size: u64,
    #[serde(default, deserialize_with = "u64_or_string")]
    max_size: u64,
    #[serde(default)]
    allow_parallel: bool,
    #[serde(default)]
    conditions: Vec<ConditionDetail>,
}

#[derive(Debug, Deserialize)]
struct ConditionDetail {
    #[serde(default)]
    condition: String,
    #[serde(default)]
    operator: String,
    #[serde(default)]
    value: String,
}

impl OfferDetail {
    fn into_offer(self) -> Offer {
        Offer {
            id: self.id,
            account: self.account,
            base_fee: self.base_fee,
            fee_rate: self.fee_rate,
            amboss_fee_rate: self.amboss_fee_rate,
            min_size: self.min_size,
            max_size: self.max_size,
            allow_parallel: self.allow_parallel,
            conditions: self
                .conditions
                .into_iter()
                .map(|c| OfferCondition {
                    condition: c.condition,
                    operator: c.operator,
                    value: c.value,
                })
                .collect(),
        }
    }
}

fn u64_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}

fn enabled_ids(list: OfferList) -> Vec<String> {
    list.list
        .into_iter()
        .filter(|o| o.status == "ENABLED")
        .map(|o| o.id)
        .collect()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct AmbossClient {
    http: Client,
    api_key: String,
    concurrency: usize,
}

impl AmbossClient {
    pub fn new(api_key: String, concurrency: Option<usize>) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("lnhelper/0.1.0")
            .build()
            .context("Failed to build HTTP client for Amboss")?;

        Ok(Self {
            http,
            api_key,
            concurrency: concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1),
        })
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        query: &'static str,
        variables: Option<serde_json::Value>,
    ) -> Result<T> {
        let resp = self
            .http
            .post(GRAPHQL_URL)
            .header("x-api-key", &self.api_key)
            .json(&GraphqlRequest { query, variables })
            .send()
            .await
            .context("Amboss API request failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Amboss API error {status}: {body}");
        }

        let envelope: GraphqlResponse<T> = resp
            .json()
            .await
            .context("Failed to parse Amboss response")?;

        if let Some(errors) = envelope.errors {
            if let Some(first) = errors.first() {
                anyhow::bail!("Amboss GraphQL error: {}", first.message);
            }
        }

        envelope
            .data
            .ok_or_else(|| anyhow::anyhow!("Amboss response carried no data"))
    }

    async fn enabled_offer_ids(&self) -> Result<Vec<String>> {
        let data: OfferListData = self.graphql(OFFER_LIST_QUERY, None).await?;
        let ids = enabled_ids(data.get_offers);
        debug!(count = ids.len(), "Enabled Magma offers listed");
        Ok(ids)
    }

    async fn offer_detail(&self, id: &str) -> Result<Offer> {
        let variables = serde_json::json!({ "id": id });
        let data: OfferDetailData = self.graphql(OFFER_DETAIL_QUERY, Some(variables)).await?;
        let detail = data
            .get_offer
            .ok_or_else(|| anyhow::anyhow!("Offer {id} not found"))?;
        Ok(detail.into_offer())
    }
}

#[async_trait]
impl OfferSource for AmbossClient {
    async fn fetch_offers(&self) -> Result<Vec<Offer>> {
        info!("Scanning Magma for enabled offers");
        let ids = self.enabled_offer_ids().await?;

        // Concurrent, order-preserving detail fetches.
        let fetched: Vec<(String, Result<Offer>)> = stream::iter(ids.into_iter().map(|id| async move {
            let result = self.offer_detail(&id).await;
            (id, result)
        }))
        .buffered(self.concurrency)
        .collect()
        .await;

        let mut offers = Vec::with_capacity(fetched.len());
        for (id, result) in fetched {
            match result {
                Ok(offer) => offers.push(offer),
                Err(e) => {
                    warn!(offer_id = %id, error = %e, "Offer detail fetch failed, dropping offer")
                }
            }
        }

        info!(count = offers.len(), "Magma offer scan complete");
        Ok(offers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offer_list() {
        let json = r#"{
            "data": {
                "getOffers": {
                    "list": [
                        {"id": "o1", "status": "ENABLED"},
                        {"id": "o2", "status": "DISABLED"},
                        {"id": "o3", "status": "ENABLED"}
                    ]
                }
            }
        }"#;
        let envelope: GraphqlResponse<OfferListData> = serde_json::from_str(json).unwrap();
        let ids = enabled_ids(envelope.data.unwrap().get_offers);
        assert_eq!(ids, vec!["o1", "o3"]);
    }

    #[test]
    fn test_parse_detail_with_string_numbers() {
        let json = r#"{
            "data": {
                "getOffer": {
                    "id": "o1",
                    "account": "acct-9",
                    "base_fee": "1000",
                    "fee_rate": "1600",
                    "amboss_fee_rate": "500",
                    "min_size": "1000000",
                    "max_size": "5000000",
                    "allow_parallel": true,
                    "conditions": [
                        {"condition": "NODE_SOCKETS", "operator": "NOT_EQUAL_TO", "value": "TOR"}
                    ]
                }
            }
        }"#;
        let envelope: GraphqlResponse<OfferDetailData> = serde_json::from_str(json).unwrap();
        let offer = envelope.data.unwrap().get_offer.unwrap().into_offer();
        assert_eq!(offer.base_fee, 1000);
        assert_eq!(offer.min_size, 1_000_000);
        assert_eq!(offer.max_size, 5_000_000);
        assert!(offer.allow_parallel);
        assert_eq!(offer.conditions.len(), 1);
        assert_eq!(offer.conditions[0].value, "TOR");
    }

    #[test]
    fn test_parse_detail_with_native_numbers() {
        let json = r#"{
            "data": {
                "getOffer": {
                    "id": "o2",
                    "account": "acct-1",
                    "base_fee": 0,
                    "fee_rate": 2500,
                    "amboss_fee_rate": 500,
                    "min_size": 2000000,
                    "max_size": 2000000
                }
            }
        }"#;
        let envelope: GraphqlResponse<OfferDetailData> = serde_json::from_str(json).unwrap();
        let offer = envelope.data.unwrap().get_offer.unwrap().into_offer();
        assert_eq!(offer.fee_rate, 2500);
        // allow_parallel and conditions default when absent.
        assert!(!offer.allow_parallel);
        assert!(offer.conditions.is_empty());
    }

    #[test]
    fn test_parse_graphql_errors() {
        let json = r#"{"errors": [{"message": "unauthorized"}]}"#;
        let envelope: GraphqlResponse<OfferListData> = serde_json::from_str(json).unwrap();
        assert!(envelope.data.is_none());
        assert_eq!(envelope.errors.unwrap()[0].message, "unauthorized");
    }

    #[test]
    fn test_detail_query_uses_variables() {
        assert!(OFFER_DETAIL_QUERY.contains("$id"));
        assert!(OFFER_DETAIL_QUERY.contains("allow_parallel"));
    }
}
