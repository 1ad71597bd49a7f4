use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;

use super::{
    super::{
        error::Result,
        models::{Asset, AssetFilter, CalendarDay, ClosePositionResult},
        repositories::TradingRepository,
    },
    base::{AlpacaRestBase, ApiPath},
};

pub(crate) struct AlpacaTradingRepository {
    base: Arc<AlpacaRestBase>,
}

impl AlpacaTradingRepository {
    pub fn new(base: Arc<AlpacaRestBase>) -> Self {
        Self { base }
    }
}

#[async_trait]
impl TradingRepository for AlpacaTradingRepository {
    async fn tradable_assets(&self, filter: &AssetFilter) -> Result<Vec<Asset>> {
        self.base
            .make_request(Method::GET, ApiPath::Assets, filter.query_params())
            .await
    }

    async fn calendar(&self, start: Option<NaiveDate>, end: NaiveDate) -> Result<Vec<CalendarDay>> {
        let mut query_params = Vec::new();

        if let Some(start) = start {
            query_params.push(("start", start.to_string()));
        }
        query_params.push(("end", end.to_string()));

        self.base
            .make_request(Method::GET, ApiPath::Calendar, query_params)
            .await
    }

    async fn close_all_positions(&self, cancel_orders: bool) -> Result<Vec<ClosePositionResult>> {
        let query_params = [("cancel_orders", cancel_orders.to_string())];

        self.base
            .make_request(Method::DELETE, ApiPath::Positions, query_params)
            .await
    }
}
