use std::{num::NonZeroUsize, sync::Arc};

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::Method;

use super::{
    super::{
        error::Result,
        models::{BarsPage, BarsRequest, RawBar},
        repositories::MarketDataRepository,
    },
    base::{AlpacaRestBase, ApiPath},
};

const PAGE_LIMIT: usize = 10_000;

pub(crate) struct AlpacaMarketDataRepository {
    base: Arc<AlpacaRestBase>,
    symbols_per_request: NonZeroUsize,
}

impl AlpacaMarketDataRepository {
    pub fn new(base: Arc<AlpacaRestBase>, symbols_per_request: NonZeroUsize) -> Self {
        Self {
            base,
            symbols_per_request,
        }
    }

    async fn bars_chunk(&self, request: &BarsRequest, symbols: &[String]) -> Result<Vec<RawBar>> {
        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query_params = vec![
                ("symbols", symbols.join(",")),
                ("timeframe", "1Day".to_string()),
                (
                    "start",
                    request.start().to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                (
                    "end",
                    request.end().to_rfc3339_opts(SecondsFormat::Secs, true),
                ),
                ("feed", request.feed().to_string()),
                ("adjustment", request.adjustment().to_string()),
                ("limit", PAGE_LIMIT.to_string()),
            ];

            if let Some(token) = page_token.take() {
                query_params.push(("page_token", token));
            }

            let page: BarsPage = self
                .base
                .make_request(Method::GET, ApiPath::StockBars, query_params)
                .await?;

            let next = page.next_page_token().map(str::to_string);
            bars.extend(page.into_raw_bars());

            match next {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(bars)
    }
}

#[async_trait]
impl MarketDataRepository for AlpacaMarketDataRepository {
    async fn bars(&self, request: &BarsRequest) -> Result<Vec<RawBar>> {
        let mut bars = Vec::new();

        for symbols in request.symbols().chunks(self.symbols_per_request.get()) {
            let chunk_bars = self.bars_chunk(request, symbols).await?;

            tracing::debug!(
                symbols = symbols.len(),
                bars = chunk_bars.len(),
                "fetched bars chunk"
            );

            bars.extend(chunk_bars);
        }

        Ok(bars)
    }
}
