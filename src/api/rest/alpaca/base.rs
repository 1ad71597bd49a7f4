use std::{sync::Arc, time::Duration};

use reqwest::{
    Client, Method, Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::de::DeserializeOwned;

use super::super::{
    super::config::Credentials,
    error::{RestApiError, Result},
};

pub(crate) const PAPER_TRADING_DOMAIN: &str = "paper-api.alpaca.markets";
pub(crate) const LIVE_TRADING_DOMAIN: &str = "api.alpaca.markets";
pub(crate) const MARKET_DATA_DOMAIN: &str = "data.alpaca.markets";

#[derive(Clone, Copy, Debug)]
pub(crate) enum ApiPath {
    Assets,
    Calendar,
    Positions,
    StockBars,
}

impl From<ApiPath> for &'static str {
    fn from(value: ApiPath) -> Self {
        match value {
            ApiPath::Assets => "/v2/assets",
            ApiPath::Calendar => "/v2/calendar",
            ApiPath::Positions => "/v2/positions",
            ApiPath::StockBars => "/v2/stocks/bars",
        }
    }
}

pub(crate) struct AlpacaRestBase {
    domain: &'static str,
    headers: HeaderMap,
    client: Client,
}

impl AlpacaRestBase {
    pub fn new(
        timeout: Duration,
        domain: &'static str,
        credentials: &Credentials,
    ) -> Result<Arc<Self>> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RestApiError::HttpClient)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("apca-api-key-id"),
            HeaderValue::from_str(credentials.key())?,
        );

        let mut secret = HeaderValue::from_str(credentials.secret())?;
        secret.set_sensitive(true);
        headers.insert(HeaderName::from_static("apca-api-secret-key"), secret);

        Ok(Arc::new(Self {
            domain,
            headers,
            client,
        }))
    }

    fn get_url<I, K, V>(&self, path: ApiPath, query_params: I) -> Result<Url>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let path: &'static str = path.into();
        let url_str = format!("https://{}{}", self.domain, path);

        Url::parse_with_params(&url_str, query_params)
            .map_err(|e| RestApiError::UrlParse(e.to_string()))
    }

    pub async fn make_request<I, K, V, T>(
        &self,
        method: Method,
        path: ApiPath,
        query_params: I,
    ) -> Result<T>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
        T: DeserializeOwned,
    {
        let url = self.get_url(path, query_params)?;

        let response = self
            .client
            .request(method, url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(RestApiError::SendFailed)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(RestApiError::ResponseDecoding)?;

            return Err(RestApiError::ErrorResponse { status, text });
        }

        let raw_response = response
            .text()
            .await
            .map_err(RestApiError::ResponseDecoding)?;

        let response_data = serde_json::from_str::<T>(&raw_response)
            .map_err(|e| RestApiError::ResponseJsonDeserializeFailed { raw_response, e })?;

        Ok(response_data)
    }
}
