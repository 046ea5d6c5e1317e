//! `archestra_token_prices`: per-model token prices.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::models::TokenPrice;
use crate::client::ApiResult;
use crate::context::OpContext;
use crate::resource::{ClientSlot, DataSource, ProviderData};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Diagnostic, Schema};
use crate::value::AttrValue;

/// Prices stay decimal strings; converting to floats would lose precision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenPriceModel {
    pub id: String,
    pub model: String,
    pub price_per_million_input: String,
    pub price_per_million_output: String,
}

impl From<TokenPrice> for TokenPriceModel {
    fn from(price: TokenPrice) -> Self {
        Self {
            id: price.id.to_string(),
            model: price.model,
            price_per_million_input: price.price_per_million_input,
            price_per_million_output: price.price_per_million_output,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenPricesModel {
    pub token_prices: AttrValue<Vec<TokenPriceModel>>,
}

#[derive(Debug, Clone, Default)]
pub struct TokenPricesDataSource {
    client: ClientSlot,
}

#[async_trait]
impl DataSource for TokenPricesDataSource {
    type Model = TokenPricesModel;

    fn metadata(&self, provider_type_name: &str) -> String {
        format!("{}_token_prices", provider_type_name)
    }

    fn schema(&self) -> Schema {
        let price = AttributeType::object([
            ("id", AttributeType::String),
            ("model", AttributeType::String),
            ("price_per_million_input", AttributeType::String),
            ("price_per_million_output", AttributeType::String),
        ]);
        Schema::v0()
            .with_description("Lists the token prices used for cost limits.")
            .with_attribute(
                "token_prices",
                Attribute::new(AttributeType::list(price), AttributeFlags::computed()),
            )
    }

    fn configure(&mut self, data: Option<&ProviderData>) -> Vec<Diagnostic> {
        self.client.configure_data_source(data)
    }

    async fn read(&self, ctx: &OpContext, mut config: TokenPricesModel) -> Result<TokenPricesModel, Diagnostic> {
        let client = self.client.get()?;
        let prices = client.list_token_prices(ctx).await.expect_ok("list token prices")?;
        config.token_prices = AttrValue::Known(prices.into_iter().map(TokenPriceModel::from).collect());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{configured_tester, MockTransport};
    use reqwest::Method;
    use serde_json::json;

    #[tokio::test]
    async fn test_prices_keep_decimal_strings() {
        let mock = MockTransport::new();
        mock.respond(
            Method::GET,
            "/api/token-prices",
            200,
            json!([{
                "id": "f1000000-0000-0000-0000-000000000001",
                "model": "gpt-4o",
                "pricePerMillionInput": "2.50",
                "pricePerMillionOutput": "10.00",
            }]),
        );
        let tester = configured_tester(&mock).await;

        let state = tester.read_data_source("archestra_token_prices", json!({})).await.unwrap();
        assert_eq!(state["token_prices"][0]["model"], "gpt-4o");
        assert_eq!(state["token_prices"][0]["price_per_million_input"], "2.50");
        assert_eq!(state["token_prices"][0]["price_per_million_output"], "10.00");
    }
}
