use crate::api::Remote;
use crate::error::{Error, ErrorType, Result};
use crate::model::codec::format_query_date;
use crate::model::{Account, Category, CreatedTransaction, Transaction, TransactionRequest};
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, trace};
use url::Url;

/// Talks to the backend over HTTPS with a bearer token.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        // Url::join drops the last path segment unless the base ends with a slash.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|e| {
            Error::new(
                ErrorType::Config,
                anyhow::Error::new(e).context(format!("Invalid base URL '{base_url}'")),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::new(ErrorType::Config, e))?;
        Ok(Self {
            client,
            base,
            token,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base.join(path).map_err(|e| {
            Error::new(
                ErrorType::Config,
                anyhow::Error::new(e).context(format!("Unable to build URL for '{path}'")),
            )
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.url(path)?;
        trace!("{method} {url}");
        let builder = self.client.request(method, url);
        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
        let response = builder.send().await.map_err(|e| {
            Error::new(
                ErrorType::Network,
                anyhow::Error::new(e).context(format!("Request to {what} failed")),
            )
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!("{what} answered {status}: {body}");
        let kind = if status == StatusCode::NOT_FOUND {
            ErrorType::NotFound
        } else {
            ErrorType::Network
        };
        Err(Error::msg(kind, format!("{what} answered with status {status}")))
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let body = response.text().await.map_err(|e| {
            Error::new(
                ErrorType::Network,
                anyhow::Error::new(e).context(format!("Unable to read the {what} response")),
            )
        })?;
        serde_json::from_str(&body).map_err(|e| {
            Error::new(
                ErrorType::Decoding,
                anyhow::Error::new(e).context(format!("Unable to decode the {what} response")),
            )
        })
    }
}

#[async_trait::async_trait]
impl Remote for HttpRemote {
    async fn list_transactions(
        &self,
        account_id: i64,
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<Vec<Transaction>> {
        let what = "GET transactions";
        let builder = self
            .request(
                Method::GET,
                &format!("transactions/account/{account_id}/period"),
            )?
            .query(&[
                ("startDate", format_query_date(start)),
                ("endDate", format_query_date(end)),
            ]);
        let response = self.send(builder, what).await?;
        Self::decode(response, what).await
    }

    async fn create_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<CreatedTransaction> {
        let what = "POST transactions";
        let builder = self.request(Method::POST, "transactions")?.json(request);
        let response = self.send(builder, what).await?;
        Self::decode(response, what).await
    }

    async fn update_transaction(
        &self,
        id: i64,
        request: &TransactionRequest,
    ) -> Result<Transaction> {
        let what = format!("PUT transactions/{id}");
        let builder = self
            .request(Method::PUT, &format!("transactions/{id}"))?
            .json(request);
        let response = self.send(builder, &what).await?;
        Self::decode(response, &what).await
    }

    async fn delete_transaction(&self, id: i64) -> Result<()> {
        let what = format!("DELETE transactions/{id}");
        let builder = self.request(Method::DELETE, &format!("transactions/{id}"))?;
        self.send(builder, &what).await?;
        Ok(())
    }

    async fn account(&self, id: i64) -> Result<Account> {
        let what = format!("GET accounts/{id}");
        let builder = self.request(Method::GET, &format!("accounts/{id}"))?;
        let response = self.send(builder, &what).await?;
        Self::decode(response, &what).await
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        let what = "GET categories";
        let builder = self.request(Method::GET, "categories")?;
        let response = self.send(builder, what).await?;
        Self::decode(response, what).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_keeps_path_prefix() {
        let remote =
            HttpRemote::new("https://example.com/api/v1", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            remote.url("transactions/7").unwrap().as_str(),
            "https://example.com/api/v1/transactions/7"
        );
    }

    #[test]
    fn test_invalid_base_url_is_config_error() {
        let err = HttpRemote::new("not a url", None, Duration::from_secs(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorType::Config);
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_network_error() {
        // Port 9 on localhost (discard) is closed in test environments.
        let remote =
            HttpRemote::new("http://127.0.0.1:9/", None, Duration::from_secs(2)).unwrap();
        let err = remote.categories().await.unwrap_err();
        assert!(err.is_network());
    }
}
