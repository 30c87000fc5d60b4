use super::error::NetworkError;
use super::request::{Request, Response};
use reqwest::Client;
use std::future::Future;
use std::time::Duration;

pub trait Network: Clone + Send + Sync + 'static {
    /// Resolves with whatever the server answered, any status included.
    /// Only transport failures are errors.
    fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, NetworkError>> + Send;
}

#[derive(Clone)]
pub struct HttpNetwork {
    client: Client,
}

impl HttpNetwork {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let transport = |source| NetworkError::Transport {
            url: request.url.to_string(),
            source,
        };

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport)?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
