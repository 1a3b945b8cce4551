//! Chord RPC Client
//!
//! HTTP handle to a remote ring member. One method per message purpose;
//! [`ChordClient::send`] is the static purpose-to-method dispatch used when
//! forwarding. Sends retry with exponential backoff and jitter before the
//! peer is reported unreachable.

use std::time::Duration;

use crate::error::{ChordError, ChordResult};
use super::protocol::{
    Message, Purpose, ENDPOINT_DEL, ENDPOINT_FIND_SUCCESSOR, ENDPOINT_GET, ENDPOINT_HEARTBEAT,
    ENDPOINT_JOIN, ENDPOINT_LEAVE, ENDPOINT_LOOKUP, ENDPOINT_NOTIFY, ENDPOINT_SET,
};

const SEND_TIMEOUT: Duration = Duration::from_millis(500);
const SEND_ATTEMPTS: usize = 3;

/// Client handle for one remote node. Cloning shares the connection pool.
#[derive(Clone)]
pub struct ChordClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChordClient {
    /// Builds a handle for `host:port`. The connection itself is established
    /// lazily on the first send.
    pub fn connect(host: &str, port: u16) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{}:{}", host, port),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn join(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_JOIN, req).await
    }

    pub async fn leave(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_LEAVE, req).await
    }

    pub async fn notify(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_NOTIFY, req).await
    }

    pub async fn find_successor(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_FIND_SUCCESSOR, req).await
    }

    pub async fn lookup(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_LOOKUP, req).await
    }

    pub async fn heart_beat(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_HEARTBEAT, req).await
    }

    pub async fn set(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_SET, req).await
    }

    pub async fn get(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_GET, req).await
    }

    pub async fn del(&self, req: &Message) -> ChordResult<Message> {
        self.post(ENDPOINT_DEL, req).await
    }

    /// Dispatches a request to the RPC matching its purpose.
    pub async fn send(&self, req: &Message) -> ChordResult<Message> {
        match req.purpose {
            Purpose::Join => self.join(req).await,
            Purpose::Leave => self.leave(req).await,
            Purpose::Notify => self.notify(req).await,
            Purpose::FindSuccessor => self.find_successor(req).await,
            Purpose::PredReq | Purpose::SuccReq => self.lookup(req).await,
            Purpose::HeartBeat => self.heart_beat(req).await,
            Purpose::KeySet => self.set(req).await,
            Purpose::KeyGet => self.get(req).await,
            Purpose::KeyDel => self.del(req).await,
            Purpose::StatusOk | Purpose::StatusError => Err(ChordError::Protocol(format!(
                "purpose {:?} is not a request",
                req.purpose
            ))),
        }
    }

    async fn post(&self, endpoint: &str, req: &Message) -> ChordResult<Message> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .post_with_retry(url, req, SEND_TIMEOUT, SEND_ATTEMPTS)
            .await?;

        if !response.status().is_success() {
            return Err(ChordError::PeerUnreachable {
                addr: self.base_url.clone(),
                reason: format!("http status {}", response.status()),
            });
        }

        response
            .json::<Message>()
            .await
            .map_err(|e| ChordError::Protocol(format!("malformed reply: {}", e)))
    }

    async fn post_with_retry(
        &self,
        url: String,
        payload: &Message,
        timeout: Duration,
        attempts: usize,
    ) -> ChordResult<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..attempts {
            let response = self
                .http
                .post(url.clone())
                .json(payload)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    if attempt + 1 == attempts {
                        return Err(ChordError::PeerUnreachable {
                            addr: self.base_url.clone(),
                            reason: e.to_string(),
                        });
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(ChordError::PeerUnreachable {
            addr: self.base_url.clone(),
            reason: "retry attempts exhausted".to_string(),
        })
    }
}
