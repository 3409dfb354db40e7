//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use http::header::{HeaderValue, ETAG};
use http::HeaderMap;

use crate::request::{RequestDescriptor, ResponseSnapshot};
use crate::transport::{Transport, TransportError};

/// One scripted transport reply.
#[derive(Clone)]
pub(crate) struct Reply {
    delay: Duration,
    result: Result<ResponseSnapshot, TransportError>,
}

impl Reply {
    /// Settle only after `ms` milliseconds.
    pub(crate) fn after_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

pub(crate) fn ok(body: &'static str) -> Reply {
    Reply {
        delay: Duration::ZERO,
        result: Ok(ResponseSnapshot::new(200, HeaderMap::new(), body)),
    }
}

pub(crate) fn ok_with_etag(body: &'static str, etag: &'static str) -> Reply {
    let mut headers = HeaderMap::new();
    headers.insert(ETAG, HeaderValue::from_static(etag));
    Reply {
        delay: Duration::ZERO,
        result: Ok(ResponseSnapshot::new(200, headers, body)),
    }
}

pub(crate) fn status(code: u16) -> Reply {
    Reply {
        delay: Duration::ZERO,
        result: Ok(ResponseSnapshot::new(code, HeaderMap::new(), "")),
    }
}

pub(crate) fn refused() -> Reply {
    Reply {
        delay: Duration::ZERO,
        result: Err(TransportError::Connect("connection refused".into())),
    }
}

/// Plays back replies in order; the last one repeats once the script runs out.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Option<Reply>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<RequestDescriptor>>,
}

impl ScriptedTransport {
    pub(crate) fn new(replies: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requests as they reached the transport, after optimization.
    pub(crate) fn requests(&self) -> Vec<RequestDescriptor> {
        self.seen.lock().unwrap().clone()
    }

    fn next_reply(&self) -> Reply {
        let mut last = self.last.lock().unwrap();
        match self.script.lock().unwrap().pop_front() {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().expect("scripted transport needs at least one reply"),
        }
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: RequestDescriptor) -> BoxFuture<'static, Result<ResponseSnapshot, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request);
        let reply = self.next_reply();
        async move {
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            reply.result
        }
        .boxed()
    }
}
