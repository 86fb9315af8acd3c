//! Fixed ("canned") responses to JSON-RPC method calls.
//!
//! Used for testing the alloy-backed provider without a node.

use std::{
    borrow::Cow,
    collections::BTreeMap,
    future::ready,
    sync::Arc,
    task::{Context, Poll},
};

use alloy::{
    providers::RootProvider,
    rpc::json_rpc::{
        ErrorPayload, RequestMeta, RequestPacket, Response, ResponsePacket, ResponsePayload,
    },
    transports::{BoxTransport, TransportConnect, TransportError},
};
use futures::{future::BoxFuture, FutureExt as _};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tower::Service;

#[derive(Clone, Default)]
pub(crate) struct Canned {
    method2response: BTreeMap<String, Value>,
    /// `eth_call` responses keyed by the 4-byte function selector.
    selector2response: BTreeMap<[u8; 4], Value>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl Canned {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub(crate) fn respond(mut self, method: impl Into<String>, response: impl Serialize) -> Self {
        let clobbered = self.method2response.insert(
            method.into(),
            serde_json::to_value(response).expect("serialization failure"),
        );
        assert!(
            clobbered.is_none(),
            "duplicate response registered - this is probably not what you want"
        );
        self
    }

    #[track_caller]
    pub(crate) fn respond_call(mut self, selector: [u8; 4], response: impl Serialize) -> Self {
        let clobbered = self.selector2response.insert(
            selector,
            serde_json::to_value(response).expect("serialization failure"),
        );
        assert!(clobbered.is_none(), "duplicate eth_call response registered");
        self
    }

    /// Methods received so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub(crate) fn into_provider(self) -> RootProvider<BoxTransport> {
        RootProvider::connect_boxed(self)
            .now_or_never()
            .expect("Canned::get_transport is non blocking")
            .expect("Canned::get_transport is infallible")
    }

    fn lookup(&self, method: &str, params: &Value) -> Option<&Value> {
        if method == "eth_call" {
            if let Some(response) = call_selector(params).and_then(|selector| {
                self.selector2response.get(&selector)
            }) {
                return Some(response);
            }
        }
        self.method2response.get(method)
    }
}

/// Extracts the function selector from `eth_call` params
/// (`[{"to": .., "input": "0x.."}, "latest"]`).
fn call_selector(params: &Value) -> Option<[u8; 4]> {
    let tx = params.get(0)?;
    let input = tx.get("input").or_else(|| tx.get("data"))?.as_str()?;
    let bytes = alloy::hex::decode(input).ok()?;
    bytes.get(..4)?.try_into().ok()
}

impl TransportConnect for Canned {
    type Transport = Self;
    fn is_local(&self) -> bool {
        true
    }
    fn get_transport<'a: 'b, 'b>(
        &'a self,
    ) -> BoxFuture<'b, Result<Self::Transport, TransportError>> {
        ready(Ok(self.clone())).boxed()
    }
}

impl Service<RequestPacket> for Canned {
    type Response = ResponsePacket;
    type Error = TransportError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;
    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }
    fn call(&mut self, req: RequestPacket) -> Self::Future {
        fn error(message: impl Into<Cow<'static, str>>) -> TransportError {
            TransportError::ErrorResp(ErrorPayload {
                code: 0,
                message: message.into().into_owned(),
                data: None,
            })
        }

        match req {
            RequestPacket::Single(it) => {
                let (RequestMeta { method, id, .. }, raw) = it.decompose();
                self.requests.lock().push(method.to_string());
                // The raw value is the whole serialized request.
                let params = match serde_json::from_str::<Value>(raw.get()) {
                    Ok(Value::Object(mut request)) => {
                        request.remove("params").unwrap_or(Value::Null)
                    }
                    Ok(other) => other,
                    Err(_) => Value::Null,
                };
                ready(
                    self.lookup(&method, &params)
                        .map(|it| {
                            ResponsePacket::Single(Response {
                                id,
                                payload: ResponsePayload::Success(
                                    serde_json::value::to_raw_value(it).unwrap(),
                                ),
                            })
                        })
                        .ok_or_else(|| error(format!("method {method} not implemented"))),
                )
                .boxed()
            }
            RequestPacket::Batch(_) => {
                ready(Err(error("batched messages are not supported"))).boxed()
            }
        }
    }
}
