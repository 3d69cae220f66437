//! Asynchronous transport between the orchestrator and a numeric engine.
//!
//! The engine runs on its own worker thread and owns nothing but the engine
//! value itself. Requests go in over one channel, responses come back over
//! another, each tagged with the originating request's kind and a strictly
//! increasing [`RequestId`]. Responses may be consumed in any order; the
//! bridge never looks at orchestrator state.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::domain::{RequestId, RequestKind};
use crate::engine::{EngineRequest, EngineResponse, NumericEngine};
use crate::error::EngineFailure;

/// Receipt for a submitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHandle {
    pub id: RequestId,
    pub kind: RequestKind,
}

/// Anything the orchestrator can hand engine requests to.
pub trait Dispatch {
    fn dispatch(&mut self, request: EngineRequest) -> Result<RequestHandle, EngineFailure>;
}

struct Envelope {
    id: RequestId,
    request: EngineRequest,
}

/// Engine running on a dedicated worker thread.
pub struct EngineBridge {
    requests: Option<Sender<Envelope>>,
    responses: Receiver<EngineResponse>,
    worker: Option<JoinHandle<()>>,
    next_id: u64,
}

impl EngineBridge {
    /// Move `engine` onto a new worker thread.
    pub fn spawn<E>(engine: E) -> Result<Self, EngineFailure>
    where
        E: NumericEngine + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Envelope>();
        let (response_tx, response_rx) = mpsc::channel::<EngineResponse>();

        let worker = thread::Builder::new()
            .name("funcfit-engine".to_string())
            .spawn(move || worker_loop(engine, request_rx, response_tx))
            .map_err(|e| EngineFailure::Unreachable(format!("failed to start engine thread: {e}")))?;

        log::debug!("engine worker started");
        Ok(Self {
            requests: Some(request_tx),
            responses: response_rx,
            worker: Some(worker),
            next_id: 0,
        })
    }

    /// Submit a request; its response arrives later on the response channel.
    pub fn send(&mut self, request: EngineRequest) -> Result<RequestHandle, EngineFailure> {
        self.next_id += 1;
        let handle = RequestHandle {
            id: RequestId(self.next_id),
            kind: request.kind(),
        };
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| EngineFailure::Unreachable("engine bridge is shut down".to_string()))?;
        sender
            .send(Envelope { id: handle.id, request })
            .map_err(|_| EngineFailure::Unreachable("engine worker has stopped".to_string()))?;
        Ok(handle)
    }

    /// Next response if one is ready.
    pub fn try_recv(&self) -> Result<Option<EngineResponse>, EngineFailure> {
        match self.responses.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(worker_gone()),
        }
    }

    /// Block until the next response arrives.
    pub fn recv(&self) -> Result<EngineResponse, EngineFailure> {
        self.responses.recv().map_err(|_| worker_gone())
    }

    /// Block for at most `timeout`; `Ok(None)` if nothing arrived.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineResponse>, EngineFailure> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(response)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(worker_gone()),
        }
    }
}

impl Dispatch for EngineBridge {
    fn dispatch(&mut self, request: EngineRequest) -> Result<RequestHandle, EngineFailure> {
        self.send(request)
    }
}

impl Drop for EngineBridge {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::warn!("engine worker panicked");
            }
        }
        log::debug!("engine worker stopped");
    }
}

fn worker_loop<E: NumericEngine>(engine: E, requests: Receiver<Envelope>, responses: Sender<EngineResponse>) {
    for Envelope { id, request } in requests.iter() {
        let kind = request.kind();
        log::debug!("engine: running {kind:?} request {id}");
        let outcome = request.execute(&engine);
        if responses.send(EngineResponse { kind, id, outcome }).is_err() {
            break;
        }
    }
}

fn worker_gone() -> EngineFailure {
    EngineFailure::Unreachable("engine worker has stopped".to_string())
}

/// Dispatcher that queues requests until the caller runs them.
///
/// Useful for hosts that drive the engine themselves (single-threaded
/// embeddings, tests that need to deliver results out of order).
#[derive(Default)]
pub struct ManualDispatch {
    queue: VecDeque<(RequestHandle, EngineRequest)>,
    next_id: u64,
}

impl ManualDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Remove and return all queued requests, oldest first.
    pub fn take_requests(&mut self) -> Vec<(RequestHandle, EngineRequest)> {
        self.queue.drain(..).collect()
    }

    /// Run the oldest queued request on `engine`.
    pub fn run_next<E: NumericEngine + ?Sized>(&mut self, engine: &E) -> Option<EngineResponse> {
        let (handle, request) = self.queue.pop_front()?;
        Some(respond(handle, &request, engine))
    }
}

impl Dispatch for ManualDispatch {
    fn dispatch(&mut self, request: EngineRequest) -> Result<RequestHandle, EngineFailure> {
        self.next_id += 1;
        let handle = RequestHandle {
            id: RequestId(self.next_id),
            kind: request.kind(),
        };
        self.queue.push_back((handle, request));
        Ok(handle)
    }
}

/// Run `request` on `engine` and tag the outcome with `handle`.
pub fn respond<E: NumericEngine + ?Sized>(handle: RequestHandle, request: &EngineRequest, engine: &E) -> EngineResponse {
    EngineResponse {
        kind: handle.kind,
        id: handle.id,
        outcome: request.execute(engine),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EnginePayload, LocalEngine};

    fn model_request(a: f64) -> EngineRequest {
        EngineRequest::Model {
            model_name: "linear".to_string(),
            params: vec![a, 0.0],
            x: vec![1.0, 2.0],
        }
    }

    #[test]
    fn bridge_answers_every_request_once_with_increasing_ids() {
        let mut bridge = EngineBridge::spawn(LocalEngine::default()).unwrap();
        let first = bridge.send(model_request(1.0)).unwrap();
        let second = bridge.send(model_request(2.0)).unwrap();
        assert!(second.id > first.id);

        let mut got = vec![bridge.recv().unwrap(), bridge.recv().unwrap()];
        got.sort_by_key(|r| r.id);
        assert_eq!(got[0].id, first.id);
        assert_eq!(got[0].outcome, Ok(EnginePayload::Model(vec![1.0, 2.0])));
        assert_eq!(got[1].outcome, Ok(EnginePayload::Model(vec![2.0, 4.0])));
        assert_eq!(bridge.recv_timeout(Duration::from_millis(20)).unwrap(), None);
    }

    #[test]
    fn bridge_reports_engine_failures_as_responses() {
        let mut bridge = EngineBridge::spawn(LocalEngine::default()).unwrap();
        let handle = bridge
            .send(EngineRequest::Model {
                model_name: "nope".to_string(),
                params: vec![],
                x: vec![0.0],
            })
            .unwrap();
        let response = bridge.recv().unwrap();
        assert_eq!(response.id, handle.id);
        assert_eq!(response.kind, RequestKind::Model);
        assert_eq!(response.outcome, Err(EngineFailure::UnknownModel("nope".to_string())));
    }

    #[test]
    fn manual_dispatch_holds_requests_until_run() {
        let mut dispatch = ManualDispatch::new();
        let a = dispatch.dispatch(model_request(1.0)).unwrap();
        let b = dispatch.dispatch(model_request(3.0)).unwrap();
        assert_eq!(dispatch.pending(), 2);

        let mut taken = dispatch.take_requests();
        assert_eq!(dispatch.pending(), 0);
        let (handle_b, request_b) = taken.pop().unwrap();
        assert_eq!(handle_b, b);
        let response = respond(handle_b, &request_b, &LocalEngine::default());
        assert_eq!(response.outcome, Ok(EnginePayload::Model(vec![3.0, 6.0])));
        assert_eq!(taken[0].0, a);
    }
}
