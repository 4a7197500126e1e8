//! Scripted collaborators for offline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::notify::{Message, Notifier};
use crate::session::proxy::{ProxyError, ProxyPool};
use crate::session::transport::{
    ApiRequest, ApiResponse, SessionFactory, SessionSettings, Transport, TransportError,
};
use crate::session::user_agent::UserAgentProvider;

type Handler = Box<dyn FnMut(&ApiRequest) -> ApiResponse + Send>;

struct ScriptState {
    handler: Handler,
    requests: Vec<ApiRequest>,
    sessions: Vec<SessionSettings>,
    cookie: Option<String>,
}

/// Shared script driving every session created by its factory.
#[derive(Clone)]
pub struct Script {
    state: Arc<Mutex<ScriptState>>,
}

impl Script {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&ApiRequest) -> ApiResponse + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                handler: Box::new(handler),
                requests: Vec::new(),
                sessions: Vec::new(),
                cookie: None,
            })),
        }
    }

    /// Replies in order; the last reply repeats forever.
    pub fn sequence(replies: Vec<ApiResponse>) -> Self {
        let mut queue: VecDeque<ApiResponse> = replies.into();
        Self::new(move |_| {
            if queue.len() > 1 {
                queue.pop_front().unwrap()
            } else {
                queue.front().cloned().unwrap()
            }
        })
    }

    pub fn factory(&self) -> ScriptedFactory {
        ScriptedFactory {
            script: self.clone(),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, path_prefix: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .requests
            .iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .count()
    }

    pub fn sessions(&self) -> Vec<SessionSettings> {
        self.state.lock().unwrap().sessions.clone()
    }

    pub fn set_cookie(&self, value: Option<&str>) {
        self.state.lock().unwrap().cookie = value.map(str::to_string);
    }
}

pub struct ScriptedFactory {
    script: Script,
}

impl SessionFactory for ScriptedFactory {
    fn create(&self, settings: &SessionSettings) -> Result<Box<dyn Transport>, TransportError> {
        let mut state = self.script.state.lock().unwrap();
        state.sessions.push(settings.clone());
        if state.cookie.is_none() {
            state.cookie = settings.datadome_cookie.clone();
        }
        Ok(Box::new(ScriptedTransport {
            script: self.script.clone(),
        }))
    }
}

struct ScriptedTransport {
    script: Script,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.script.state.lock().unwrap();
        state.requests.push(request.clone());
        Ok((state.handler)(request))
    }

    fn datadome_cookie(&self) -> Option<String> {
        self.script.state.lock().unwrap().cookie.clone()
    }
}

/// Numbered user agents: "agent/0", "agent/1", ...
#[derive(Clone, Default)]
pub struct CountingUserAgents {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl UserAgentProvider for CountingUserAgents {
    async fn user_agent(&self) -> String {
        format!("agent/{}", self.calls.fetch_add(1, Ordering::SeqCst))
    }
}

/// Proxy pool returning a fixed answer.
#[derive(Clone, Default)]
pub struct FixedProxyPool {
    pub proxy: Option<String>,
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ProxyPool for FixedProxyPool {
    async fn acquire(&self) -> Result<Option<String>, ProxyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.proxy.clone())
    }
}

/// Notifier that keeps every message.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<Message>>>,
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: &Message) {
        self.messages.lock().unwrap().push(message.clone());
    }
}

pub fn json(body: &str) -> ApiResponse {
    ApiResponse::json_reply(200, body)
}

pub fn status(code: u16) -> ApiResponse {
    ApiResponse::new(code, Some("text/html"), "")
}

/// Dispatcher over `script` with counting user agents, an empty proxy pool and default timing.
pub fn dispatcher(script: &Script) -> crate::dispatch::Dispatcher {
    crate::dispatch::Dispatcher::new(
        Box::new(script.factory()),
        Box::new(CountingUserAgents::default()),
        Box::new(FixedProxyPool::default()),
        crate::dispatch::EscalationPolicy::default(),
    )
}
