//! Scripted in-memory transport for tests (feature `testing`)

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, Method, Transport};

type Handler = Box<dyn Fn(&HttpRequest) -> HttpResponse + Send + Sync>;
type Scripted = Result<HttpResponse, TransportError>;

enum Reply {
    /// Popped in order; the last one repeats forever
    Queue(VecDeque<Scripted>),
    Handler(Handler),
}

struct Route {
    method: Method,
    url: String,
    query: Option<(String, String)>,
    reply: Reply,
}

impl Route {
    fn matches(&self, req: &HttpRequest) -> bool {
        self.method == req.method
            && self.url == req.url
            && self
                .query
                .as_ref()
                .map_or(true, |(k, v)| req.query_value(k) == Some(v.as_str()))
    }
}

/// Transport answering from scripted routes and recording every request.
///
/// Routes match on method + URL (without query string), optionally on one
/// query parameter. Unmatched requests get a 404.
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, method: Method, url: &str, query: Option<(&str, &str)>, resp: Scripted) {
        let query = query.map(|(k, v)| (k.to_string(), v.to_string()));
        let mut routes = self.routes.lock().unwrap();
        let existing = routes.iter().position(|r| {
            r.method == method
                && r.url == url
                && r.query == query
                && matches!(r.reply, Reply::Queue(_))
        });
        match existing {
            Some(i) => {
                if let Reply::Queue(q) = &mut routes[i].reply {
                    q.push_back(resp);
                }
            }
            None => routes.push(Route {
                method,
                url: url.to_string(),
                query,
                reply: Reply::Queue(VecDeque::from([resp])),
            }),
        }
    }

    /// Queue a GET response for `url`
    pub fn on_get(&self, url: &str, status: u16, body: &str) -> &Self {
        self.push(Method::Get, url, None, Ok(HttpResponse::new(status, body)));
        self
    }

    /// Queue a transport timeout for GETs to `url`
    pub fn on_get_timeout(&self, url: &str) -> &Self {
        self.push(
            Method::Get,
            url,
            None,
            Err(TransportError::Timeout("scripted timeout".into())),
        );
        self
    }

    /// Queue a GET response for `url` when query `key` equals `value`
    pub fn on_get_query(&self, url: &str, key: &str, value: &str, status: u16, body: &str) -> &Self {
        self.push(
            Method::Get,
            url,
            Some((key, value)),
            Ok(HttpResponse::new(status, body)),
        );
        self
    }

    /// Queue a POST response for `url`
    pub fn on_post(&self, url: &str, status: u16, body: &str) -> &Self {
        self.push(Method::Post, url, None, Ok(HttpResponse::new(status, body)));
        self
    }

    /// Answer POSTs to `url` by computing a response from the request
    pub fn on_post_with(
        &self,
        url: &str,
        handler: impl Fn(&HttpRequest) -> HttpResponse + Send + Sync + 'static,
    ) -> &Self {
        self.routes.lock().unwrap().push(Route {
            method: Method::Post,
            url: url.to_string(),
            query: None,
            reply: Reply::Handler(Box::new(handler)),
        });
        self
    }

    /// All requests sent so far, in order
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests sent to `url`
    pub fn hits(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    /// Number of requests whose URL starts with `prefix`
    pub fn hits_prefix(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.starts_with(prefix))
            .count()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|r| r.matches(request)) else {
            log::debug!("mock: no route for {:?} {}", request.method, request.url);
            return Ok(HttpResponse::new(404, ""));
        };
        let resp = match &mut route.reply {
            Reply::Queue(q) if q.len() > 1 => q.pop_front().unwrap(),
            Reply::Queue(q) => q.front().cloned().unwrap(),
            Reply::Handler(h) => Ok(h(request)),
        };
        resp
    }
}
