use std::io::Read;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use crate::alarm::model::parse_new_alarm_json;
use crate::runtime::{RuntimeEvent, RuntimeSnapshot, local_now};

const MAX_BODY_BYTES: u64 = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

/// What a request handler can see: the last published snapshot and the runtime queue.
pub struct ApiContext {
    pub snapshot: Arc<Mutex<RuntimeSnapshot>>,
    pub events: Sender<RuntimeEvent>,
}

pub struct ApiServer {
    local_addr: Option<SocketAddr>,
    stop: Arc<AtomicBool>,
    http_join: Option<JoinHandle<()>>,
}

impl ApiServer {
    pub fn start(config: ApiServerConfig, context: ApiContext) -> Result<Self> {
        let bind = format!("{}:{}", config.bind_addr, config.port);
        let server = Server::http(&bind)
            .map_err(|err| anyhow::anyhow!("failed to start API server on {bind}: {err}"))?;
        let local_addr = server.server_addr().to_ip();
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = Arc::clone(&stop);
        let http_join = thread::Builder::new()
            .name("alarm-api".to_string())
            .spawn(move || run_server_loop(server, context, stop_for_thread))?;
        info!(addr = %bind, "local API listening");

        Ok(Self {
            local_addr,
            stop,
            http_join: Some(http_join),
        })
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.http_join.take() {
            let _ = join.join();
        }
    }
}

fn run_server_loop(server: Server, context: ApiContext, stop: Arc<AtomicBool>) {
    while !stop.load(Ordering::Relaxed) {
        match server.recv_timeout(Duration::from_millis(200)) {
            Ok(Some(request)) => handle_request(request, &context),
            Ok(None) => continue,
            Err(_) => continue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ApiRoute {
    Health,
    State,
    ListAlarms,
    CreateAlarm,
    ToggleAlarm(String),
    DeleteAlarm(String),
    StopFiring,
    SnoozeFiring,
}

/// Maps method + path to a route. `Err` carries the status to answer with.
fn route(method: &Method, path: &str) -> Result<ApiRoute, u16> {
    let segments = path
        .trim_end_matches('/')
        .split('/')
        .skip(1)
        .collect::<Vec<_>>();
    let (expected, route) = match segments.as_slice() {
        ["healthz"] => (Method::Get, ApiRoute::Health),
        ["v1", "state"] => (Method::Get, ApiRoute::State),
        ["v1", "alarms"] if method == &Method::Post => (Method::Post, ApiRoute::CreateAlarm),
        ["v1", "alarms"] => (Method::Get, ApiRoute::ListAlarms),
        ["v1", "alarms", id] if !id.is_empty() => {
            (Method::Delete, ApiRoute::DeleteAlarm((*id).to_string()))
        }
        ["v1", "alarms", id, "toggle"] if !id.is_empty() => {
            (Method::Post, ApiRoute::ToggleAlarm((*id).to_string()))
        }
        ["v1", "firing", "stop"] => (Method::Post, ApiRoute::StopFiring),
        ["v1", "firing", "snooze"] => (Method::Post, ApiRoute::SnoozeFiring),
        _ => return Err(404),
    };
    if method != &expected {
        return Err(405);
    }
    Ok(route)
}

#[derive(Serialize)]
struct Accepted {
    accepted: &'static str,
}

fn handle_request(mut request: tiny_http::Request, context: &ApiContext) {
    let Some(remote_addr) = request.remote_addr().copied() else {
        let _ = send_text(request, StatusCode(400), "missing remote address");
        return;
    };
    if !is_local_network_ip(remote_addr.ip()) {
        let _ = send_text(request, StatusCode(403), "forbidden: local network only");
        return;
    }

    let url = request.url().to_string();
    let (path, _query) = split_path_query(&url);
    let method = request.method().clone();
    debug!(%method, path, remote = %remote_addr, "api request");

    let route = match route(&method, path) {
        Ok(route) => route,
        Err(405) => {
            let _ = send_text(request, StatusCode(405), "method not allowed");
            return;
        }
        Err(code) => {
            let _ = send_text(request, StatusCode(code), "not found");
            return;
        }
    };

    let full_state = route == ApiRoute::State;
    let event = match route {
        ApiRoute::Health => {
            let _ = send_text(request, StatusCode(200), "ok");
            return;
        }
        ApiRoute::State | ApiRoute::ListAlarms => {
            let snapshot = match context.snapshot.lock() {
                Ok(guard) => guard.clone(),
                Err(_) => {
                    let _ = send_text(request, StatusCode(500), "internal state lock error");
                    return;
                }
            };
            let _ = if full_state {
                send_json(request, StatusCode(200), &snapshot)
            } else {
                send_json(request, StatusCode(200), &snapshot.alarms)
            };
            return;
        }
        ApiRoute::CreateAlarm => {
            let mut body = String::new();
            if let Err(err) = request
                .as_reader()
                .take(MAX_BODY_BYTES)
                .read_to_string(&mut body)
            {
                let _ = send_text(request, StatusCode(400), &format!("unreadable body: {err}"));
                return;
            }
            match parse_new_alarm_json(&body) {
                Ok(alarm) => RuntimeEvent::Create(alarm),
                Err(err) => {
                    let _ = send_text(request, StatusCode(400), &format!("{err:#}"));
                    return;
                }
            }
        }
        ApiRoute::ToggleAlarm(id) => RuntimeEvent::Toggle(id),
        ApiRoute::DeleteAlarm(id) => RuntimeEvent::Delete(id),
        ApiRoute::StopFiring => RuntimeEvent::Stop(local_now()),
        ApiRoute::SnoozeFiring => RuntimeEvent::Snooze(local_now()),
    };

    let accepted = event_name(&event);
    if context.events.send(event).is_err() {
        warn!("alarm runtime is gone, dropping {accepted} request");
        let _ = send_text(request, StatusCode(503), "alarm runtime unavailable");
        return;
    }
    let _ = send_json(request, StatusCode(202), &Accepted { accepted });
}

fn event_name(event: &RuntimeEvent) -> &'static str {
    match event {
        RuntimeEvent::Create(_) => "create",
        RuntimeEvent::Toggle(_) => "toggle",
        RuntimeEvent::Delete(_) => "delete",
        RuntimeEvent::Stop(_) => "stop",
        RuntimeEvent::Snooze(_) => "snooze",
        RuntimeEvent::Tick(_) => "tick",
        RuntimeEvent::WakeMessage { .. } => "wake-message",
        RuntimeEvent::Shutdown => "shutdown",
    }
}

fn send_json<T: Serialize>(
    request: tiny_http::Request,
    status: StatusCode,
    body: &T,
) -> Result<()> {
    let payload = serde_json::to_vec(body)?;
    let content_type = Header::from_str("Content-Type: application/json; charset=utf-8")
        .map_err(|_| anyhow::anyhow!("failed to build content-type header"))?;
    request.respond(
        Response::from_data(payload)
            .with_status_code(status)
            .with_header(content_type),
    )?;
    Ok(())
}

fn send_text(request: tiny_http::Request, status: StatusCode, body: &str) -> Result<()> {
    let content_type = Header::from_str("Content-Type: text/plain; charset=utf-8")
        .map_err(|_| anyhow::anyhow!("failed to build content-type header"))?;
    request.respond(
        Response::from_string(body.to_string())
            .with_status_code(status)
            .with_header(content_type),
    )?;
    Ok(())
}

fn split_path_query(url: &str) -> (&str, &str) {
    match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    }
}

fn is_local_network_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unique_local()
                || v6.is_unicast_link_local()
                || is_ipv4_mapped_local(v6)
        }
    }
}

fn is_ipv4_mapped_local(v6: Ipv6Addr) -> bool {
    match v6.to_ipv4_mapped() {
        Some(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        None => false,
    }
}
