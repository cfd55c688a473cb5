//! Scripted endpoint and paused-time clock shared by scheduler tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use racer_clock::Clock;
use racer_core::{
    FireRequest, FireResponse, NetworkPath, NextSlot, ReservableSlot, ReserveEndpoint, Ticket,
};
use tokio::time::Instant;

/// Window open time used across tests, epoch seconds.
pub const OPEN_TIME: i64 = 1_720_760_400;
pub const OPEN_TIME_MS: i64 = OPEN_TIME * 1000;

/// Wall clock that advances with tokio's (possibly paused) time.
pub struct PausedClock {
    base_ms: i64,
    start: Instant,
}

impl PausedClock {
    pub fn starting_at(base_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            base_ms,
            start: Instant::now(),
        })
    }
}

impl Clock for PausedClock {
    fn now_millis(&self) -> i64 {
        self.base_ms + self.start.elapsed().as_millis() as i64
    }
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Reply(i64, &'static str),
    Unset,
    Transport,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub request: FireRequest,
    pub path: NetworkPath,
    pub at: Instant,
}

/// Endpoint that replays a script. Once the script runs out it answers
/// 76647 so a misbehaving test terminates instead of spinning.
pub struct ScriptedEndpoint {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Call>>,
    fallback: bool,
    latency: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedEndpoint {
    pub fn new(script: Vec<Scripted>, fallback: bool) -> Arc<Self> {
        Self::with_latency(script, fallback, Duration::ZERO)
    }

    pub fn with_latency(script: Vec<Scripted>, fallback: bool, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
            fallback,
            latency,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<NetworkPath> {
        self.calls().iter().map(|call| call.path).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReserveEndpoint for ScriptedEndpoint {
    fn has_fallback(&self) -> bool {
        self.fallback
    }

    async fn fire(&self, request: &FireRequest, path: NetworkPath) -> Result<FireResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().unwrap().push(Call {
            request: request.clone(),
            path,
            at: Instant::now(),
        });
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Scripted::Reply(76647, "exhausted"));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match step {
            Scripted::Reply(code, message) => Ok(FireResponse {
                code,
                message: message.to_string(),
                ttl: 1,
            }),
            Scripted::Unset => Ok(FireResponse::unset()),
            Scripted::Transport => Err(anyhow!("connection reset")),
        }
    }
}

pub fn slot(id: i64, open_time: i64) -> ReservableSlot {
    ReservableSlot {
        id,
        name: format!("Stage {id}"),
        open_time,
        next: None,
        vip_flag: 0,
    }
}

pub fn vip_slot(id: i64, open_time: i64) -> ReservableSlot {
    ReservableSlot {
        vip_flag: 1,
        ..slot(id, open_time)
    }
}

pub fn slot_with_next(id: i64, open_time: i64, next_open: i64) -> ReservableSlot {
    ReservableSlot {
        next: Some(NextSlot {
            open_time: next_open,
            vip_flag: 0,
        }),
        ..slot(id, open_time)
    }
}

pub fn ticket(id: &str, category: &str) -> Ticket {
    Ticket {
        id: id.to_string(),
        category: category.to_string(),
        label: "7月12日".to_string(),
    }
}
