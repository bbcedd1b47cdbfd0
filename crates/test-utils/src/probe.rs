#![allow(dead_code)]

//! Task bodies that record when they run.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use suiterun::task::TaskDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start(String),
    End(String),
}

#[derive(Debug, Default)]
struct State {
    events: Vec<Event>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Shared log of body start/end events, in the order they happened.
///
/// Bodies record `End` before returning, so for any two tasks the log tells
/// whether their bodies overlapped.
#[derive(Debug, Clone, Default)]
pub struct Probe {
    state: Arc<Mutex<State>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor whose body sleeps for `work` and succeeds.
    pub fn task(&self, id: &str, work: Duration) -> TaskDescriptor {
        self.task_with_result(id, work, None)
    }

    /// Descriptor whose body sleeps for `work` and then fails with `message`.
    pub fn failing_task(&self, id: &str, work: Duration, message: &str) -> TaskDescriptor {
        self.task_with_result(id, work, Some(message.to_string()))
    }

    fn task_with_result(&self, id: &str, work: Duration, failure: Option<String>) -> TaskDescriptor {
        let probe = self.clone();
        let name = id.to_string();
        TaskDescriptor::new(id, move || {
            let probe = probe.clone();
            let name = name.clone();
            let failure = failure.clone();
            async move {
                probe.record_start(&name);
                tokio::time::sleep(work).await;
                probe.record_end(&name);
                match failure {
                    Some(message) => Err(anyhow::anyhow!(message)),
                    None => anyhow::Ok(()),
                }
            }
        })
    }

    fn record_start(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Start(id.to_string()));
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
    }

    fn record_end(&self, id: &str) {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::End(id.to_string()));
        state.in_flight -= 1;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    /// Ids in the order their bodies started.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Start(id) => Some(id),
                Event::End(_) => None,
            })
            .collect()
    }

    pub fn ran(&self, id: &str) -> bool {
        self.events().contains(&Event::Start(id.to_string()))
    }

    /// The body of `id` ran to completion.
    pub fn finished(&self, id: &str) -> bool {
        self.events().contains(&Event::End(id.to_string()))
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_in_flight
    }

    fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }

    /// `first`'s body ended before `second`'s body started.
    pub fn finished_before(&self, first: &str, second: &str) -> bool {
        match (
            self.position(&Event::End(first.to_string())),
            self.position(&Event::Start(second.to_string())),
        ) {
            (Some(end), Some(start)) => end < start,
            _ => false,
        }
    }

    /// The bodies of `a` and `b` never ran at the same time.
    pub fn disjoint(&self, a: &str, b: &str) -> bool {
        self.finished_before(a, b) || self.finished_before(b, a)
    }
}
