use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

use crate::session::SessionCmd;

/// Named, cancellable delayed and periodic tasks. Firing a task means
/// sending a [`SessionCmd`] back into the session channel, so every timer
/// outcome flows through the same single-consumer loop as network events.
///
/// Scheduling a name that is already live replaces the previous task.
pub struct Scheduler {
    tx: UnboundedSender<SessionCmd>,
    tasks: HashMap<&'static str, JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(tx: UnboundedSender<SessionCmd>) -> Self {
        Self {
            tx,
            tasks: HashMap::new(),
        }
    }

    /// Fire `cmd` once after `delay`.
    pub fn once(&mut self, name: &'static str, delay: Duration, cmd: SessionCmd) {
        self.cancel(name);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(cmd);
        });
        self.tasks.insert(name, handle);
    }

    /// Fire `make()` every `period`, starting one period from now.
    pub fn every<F>(&mut self, name: &'static str, period: Duration, make: F)
    where
        F: Fn() -> SessionCmd + Send + 'static,
    {
        self.cancel(name);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            loop {
                ticker.tick().await;
                if tx.send(make()).is_err() {
                    break;
                }
            }
        });
        self.tasks.insert(name, handle);
    }

    pub fn cancel(&mut self, name: &'static str) -> bool {
        match self.tasks.remove(name) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }

    pub fn is_scheduled(&self, name: &'static str) -> bool {
        self.tasks
            .get(name)
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
