use std::time::Duration;

use nswatch::ChangeEvent;
use nswatch::Error;
use nswatch::ErrorSink;
use nswatch::EventKind;
use nswatch::Resolver;
use parking_lot::Mutex;
use tokio::time::Instant;

pub const WAIT: Duration = Duration::from_secs(30);

/// Resolver keeping a materialized view of the namespace plus the raw
/// notification log
#[derive(Default)]
pub struct ViewResolver {
    log: Mutex<Vec<(EventKind, String, String)>>,
    view: Mutex<std::collections::BTreeMap<String, String>>,
}

impl ViewResolver {
    pub fn log(&self) -> Vec<(EventKind, String, String)> {
        self.log.lock().clone()
    }

    pub fn count(
        &self,
        kind: EventKind,
    ) -> usize {
        self.log.lock().iter().filter(|(k, _, _)| *k == kind).count()
    }

    pub fn view(&self) -> Vec<(String, String)> {
        self.view
            .lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<String> {
        self.view.lock().get(key).cloned()
    }

    fn record(
        &self,
        event: &ChangeEvent,
    ) {
        let key = event.key_str().into_owned();
        let value = event.value_str().into_owned();
        self.log.lock().push((event.kind, key.clone(), value.clone()));
    }
}

impl Resolver for ViewResolver {
    fn on_put(
        &self,
        event: &ChangeEvent,
    ) {
        self.record(event);
        self.view
            .lock()
            .insert(event.key_str().into_owned(), event.value_str().into_owned());
    }

    fn on_delete(
        &self,
        event: &ChangeEvent,
    ) {
        self.record(event);
        self.view.lock().remove(event.key_str().as_ref());
    }

    fn on_snapshot_entry(
        &self,
        entry: &ChangeEvent,
    ) {
        self.record(entry);
        self.view
            .lock()
            .insert(entry.key_str().into_owned(), entry.value_str().into_owned());
    }
}

#[derive(Default)]
pub struct CollectingSink {
    reports: Mutex<Vec<(Instant, String)>>,
}

impl CollectingSink {
    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|(_, m)| m.clone()).collect()
    }
}

impl ErrorSink for CollectingSink {
    fn report(
        &self,
        err: &Error,
    ) {
        self.reports.lock().push((Instant::now(), err.to_string()));
    }
}

pub async fn wait_until<F>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}
