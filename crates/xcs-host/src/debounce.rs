//! Coalesces rapid change events per file and breaks the feedback loop between
//! writing a derived file and observing the resulting change notification.
//!
//! Each path is either Idle or InFlight. Change events restart a per-path timer;
//! when the timer expires the path enters InFlight and the work runs. Events that
//! arrive while a path is InFlight are dropped.

use std::{
	collections::{HashMap, HashSet},
	future::Future,
	path::PathBuf,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc, Mutex,
	},
	time::Duration,
};

use xcs_abstractions::tracing::debug;

/// The debounce window applied to change events.
pub const DEBOUNCE_DELAY: Duration = Duration::from_millis(200);

/// Schedules debounced, gated work per path.
#[derive(Clone)]
pub struct ChangeScheduler {
	state: Arc<SchedulerState>,
}

struct SchedulerState {
	delay: Duration,

	/// The generation of the live timer per path. A newer generation supersedes
	/// the sleeper without cancelling mid-flight work.
	pending: Mutex<HashMap<PathBuf, u64>>,

	/// The processing gate: paths whose work is currently running.
	in_flight: Mutex<HashSet<PathBuf>>,

	generations: AtomicU64,
}

impl ChangeScheduler {
	pub fn new(delay: Duration) -> Self {
		Self {
			state: Arc::new(SchedulerState {
				delay,
				pending: Mutex::new(HashMap::new()),
				in_flight: Mutex::new(HashSet::new()),
				generations: AtomicU64::new(0),
			}),
		}
	}

	/// Schedules `work` for `path` after the debounce window. An existing timer
	/// for the path is restarted; an InFlight path drops the event.
	pub fn schedule<TWork, TFuture>(&self, path: PathBuf, work: TWork)
	where
		TWork: FnOnce() -> TFuture + Send + 'static,
		TFuture: Future<Output = ()> + Send + 'static,
	{
		if self.state.in_flight.lock().unwrap().contains(&path) {
			debug!(path = %path.display(), "Change event dropped; transformation in flight.");
			return;
		}

		let generation = self.state.generations.fetch_add(1, Ordering::Relaxed);
		self.state.pending.lock().unwrap().insert(path.clone(), generation);

		let state = self.state.clone();
		tokio::spawn(async move {
			tokio::time::sleep(state.delay).await;

			{
				let mut pending = state.pending.lock().unwrap();
				if pending.get(&path) != Some(&generation) {
					return; // Superseded by a newer change event.
				}
				pending.remove(&path);
			}

			state.in_flight.lock().unwrap().insert(path.clone());
			work().await;
			state.in_flight.lock().unwrap().remove(&path);
		});
	}

	/// Cancels any pending timer for `path`. In-flight work is not interrupted.
	pub fn cancel(&self, path: &PathBuf) { self.state.pending.lock().unwrap().remove(path); }

	pub fn is_in_flight(&self, path: &PathBuf) -> bool { self.state.in_flight.lock().unwrap().contains(path) }
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::AtomicUsize;

	fn counting_work(counter: Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
		move || {
			counter.fetch_add(1, Ordering::SeqCst);
			std::future::ready(())
		}
	}

	#[tokio::test]
	async fn rapid_events_coalesce_into_one_invocation() {
		let scheduler = ChangeScheduler::new(Duration::from_millis(200));
		let counter = Arc::new(AtomicUsize::new(0));
		let path = PathBuf::from("/proj/a.xcs");

		for _ in 0..3 {
			scheduler.schedule(path.clone(), counting_work(counter.clone()));
			tokio::time::sleep(Duration::from_millis(30)).await;
		}

		tokio::time::sleep(Duration::from_millis(400)).await;
		assert_eq!(counter.load(Ordering::SeqCst), 1);

		// A later event triggers a second invocation.
		scheduler.schedule(path.clone(), counting_work(counter.clone()));
		tokio::time::sleep(Duration::from_millis(400)).await;
		assert_eq!(counter.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn distinct_paths_are_independent() {
		let scheduler = ChangeScheduler::new(Duration::from_millis(50));
		let counter = Arc::new(AtomicUsize::new(0));

		scheduler.schedule(PathBuf::from("/a.xcs"), counting_work(counter.clone()));
		scheduler.schedule(PathBuf::from("/b.xcs"), counting_work(counter.clone()));

		tokio::time::sleep(Duration::from_millis(200)).await;
		assert_eq!(counter.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn cancel_discards_the_pending_timer() {
		let scheduler = ChangeScheduler::new(Duration::from_millis(50));
		let counter = Arc::new(AtomicUsize::new(0));
		let path = PathBuf::from("/a.xcs");

		scheduler.schedule(path.clone(), counting_work(counter.clone()));
		scheduler.cancel(&path);

		tokio::time::sleep(Duration::from_millis(200)).await;
		assert_eq!(counter.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn in_flight_paths_drop_new_events() {
		let scheduler = ChangeScheduler::new(Duration::from_millis(10));
		let counter = Arc::new(AtomicUsize::new(0));
		let path = PathBuf::from("/a.xcs");

		let slow_counter = counter.clone();
		scheduler.schedule(path.clone(), move || async move {
			slow_counter.fetch_add(1, Ordering::SeqCst);
			tokio::time::sleep(Duration::from_millis(300)).await;
		});

		// Wait until the work is in flight, then raise another event.
		tokio::time::sleep(Duration::from_millis(100)).await;
		assert!(scheduler.is_in_flight(&path));
		scheduler.schedule(path.clone(), counting_work(counter.clone()));

		tokio::time::sleep(Duration::from_millis(500)).await;
		assert_eq!(counter.load(Ordering::SeqCst), 1);
	}
}
