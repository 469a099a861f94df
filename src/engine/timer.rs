//! Logical deadlines delivered as engine events.
//!
//! A timer is a spawned sleep that posts back into the engine inbox, so
//! firings serialise with every other event. Each slot carries an epoch;
//! pausing, resuming or cancelling bumps it, and the engine ignores fires
//! whose epoch is stale.

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration, Instant};

use super::EngineEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Which deadline fired.
pub enum TimerKind {
    /// The song ends if nothing resolves it first.
    Song,
    /// The active player ran out of answering time.
    Answer,
    /// The break between rounds auto-advances.
    Advance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A timer firing, delivered through the engine inbox.
pub struct TimerFire {
    pub kind: TimerKind,
    pub epoch: u64,
}

#[derive(Default)]
struct TimerSlot {
    epoch: u64,
    handle: Option<JoinHandle<()>>,
    deadline: Option<Instant>,
    /// Time left at the moment of the last pause.
    remaining: Option<Duration>,
}

impl TimerSlot {
    fn clear(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }

        self.epoch += 1;
        self.deadline = None;
    }
}

/// The three deadline slots of one room engine.
pub struct Timers {
    song: TimerSlot,
    answer: TimerSlot,
    advance: TimerSlot,
    inbox: UnboundedSender<EngineEvent>,
}

impl Timers {
    pub fn new(inbox: UnboundedSender<EngineEvent>) -> Self {
        Self {
            song: TimerSlot::default(),
            answer: TimerSlot::default(),
            advance: TimerSlot::default(),
            inbox,
        }
    }

    fn slot(&mut self, kind: TimerKind) -> &mut TimerSlot {
        match kind {
            TimerKind::Song => &mut self.song,
            TimerKind::Answer => &mut self.answer,
            TimerKind::Advance => &mut self.advance,
        }
    }

    fn slot_ref(&self, kind: TimerKind) -> &TimerSlot {
        match kind {
            TimerKind::Song => &self.song,
            TimerKind::Answer => &self.answer,
            TimerKind::Advance => &self.advance,
        }
    }

    /// Arms a deadline `duration` ahead, replacing any previous one.
    pub fn arm(&mut self, kind: TimerKind, duration: Duration) {
        let inbox = self.inbox.clone();
        let slot = self.slot(kind);

        slot.clear();
        slot.remaining = None;

        let epoch = slot.epoch;
        slot.deadline = Some(Instant::now() + duration);
        slot.handle = Some(tokio::spawn(async move {
            sleep(duration).await;
            let _ = inbox.send(EngineEvent::Timer(TimerFire { kind, epoch }));
        }));
    }

    /// Pauses an armed deadline, keeping the remaining duration.
    pub fn pause(&mut self, kind: TimerKind) {
        let slot = self.slot(kind);

        if slot.handle.is_some() {
            let remaining = slot
                .deadline
                .map(|deadline| deadline.saturating_duration_since(Instant::now()));

            slot.clear();
            slot.remaining = remaining;
        }
    }

    /// Re-arms a paused deadline with the remaining duration.
    pub fn resume(&mut self, kind: TimerKind) {
        if let Some(remaining) = self.slot(kind).remaining.take() {
            self.arm(kind, remaining);
        }
    }

    /// Drops a deadline entirely.
    pub fn cancel(&mut self, kind: TimerKind) {
        let slot = self.slot(kind);
        slot.clear();
        slot.remaining = None;
    }

    /// Drops every deadline. Used on teardown and on game end.
    pub fn cancel_all(&mut self) {
        self.cancel(TimerKind::Song);
        self.cancel(TimerKind::Answer);
        self.cancel(TimerKind::Advance);
    }

    /// Whether a firing is still current, or a stale leftover.
    pub fn accepts(&self, fire: TimerFire) -> bool {
        self.slot_ref(fire.kind).epoch == fire.epoch
    }

    /// Time left on a slot, armed or paused. For diagnostics and tests.
    pub fn remaining(&self, kind: TimerKind) -> Option<Duration> {
        let slot = self.slot_ref(kind);

        slot.remaining.or_else(|| {
            slot.deadline
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
        })
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_fires_with_its_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::Song, Duration::from_secs(30));

        let event = rx.recv().await.unwrap();
        let EngineEvent::Timer(fire) = event else {
            panic!("expected a timer event");
        };
        assert_eq!(fire.kind, TimerKind::Song);
        assert!(timers.accepts(fire));
    }

    #[tokio::test(start_paused = true)]
    async fn pause_then_resume_preserves_remaining_time() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::Song, Duration::from_secs(30));
        tokio::time::advance(Duration::from_secs(10)).await;
        timers.pause(TimerKind::Song);

        let remaining = timers.remaining(TimerKind::Song).unwrap();
        assert_eq!(remaining, Duration::from_secs(20));

        // The pause gap itself must not eat into the song.
        tokio::time::advance(Duration::from_secs(100)).await;
        assert!(rx.try_recv().is_err());

        let before_resume = Instant::now();
        timers.resume(TimerKind::Song);

        let event = rx.recv().await.unwrap();
        let EngineEvent::Timer(fire) = event else {
            panic!("expected a timer event");
        };
        assert!(timers.accepts(fire));
        assert_eq!(
            Instant::now().duration_since(before_resume),
            Duration::from_secs(20)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_goes_stale() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::Answer, Duration::from_secs(5));
        let stale = TimerFire {
            kind: TimerKind::Answer,
            epoch: 1,
        };
        assert!(timers.accepts(stale));

        timers.cancel(TimerKind::Answer);
        assert!(!timers.accepts(stale));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_invalidates_the_previous_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::Song, Duration::from_secs(5));
        timers.arm(TimerKind::Song, Duration::from_secs(5));

        let event = rx.recv().await.unwrap();
        let EngineEvent::Timer(fire) = event else {
            panic!("expected a timer event");
        };
        assert!(timers.accepts(fire));
        assert_eq!(fire.epoch, 2);

        // Only the second arm survives to fire.
        assert!(rx.try_recv().is_err());
    }
}
