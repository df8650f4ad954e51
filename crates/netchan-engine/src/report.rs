//! Where pump errors go.
//!
//! The pumps run in their own tasks and cannot return errors to the caller
//! directly. They hand every error to a [`Reporter`] instead. Two reporters
//! ship with the crate: [`Latched`] keeps the first fatal error of each
//! direction for later inspection, [`Streamed`] delivers every error as it
//! happens.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::error::{ChanError, Direction, PumpError};

/// Receives errors from a channel's pumps.
pub trait Reporter: Send + Sync + 'static {
    /// Called once per error, fatal or not.
    fn report(&self, error: PumpError);

    /// Called once when the pump for `direction` has stopped.
    fn pump_finished(&self, _direction: Direction) {}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps the first fatal error of each direction.
///
/// Non-fatal errors are dropped. Once a direction has latched an error,
/// later errors for that direction are ignored.
#[derive(Debug, Default)]
pub struct Latched {
    slots: Mutex<Slots>,
}

#[derive(Debug, Default)]
struct Slots {
    send: Option<PumpError>,
    recv: Option<PumpError>,
}

impl Latched {
    pub fn new() -> Self {
        Self::default()
    }

    /// The error that stopped the send pump, if any.
    pub fn send_error(&self) -> Option<PumpError> {
        lock(&self.slots).send.clone()
    }

    /// The error that stopped the receive pump, if any.
    pub fn recv_error(&self) -> Option<PumpError> {
        lock(&self.slots).recv.clone()
    }

    /// Both latched errors combined, `None` while the channel is healthy.
    pub fn error(&self) -> Option<ChanError> {
        let slots = lock(&self.slots);
        ChanError::combine(slots.send.clone(), slots.recv.clone())
    }
}

impl Reporter for Latched {
    fn report(&self, error: PumpError) {
        if !error.is_fatal() {
            return;
        }
        let mut slots = lock(&self.slots);
        let slot = match error.direction() {
            Direction::Send => &mut slots.send,
            Direction::Recv => &mut slots.recv,
        };
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}

/// Delivers every error, fatal or not, in the order they were reported.
///
/// The error stream ends once both pumps have finished and all reported
/// errors have been taken. One `Streamed` serves a single channel.
#[derive(Debug)]
pub struct Streamed {
    state: Mutex<StreamState>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<PumpError>>,
}

#[derive(Debug)]
struct StreamState {
    tx: Option<mpsc::UnboundedSender<PumpError>>,
    send_done: bool,
    recv_done: bool,
}

impl Streamed {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(StreamState {
                tx: Some(tx),
                send_done: false,
                recv_done: false,
            }),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Wait for the next error.
    ///
    /// Returns `None` once both pumps have stopped and every error has
    /// been delivered.
    pub async fn next_error(&self) -> Option<PumpError> {
        self.rx.lock().await.recv().await
    }

    /// Take the next error if one is ready, without waiting.
    pub fn try_next_error(&self) -> Option<PumpError> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

impl Default for Streamed {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for Streamed {
    fn report(&self, error: PumpError) {
        if let Some(tx) = lock(&self.state).tx.as_ref() {
            let _ = tx.send(error);
        }
    }

    fn pump_finished(&self, direction: Direction) {
        let mut state = lock(&self.state);
        match direction {
            Direction::Send => state.send_done = true,
            Direction::Recv => state.recv_done = true,
        }
        if state.send_done && state.recv_done {
            state.tx = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use netchan_frame::FrameError;

    use super::*;

    fn fatal(direction: Direction) -> PumpError {
        PumpError::new(direction, true, FrameError::UnexpectedEof)
    }

    fn transient(direction: Direction) -> PumpError {
        PumpError::new(
            direction,
            false,
            FrameError::Io(std::io::ErrorKind::Interrupted.into()),
        )
    }

    #[test]
    fn latched_keeps_first_fatal_per_direction() {
        let latched = Latched::new();
        assert!(latched.error().is_none());

        latched.report(transient(Direction::Send));
        assert!(latched.send_error().is_none());

        latched.report(fatal(Direction::Send));
        latched.report(PumpError::new(
            Direction::Send,
            true,
            FrameError::StreamClosed,
        ));

        let send = latched.send_error().unwrap();
        assert!(matches!(send.frame_error(), FrameError::UnexpectedEof));
        assert!(latched.recv_error().is_none());

        let err = latched.error().unwrap();
        assert!(err.send().is_some());
        assert!(err.recv().is_none());
    }

    #[test]
    fn latched_directions_are_independent() {
        let latched = Latched::new();
        latched.report(fatal(Direction::Recv));
        latched.report(fatal(Direction::Send));

        let err = latched.error().unwrap();
        assert_eq!(err.to_string().lines().count(), 2);
    }

    #[tokio::test]
    async fn streamed_delivers_everything_in_order() {
        let streamed = Streamed::new();
        streamed.report(transient(Direction::Recv));
        streamed.report(fatal(Direction::Recv));

        let first = streamed.next_error().await.unwrap();
        assert!(!first.is_fatal());
        let second = streamed.next_error().await.unwrap();
        assert!(second.is_fatal());
        assert!(streamed.try_next_error().is_none());
    }

    #[tokio::test]
    async fn streamed_ends_after_both_pumps_finish() {
        let streamed = Streamed::new();
        streamed.report(fatal(Direction::Send));
        streamed.pump_finished(Direction::Send);
        assert!(streamed.next_error().await.is_some());

        streamed.pump_finished(Direction::Recv);
        assert!(streamed.next_error().await.is_none());

        // Reports after the stream ended are dropped.
        streamed.report(fatal(Direction::Recv));
        assert!(streamed.try_next_error().is_none());
    }
}
