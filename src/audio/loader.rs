use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use super::{AudioDecoder, SampleBuffer};
use crate::error::DecodeError;

/// A finished decode, delivered in completion order.
#[derive(Debug)]
pub struct LoadOutcome {
    pub ticket: u64,
    pub result: Result<SampleBuffer, DecodeError>,
}

/// Runs decodes in the background and hands back results through a channel.
///
/// Several decodes may be in flight at once. Outcomes arrive in the order the
/// decodes finish, so installing each one as it is received gives
/// last-completed-wins.
pub struct LoadQueue {
    decoder: Arc<dyn AudioDecoder>,
    runtime: Handle,
    sender: Sender<LoadOutcome>,
    receiver: Receiver<LoadOutcome>,
    next_ticket: u64,
    in_flight: usize,
}

impl LoadQueue {
    pub fn new(decoder: Arc<dyn AudioDecoder>, runtime: Handle) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self {
            decoder,
            runtime,
            sender,
            receiver,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    /// Start decoding `bytes`. Returns the ticket its outcome will carry.
    pub fn submit(&mut self, bytes: Vec<u8>) -> u64 {
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let decoder = Arc::clone(&self.decoder);
        let sender = self.sender.clone();

        debug!("Queued decode #{} ({} bytes, {} decoder)", ticket, bytes.len(), decoder.decoder_type());
        self.runtime.spawn(async move {
            let result = decoder.decode(bytes).await;
            // Receiver gone means the player shut down; nothing left to notify
            let _ = sender.send(LoadOutcome { ticket, result });
        });
        self.in_flight += 1;
        ticket
    }

    /// Next finished decode, if any, without waiting.
    pub fn try_next(&mut self) -> Option<LoadOutcome> {
        let outcome = self.receiver.try_recv().ok()?;
        self.in_flight -= 1;
        Some(outcome)
    }

    /// Next finished decode, waiting up to `timeout`.
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<LoadOutcome> {
        let outcome = self.receiver.recv_timeout(timeout).ok()?;
        self.in_flight -= 1;
        Some(outcome)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Decoder whose first byte is how long to take, in tens of milliseconds.
    /// A zero first byte fails.
    pub(crate) struct DelayedDecoder;

    #[async_trait]
    impl AudioDecoder for DelayedDecoder {
        async fn decode(&self, bytes: Vec<u8>) -> Result<SampleBuffer, DecodeError> {
            let delay = bytes.first().copied().unwrap_or(0);
            if delay == 0 {
                return Err(DecodeError::Unsupported("zero delay".to_string()));
            }
            tokio::time::sleep(Duration::from_millis(delay as u64 * 10)).await;
            // Length in frames mirrors the delay so tests can tell buffers apart
            SampleBuffer::new(vec![0.0; delay as usize * 100], 1, 1000)
        }

        fn decoder_type(&self) -> &'static str {
            "delayed"
        }
    }

    #[test]
    fn test_outcomes_arrive_in_completion_order() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut queue = LoadQueue::new(Arc::new(DelayedDecoder), runtime.handle().clone());

        let slow = queue.submit(vec![30]);
        let fast = queue.submit(vec![2]);
        assert_eq!(queue.in_flight(), 2);

        let first = queue.next_timeout(Duration::from_secs(5)).unwrap();
        let second = queue.next_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.ticket, fast);
        assert_eq!(second.ticket, slow);
        assert_eq!(second.result.unwrap().frame_count(), 3000);
        assert_eq!(queue.in_flight(), 0);
        assert!(queue.try_next().is_none());
    }

    #[test]
    fn test_failures_are_delivered() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let mut queue = LoadQueue::new(Arc::new(DelayedDecoder), runtime.handle().clone());

        queue.submit(vec![0]);
        let outcome = queue.next_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(outcome.result, Err(DecodeError::Unsupported(_))));
    }
}
