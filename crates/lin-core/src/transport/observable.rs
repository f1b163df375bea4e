//! Transport wrapper that emits packet events.

use std::sync::Arc;
use std::time::Duration;

use super::traits::{LinTransport, TransportError};
use crate::events::{LinEvent, LinObserver, PacketDirection};

pub struct ObservableTransport<T: LinTransport, O: LinObserver> {
    inner: T,
    observer: Arc<O>,
}

impl<T: LinTransport, O: LinObserver> ObservableTransport<T, O> {
    pub fn new(inner: T, observer: Arc<O>) -> Self {
        Self { inner, observer }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: LinTransport, O: LinObserver> LinTransport for ObservableTransport<T, O> {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let res = self.inner.write(data);
        if res.is_ok() {
            self.observer.on_event(&LinEvent::Packet {
                direction: PacketDirection::Tx,
                length: data.len(),
                data: data.to_vec(),
            });
        }
        res
    }

    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError> {
        let res = self.inner.read(count);
        if let Ok(data) = &res
            && !data.is_empty()
        {
            self.observer.on_event(&LinEvent::Packet {
                direction: PacketDirection::Rx,
                length: data.len(),
                data: data.clone(),
            });
        }
        res
    }

    fn send_break(&mut self) -> Result<(), TransportError> {
        self.inner.send_break()
    }

    fn drive_dominant(&mut self, duration: Duration) -> Result<(), TransportError> {
        self.inner.drive_dominant(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<LinEvent>>);

    impl LinObserver for Recorder {
        fn on_event(&self, event: &LinEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_packets_reported() {
        let mock = MockTransport::new();
        mock.queue_rx(&[7, 8]);
        let recorder = Arc::new(Recorder::default());
        let mut transport = ObservableTransport::new(mock.clone(), recorder.clone());

        transport.write(&[1, 2, 3]).unwrap();
        transport.read(2).unwrap();
        assert!(transport.read(1).is_err());

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            LinEvent::Packet { direction: PacketDirection::Tx, length: 3, .. }
        ));
        assert!(matches!(
            &events[1],
            LinEvent::Packet { direction: PacketDirection::Rx, length: 2, .. }
        ));
    }
}
