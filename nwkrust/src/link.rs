//! Glue between the engine and a byte transport

use nwkrust_core::LineSink;
use tokio::sync::mpsc;
use tracing::warn;

/// Notification from whatever owns the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The transport connected (`true`) or disconnected (`false`)
    Connected(bool),

    /// The network came up or went away
    Online(bool),

    /// Received text, in arbitrary chunks
    Data(String),
}

/// [`LineSink`] that hands lines to an async writer task
#[derive(Debug, Clone)]
pub struct ChannelSink(mpsc::UnboundedSender<String>);

impl LineSink for ChannelSink {
    fn send_line(&self, line: &str) {
        if self.0.send(line.to_string()).is_err() {
            warn!(line = %line.trim_end(), "Writer gone, dropping line");
        }
    }
}

/// Sink and the receiver its lines arrive on
pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<String>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_lines() {
        let (sink, mut rx) = channel();
        sink.send_line("#OUTPUT,1,1,100.00\r\n");
        assert_eq!(rx.try_recv().unwrap(), "#OUTPUT,1,1,100.00\r\n");
    }

    #[test]
    fn test_closed_receiver_is_not_fatal() {
        let (sink, rx) = channel();
        drop(rx);
        sink.send_line("?AREA,1,6\r\n");
    }
}
