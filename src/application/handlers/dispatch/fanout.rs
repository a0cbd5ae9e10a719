//! Best-effort delivery of one frame to a recipient snapshot.

use serde::Serialize;

use crate::domain::dispatch::OutboundMessage;
use crate::ports::{ConnectionHandle, SendOutcome};

/// Tally of a fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    /// Recipients in the snapshot.
    pub attempted: usize,
    /// Frames accepted into an outbound queue.
    pub queued: usize,
    /// Frames dropped because a queue was full or closed.
    pub dropped: usize,
}

/// Encodes `message` once and offers it to every recipient.
///
/// Never waits: a full or closed queue drops the frame for that recipient
/// only. No retry.
pub fn deliver(message: &OutboundMessage, recipients: &[ConnectionHandle]) -> DeliveryReport {
    let mut report = DeliveryReport {
        attempted: recipients.len(),
        ..Default::default()
    };
    if recipients.is_empty() {
        return report;
    }

    let frame = message.encode();
    for recipient in recipients {
        match recipient.try_send(frame.clone()) {
            SendOutcome::Queued => report.queued += 1,
            outcome => {
                report.dropped += 1;
                tracing::debug!(
                    connection_id = %recipient.id(),
                    frame_type = message.type_tag(),
                    ?outcome,
                    "Dropped outbound frame"
                );
            }
        }
    }
    report
}

/// Sends one frame to a single connection.
pub fn reply(message: &OutboundMessage, to: &ConnectionHandle) -> SendOutcome {
    let outcome = to.try_send(message.encode());
    if outcome != SendOutcome::Queued {
        tracing::debug!(
            connection_id = %to.id(),
            frame_type = message.type_tag(),
            ?outcome,
            "Dropped reply"
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::dispatch::Handshake;
    use crate::domain::foundation::ConnectionId;

    #[tokio::test]
    async fn delivers_the_same_frame_to_every_recipient() {
        let (a, mut qa) = ConnectionHandle::new(ConnectionId::new(), Handshake::default(), 4);
        let (b, mut qb) = ConnectionHandle::new(ConnectionId::new(), Handshake::default(), 4);

        let report = deliver(&OutboundMessage::error("x"), &[a, b]);

        assert_eq!(
            report,
            DeliveryReport {
                attempted: 2,
                queued: 2,
                dropped: 0
            }
        );
        let fa = qa.frames.recv().await.unwrap();
        let fb = qb.frames.recv().await.unwrap();
        assert_eq!(fa, fb);
        assert!(fa.contains(r#""type":"error""#));
    }

    #[test]
    fn slow_or_gone_recipients_are_skipped() {
        let (full, _qf) = ConnectionHandle::new(ConnectionId::new(), Handshake::default(), 1);
        let (gone, qg) = ConnectionHandle::new(ConnectionId::new(), Handshake::default(), 1);
        let (ok, _qo) = ConnectionHandle::new(ConnectionId::new(), Handshake::default(), 1);
        full.try_send("filler".into());
        drop(qg);

        let report = deliver(&OutboundMessage::error("x"), &[full, gone, ok]);

        assert_eq!(report.attempted, 3);
        assert_eq!(report.queued, 1);
        assert_eq!(report.dropped, 2);
    }

    #[test]
    fn empty_snapshot_is_a_noop() {
        assert_eq!(deliver(&OutboundMessage::error("x"), &[]), DeliveryReport::default());
    }
}
