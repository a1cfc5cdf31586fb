//! Drains a request's reply channel into a single response.

use crate::error::{Error, Result};
use crate::request::ATTRIBUTES_KEY;

use courier_core::{AttributesCodec, Message};
use courier_transport::{Reply, ReplyChannel, Sample};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Which reply becomes the response when several valid ones arrive.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPolicy {
    /// Each valid reply replaces the previous one.
    #[default]
    LastValid,

    /// The first valid reply is kept and later ones are logged and dropped.
    FirstValid,
}

/// How reply anomalies reach the caller.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Anomalies are logged and the caller receives an empty message when
    /// nothing usable arrived.
    #[default]
    Lenient,

    /// Error replies and empty drains resolve to an error.
    Strict,
}

/// Collects the replies to one request.
#[derive(Clone, Debug)]
pub struct ReplyCollector<C> {
    codec: C,
    policy: ReplyPolicy,
    mode: FailureMode,
    request_id: Uuid,
}

impl<C> ReplyCollector<C>
where
    C: AttributesCodec,
{
    /// Creates a collector for the request identified by `request_id`.
    pub const fn new(codec: C, policy: ReplyPolicy, mode: FailureMode, request_id: Uuid) -> Self {
        Self {
            codec,
            policy,
            mode,
            request_id,
        }
    }

    /// Drains `channel` until it closes or an error reply arrives.
    ///
    /// # Errors
    ///
    /// Only in [`FailureMode::Strict`]: [`Error::ReplyError`] if an error reply
    /// arrived, otherwise the last reply anomaly or [`Error::NoReply`] if no
    /// valid reply arrived.
    pub async fn collect(self, channel: ReplyChannel) -> Result<Message> {
        let mut captured: Option<Message> = None;
        let mut anomaly: Option<Error> = None;
        let mut reply_error: Option<Error> = None;
        let mut received = 0usize;

        while let Some(reply) = channel.recv().await {
            received += 1;

            let sample = match reply {
                Reply::Ok(sample) => sample,
                Reply::Err(reply) => {
                    error!(
                        "request {} received error reply: {}",
                        self.request_id,
                        reply.message()
                    );
                    reply_error = Some(Error::ReplyError(reply.message()));
                    break;
                }
            };

            let message = match self.decode(sample) {
                Ok(message) => message,
                Err(e) => {
                    warn!("request {} discarding reply: {}", self.request_id, e);
                    anomaly = Some(e);
                    continue;
                }
            };

            if self.policy == ReplyPolicy::FirstValid && captured.is_some() {
                warn!(
                    "request {} received more than one valid reply, ignoring reply {}",
                    self.request_id, message.attributes.id
                );
                continue;
            }

            captured = Some(message);
        }

        drop(channel);
        debug!("request {} done after {} replies", self.request_id, received);

        match self.mode {
            FailureMode::Lenient => Ok(captured.unwrap_or_default()),
            FailureMode::Strict => match (reply_error, captured) {
                (Some(e), _) => Err(e),
                (None, Some(message)) => Ok(message),
                (None, None) => Err(anomaly.unwrap_or(Error::NoReply)),
            },
        }
    }

    fn decode(&self, sample: Sample) -> Result<Message> {
        if sample.payload.is_empty() {
            return Err(Error::PayloadMissing);
        }

        let metadata = sample
            .attachment
            .as_ref()
            .and_then(|attachment| attachment.get(ATTRIBUTES_KEY))
            .filter(|metadata| !metadata.is_empty())
            .ok_or(Error::AttachmentMissing)?;

        let attributes = self
            .codec
            .decode(metadata)
            .map_err(Error::AttributesParseFailure)?;

        Ok(Message::new(sample.payload, attributes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{error_reply, raw_reply, valid_reply};

    use bytes::Bytes;
    use courier_core::{Attributes, CborCodec, Priority};
    use courier_transport::{Attachment, reply_fifo};
    use tracing_test::traced_test;

    fn collector(policy: ReplyPolicy, mode: FailureMode) -> ReplyCollector<CborCodec> {
        ReplyCollector::new(CborCodec, policy, mode, Uuid::now_v7())
    }

    async fn collect(
        replies: Vec<Reply>,
        policy: ReplyPolicy,
        mode: FailureMode,
    ) -> Result<Message> {
        let (sender, channel) = reply_fifo(replies.len().max(1)).unwrap();
        for reply in replies {
            sender.send(reply).await.unwrap();
        }
        drop(sender);

        collector(policy, mode).collect(channel).await
    }

    fn response(priority: Priority) -> Attributes {
        Attributes::response(Uuid::now_v7(), priority).build()
    }

    #[tokio::test]
    async fn test_single_valid_reply() {
        let attributes = response(Priority::CS4);

        let message = collect(
            vec![valid_reply(b"door open", &attributes)],
            ReplyPolicy::LastValid,
            FailureMode::Lenient,
        )
        .await
        .unwrap();

        assert_eq!(message.payload, Bytes::from_static(b"door open"));
        assert_eq!(message.attributes, attributes);
    }

    #[tokio::test]
    async fn test_last_valid_reply_wins() {
        let first = response(Priority::CS4);
        let second = response(Priority::CS6);

        let message = collect(
            vec![valid_reply(b"first", &first), valid_reply(b"second", &second)],
            ReplyPolicy::LastValid,
            FailureMode::Lenient,
        )
        .await
        .unwrap();

        assert_eq!(message.payload, Bytes::from_static(b"second"));
        assert_eq!(message.attributes, second);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_first_valid_reply_kept() {
        let first = response(Priority::CS4);
        let second = response(Priority::CS6);

        let message = collect(
            vec![valid_reply(b"first", &first), valid_reply(b"second", &second)],
            ReplyPolicy::FirstValid,
            FailureMode::Lenient,
        )
        .await
        .unwrap();

        assert_eq!(message.payload, Bytes::from_static(b"first"));
        assert!(logs_contain("more than one valid reply"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_missing_attachment_yields_empty_message() {
        let message = collect(
            vec![raw_reply(b"payload", None)],
            ReplyPolicy::LastValid,
            FailureMode::Lenient,
        )
        .await
        .unwrap();

        assert!(message.is_empty());
        assert!(logs_contain("reply carried no attributes attachment"));
    }

    #[tokio::test]
    async fn test_anomaly_does_not_stop_draining() {
        let attributes = response(Priority::CS5);

        let message = collect(
            vec![
                raw_reply(b"", None),
                raw_reply(b"garbage", Some(Attachment::new())),
                valid_reply(b"good", &attributes),
            ],
            ReplyPolicy::LastValid,
            FailureMode::Strict,
        )
        .await
        .unwrap();

        assert_eq!(message.payload, Bytes::from_static(b"good"));
    }

    #[tokio::test]
    async fn test_invalid_reply_keeps_earlier_capture() {
        let attributes = response(Priority::CS4);

        let message = collect(
            vec![valid_reply(b"good", &attributes), raw_reply(b"late", None)],
            ReplyPolicy::LastValid,
            FailureMode::Lenient,
        )
        .await
        .unwrap();

        assert_eq!(message.payload, Bytes::from_static(b"good"));
    }

    #[tokio::test]
    async fn test_strict_mode_errors() {
        assert!(matches!(
            collect(vec![], ReplyPolicy::LastValid, FailureMode::Strict).await,
            Err(Error::NoReply)
        ));
        assert!(matches!(
            collect(
                vec![raw_reply(b"payload", None)],
                ReplyPolicy::LastValid,
                FailureMode::Strict
            )
            .await,
            Err(Error::AttachmentMissing)
        ));
        assert!(matches!(
            collect(
                vec![raw_reply(b"", None)],
                ReplyPolicy::LastValid,
                FailureMode::Strict
            )
            .await,
            Err(Error::PayloadMissing)
        ));

        let corrupt: Attachment = [(ATTRIBUTES_KEY, Bytes::from_static(b"\xff\x00"))]
            .into_iter()
            .collect();
        assert!(matches!(
            collect(
                vec![raw_reply(b"payload", Some(corrupt))],
                ReplyPolicy::LastValid,
                FailureMode::Strict
            )
            .await,
            Err(Error::AttributesParseFailure(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_error_reply_stops_collection() {
        let attributes = response(Priority::CS4);
        let replies = || {
            vec![
                error_reply("responder crashed"),
                valid_reply(b"ignored", &attributes),
            ]
        };

        let lenient = collect(replies(), ReplyPolicy::LastValid, FailureMode::Lenient)
            .await
            .unwrap();
        assert!(lenient.is_empty());
        assert!(logs_contain("responder crashed"));

        match collect(replies(), ReplyPolicy::LastValid, FailureMode::Strict).await {
            Err(Error::ReplyError(message)) => assert_eq!(message, "responder crashed"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
