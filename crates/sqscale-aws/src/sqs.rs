//! SQS-backed [`QueueDepthSource`].

use std::collections::HashMap;

use aws_config::SdkConfig;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::QueueAttributeName;
use tracing::trace;

use sqscale_core::{BoxFuture, QueueDepthSource, SourceError, SourceResult};

/// Reads `ApproximateNumberOfMessages` for a queue URL.
#[derive(Debug, Clone)]
pub struct SqsQueueDepth {
    client: Client,
}

impl SqsQueueDepth {
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl QueueDepthSource for SqsQueueDepth {
    fn approximate_visible_messages<'a>(
        &'a self,
        queue: &'a str,
    ) -> BoxFuture<'a, SourceResult<u64>> {
        Box::pin(async move {
            let output = self
                .client
                .get_queue_attributes()
                .queue_url(queue)
                .attribute_names(QueueAttributeName::ApproximateNumberOfMessages)
                .send()
                .await
                .map_err(|e| SourceError::request("sqs", DisplayErrorContext(&e).to_string()))?;

            let visible = visible_messages(output.attributes())?;
            trace!(queue, visible, "sqs queue attributes");
            Ok(visible)
        })
    }
}

fn visible_messages(attributes: Option<&HashMap<QueueAttributeName, String>>) -> SourceResult<u64> {
    let raw = attributes
        .and_then(|attrs| attrs.get(&QueueAttributeName::ApproximateNumberOfMessages))
        .ok_or_else(|| SourceError::Malformed {
            what: "ApproximateNumberOfMessages",
            value: "<missing>".to_string(),
        })?;

    raw.trim().parse::<u64>().map_err(|_| SourceError::Malformed {
        what: "ApproximateNumberOfMessages",
        value: raw.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(value: &str) -> HashMap<QueueAttributeName, String> {
        HashMap::from([(
            QueueAttributeName::ApproximateNumberOfMessages,
            value.to_string(),
        )])
    }

    #[test]
    fn parses_count() {
        assert_eq!(visible_messages(Some(&attrs("1234"))).unwrap(), 1234);
        assert_eq!(visible_messages(Some(&attrs("0"))).unwrap(), 0);
    }

    #[test]
    fn missing_attribute_is_malformed() {
        let err = visible_messages(None).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));

        let other = HashMap::from([(
            QueueAttributeName::ApproximateNumberOfMessagesNotVisible,
            "3".to_string(),
        )]);
        assert!(visible_messages(Some(&other)).is_err());
    }

    #[test]
    fn non_integer_is_malformed() {
        for bad in ["", "-1", "12.5", "lots"] {
            let err = visible_messages(Some(&attrs(bad))).unwrap_err();
            match err {
                SourceError::Malformed { value, .. } => assert_eq!(value, bad),
                other => panic!("expected Malformed, got {other:?}"),
            }
        }
    }
}
