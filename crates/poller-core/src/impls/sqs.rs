//! SqsQueueClient - Amazon SQS を QueueClient として使う
//!
//! SDK errors are flattened into [`QueueError`]. Name resolution failures
//! only show up deep inside a dispatch failure's source chain, so the chain
//! is walked and matched on the resolver's wording.

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::Client;
use aws_sdk_sqs::config::{Credentials, Region};
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sqs::operation::get_queue_url::{GetQueueUrlError, GetQueueUrlOutput};
use tracing::{debug, warn};

use crate::config::AwsConfig;
use crate::domain::{Message, QueueError, QueueHandle, ReceiptHandle};
use crate::ports::QueueClient;

const QUEUE_DOES_NOT_EXIST: [&str; 2] = ["AWS.SimpleQueueService.NonExistentQueue", "QueueDoesNotExist"];

/// Resolver wording for "this host name does not resolve" across platforms.
const RESOLUTION_MARKERS: [&str; 5] = [
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "no such host",
];

#[derive(Clone)]
pub struct SqsQueueClient {
    client: Client,
    region: String,
}

impl SqsQueueClient {
    pub fn new(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }

    /// Build an SQS client from the `[aws]` config section.
    ///
    /// Static credentials are used when both key and secret are set,
    /// otherwise the default provider chain (env, profile, instance role).
    pub async fn from_config(aws: &AwsConfig) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws.region.clone()));
        if let Some((key, secret)) = aws.static_credentials() {
            loader = loader.credentials_provider(Credentials::new(key, secret, None, None, "poller-config"));
        }
        if let Some(endpoint) = &aws.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config), aws.region.clone())
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn get_queue(&self, name: &str) -> Result<Option<QueueHandle>, QueueError> {
        let result = self.client.get_queue_url().queue_name(name).send().await;
        lookup_outcome(name, &self.region, result)
    }

    async fn list_queues(&self) -> Result<Vec<QueueHandle>, QueueError> {
        let mut handles = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let out = self
                .client
                .list_queues()
                .max_results(1000)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(map_sdk_error)?;
            handles.extend(
                out.queue_urls()
                    .iter()
                    .map(|url| QueueHandle::from_url(url.as_str(), self.region.as_str())),
            );
            match out.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }
        Ok(handles)
    }

    async fn receive(
        &self,
        queue: &QueueHandle,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Vec<Message>, QueueError> {
        let out = self
            .client
            .receive_message()
            .queue_url(queue.url())
            .max_number_of_messages(to_i32("max_messages", max_messages as u64)?)
            .wait_time_seconds(to_i32("wait_time_seconds", wait_time.as_secs())?)
            .send()
            .await
            .map_err(map_sdk_error)?;

        let mut batch = Vec::new();
        for m in out.messages.unwrap_or_default() {
            let Some(receipt) = m.receipt_handle() else {
                warn!(queue = %queue, message_id = ?m.message_id(), "message without receipt handle skipped");
                continue;
            };
            let mut message = Message::new(m.body().unwrap_or_default(), ReceiptHandle::new(receipt));
            if let Some(id) = m.message_id() {
                message = message.with_id(id);
            }
            batch.push(message);
        }
        debug!(queue = %queue, count = batch.len(), "received messages from SQS");
        Ok(batch)
    }

    async fn delete(&self, queue: &QueueHandle, receipt: &ReceiptHandle) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(queue.url())
            .receipt_handle(receipt.as_str())
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }
}

/// `QueueDoesNotExist` is an answer ("no such queue"), not a failure.
fn lookup_outcome<R>(
    name: &str,
    region: &str,
    result: Result<GetQueueUrlOutput, SdkError<GetQueueUrlError, R>>,
) -> Result<Option<QueueHandle>, QueueError>
where
    R: std::fmt::Debug + 'static,
{
    match result {
        Ok(out) => Ok(out.queue_url().map(|url| QueueHandle::new(name, url, region))),
        Err(err) => {
            let missing = err.as_service_error().is_some_and(|e| {
                e.is_queue_does_not_exist()
                    || e.code().is_some_and(|code| QUEUE_DOES_NOT_EXIST.contains(&code))
            });
            if missing {
                return Ok(None);
            }
            Err(map_sdk_error(err))
        }
    }
}

fn to_i32(field: &str, value: u64) -> Result<i32, QueueError> {
    i32::try_from(value).map_err(|_| QueueError::Other(format!("{field} out of range: {value}")))
}

fn map_sdk_error<E, R>(err: SdkError<E, R>) -> QueueError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
    R: std::fmt::Debug + 'static,
{
    let detail = DisplayErrorContext(&err).to_string();
    if is_name_resolution_failure(&err) {
        return QueueError::AddressResolution(detail);
    }
    match &err {
        SdkError::ServiceError(ctx) => QueueError::service(
            ctx.err().code().unwrap_or("unknown"),
            ctx.err().message().unwrap_or("n/a"),
        ),
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_) => {
            QueueError::Transport(detail)
        }
        _ => QueueError::Other(detail),
    }
}

/// Does any error in the source chain report a failed host name lookup?
pub(crate) fn is_name_resolution_failure(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        let text = e.to_string().to_ascii_lowercase();
        if RESOLUTION_MARKERS.iter().any(|marker| text.contains(marker)) {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_sqs::error::ErrorMetadata;
    use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
    use aws_sdk_sqs::types::error::QueueDoesNotExist;
    use std::fmt;

    fn service_error<E>(err: E) -> SdkError<E, ()> {
        SdkError::service_error(err, ())
    }

    #[test]
    fn lookup_hit_builds_handle() {
        let out = GetQueueUrlOutput::builder()
            .queue_url("https://sqs.eu-west-1.amazonaws.com/123456789012/orders")
            .build();
        let result: Result<_, SdkError<GetQueueUrlError, ()>> = Ok(out);
        let handle = lookup_outcome("orders", "eu-west-1", result).unwrap().unwrap();
        assert_eq!(handle.name(), "orders");
        assert_eq!(handle.region(), "eu-west-1");
    }

    #[test]
    fn missing_queue_is_not_an_error() {
        let err = service_error(GetQueueUrlError::QueueDoesNotExist(
            QueueDoesNotExist::builder().message("gone").build(),
        ));
        assert!(matches!(lookup_outcome("orders", "eu-west-1", Err(err)), Ok(None)));
    }

    #[test]
    fn legacy_nonexistent_queue_code_is_not_an_error() {
        let err = service_error(GetQueueUrlError::generic(
            ErrorMetadata::builder()
                .code("AWS.SimpleQueueService.NonExistentQueue")
                .build(),
        ));
        assert!(matches!(lookup_outcome("orders", "eu-west-1", Err(err)), Ok(None)));
    }

    #[test]
    fn other_lookup_errors_are_reported() {
        let err = service_error(GetQueueUrlError::generic(
            ErrorMetadata::builder().code("AccessDenied").message("no").build(),
        ));
        let result = lookup_outcome("orders", "eu-west-1", Err(err));
        assert!(matches!(result, Err(QueueError::Service { code, .. }) if code == "AccessDenied"));
    }

    #[test]
    fn service_error_keeps_code_and_message() {
        let err = service_error(ReceiveMessageError::generic(
            ErrorMetadata::builder()
                .code("KmsAccessDenied")
                .message("key disabled")
                .build(),
        ));
        match map_sdk_error(err) {
            QueueError::Service { code, message } => {
                assert_eq!(code, "KmsAccessDenied");
                assert_eq!(message, "key disabled");
            }
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn timeouts_are_transport_errors() {
        let err = SdkError::<ReceiveMessageError, ()>::timeout_error(std::io::Error::other("read timed out"));
        assert!(matches!(map_sdk_error(err), QueueError::Transport(_)));
    }

    #[test]
    fn dns_failure_under_sdk_error_is_address_resolution() {
        let err = SdkError::<ReceiveMessageError, ()>::timeout_error(std::io::Error::other(
            "dns error: failed to lookup address information: Name or service not known",
        ));
        assert!(map_sdk_error(err).is_address_resolution());
    }

    #[test]
    fn out_of_range_wait_is_rejected() {
        assert_eq!(to_i32("wait_time_seconds", 20).unwrap(), 20);
        assert!(matches!(
            to_i32("wait_time_seconds", 2_147_483_648),
            Err(QueueError::Other(_))
        ));
    }

    #[derive(Debug)]
    struct Layer {
        msg: &'static str,
        source: Option<Box<Layer>>,
    }

    impl fmt::Display for Layer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.msg)
        }
    }

    impl StdError for Layer {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
        }
    }

    fn chain(msgs: &[&'static str]) -> Layer {
        let mut inner: Option<Box<Layer>> = None;
        for msg in msgs.iter().rev() {
            inner = Some(Box::new(Layer { msg: *msg, source: inner }));
        }
        *inner.unwrap()
    }

    #[test]
    fn finds_dns_error_deep_in_chain() {
        let err = chain(&[
            "dispatch failure",
            "io error",
            "client error (Connect)",
            "dns error: failed to lookup address information: Name or service not known",
        ]);
        assert!(is_name_resolution_failure(&err));
    }

    #[test]
    fn connection_refused_is_not_resolution() {
        let err = chain(&["dispatch failure", "tcp connect error: Connection refused (os error 111)"]);
        assert!(!is_name_resolution_failure(&err));
    }

    #[test]
    fn matches_macos_wording() {
        let err = chain(&["failed to lookup address information: nodename nor servname provided, or not known"]);
        assert!(is_name_resolution_failure(&err));
    }
}
