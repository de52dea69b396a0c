use thiserror::Error;
use uuid::Uuid;

pub type BillingResult<T> = Result<T, BillingException>;

#[derive(Error, Debug)]
pub enum BillingException {
    #[error("Instance: {instance_id} has no billing plan.")]
    NoBillingPlan { instance_id: Uuid },

    #[error("Instance: {instance_id} is billed by a static plan but has no product selected.")]
    NoProductSelected { instance_id: Uuid },

    #[error("There is no product: {product} in plan: {plan_id}.")]
    NoSuchProduct { plan_id: Uuid, product: String },

    #[error("There is no handler for resource: {key}.")]
    UnknownResource { key: String },

    #[error("Billing period of {target} must be positive, but it is {period}.")]
    InvalidPeriod { target: String, period: i64 },

    #[error("Billing window of {target} starting at {last} with period {period} overflows.")]
    PeriodOverflow {
        target: String,
        last: i64,
        period: i64,
    },

    #[error("Watermark {key} holds {value}, which is not a unix timestamp.")]
    MalformedWatermark { key: String, value: String },

    #[error("VM descriptor of instance: {instance_id} is unavailable: {source}")]
    VmUnavailable {
        instance_id: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error("Publishing {what} of instance: {instance_id} failed: {source}")]
    Publish {
        instance_id: Uuid,
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Billing internal error: {source}")]
    InternalError {
        #[source]
        source: anyhow::Error,
    },
}

impl BillingException {
    /// Configuration errors are recovered locally: the handler is skipped and the others go on.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BillingException::NoBillingPlan { .. }
                | BillingException::NoProductSelected { .. }
                | BillingException::NoSuchProduct { .. }
                | BillingException::UnknownResource { .. }
                | BillingException::InvalidPeriod { .. }
                | BillingException::PeriodOverflow { .. }
                | BillingException::MalformedWatermark { .. }
        )
    }
}

impl From<anyhow::Error> for BillingException {
    fn from(e: anyhow::Error) -> Self {
        BillingException::InternalError { source: e }
    }
}
