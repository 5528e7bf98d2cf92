use async_trait::async_trait;

use ecomflow_core::decode;
use ecomflow_events::{MessageRoute, resolve};

use crate::engine::Job;
use crate::jobs::publisher::MessagePublisher;

use super::{Completion, HandlerError, JobHandler};

/// Throws the route's correlated message for each job.
///
/// decode → resolve → publish; the job completes without new variables.
#[derive(Clone)]
pub struct MessageThrowHandler {
    route: &'static MessageRoute,
    publisher: MessagePublisher,
}

impl MessageThrowHandler {
    pub fn new(route: &'static MessageRoute, publisher: MessagePublisher) -> Self {
        Self { route, publisher }
    }

    pub fn route(&self) -> &'static MessageRoute {
        self.route
    }
}

#[async_trait]
impl JobHandler for MessageThrowHandler {
    async fn handle(&self, job: &Job) -> Result<Completion, HandlerError> {
        let variables = decode(&job.variables, self.route.variables_kind)?;
        let correlation = resolve(self.route.job_type, &variables)?;
        let message = correlation.into_message(job.key);

        self.publisher.publish(&message).await?;
        Ok(Completion::empty())
    }
}
