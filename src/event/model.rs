//! Event and task records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EventError, ParamError};
use crate::event::EventStatus;
use crate::params::ParamBag;

/// A timestamped, provenance-carrying record of a significant happening.
///
/// The id is assigned once at creation and the provenance fields are
/// write-once, so everything is kept private behind getters. Status only
/// moves through [`transition_to`](Self::transition_to).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    id: Uuid,
    status: EventStatus,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
    associated_user: Option<String>,
    used_resource: Option<String>,
    caused_by: Option<Uuid>,
    failure_cause: Option<String>,
}

impl Event {
    /// Create a fresh event in status `NEW` with `started_at = now`.
    pub fn new(user: Option<String>, resource: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: EventStatus::New,
            started_at: Utc::now(),
            ended_at: None,
            associated_user: user,
            used_resource: resource,
            caused_by: None,
            failure_cause: None,
        }
    }

    /// Link this event to the prior event that caused it.
    pub fn with_cause(mut self, cause: Uuid) -> Self {
        self.caused_by = Some(cause);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Set once the event reaches `COMPLETE` or `FAIL`.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn associated_user(&self) -> Option<&str> {
        self.associated_user.as_deref()
    }

    pub fn used_resource(&self) -> Option<&str> {
        self.used_resource.as_deref()
    }

    pub fn caused_by(&self) -> Option<Uuid> {
        self.caused_by
    }

    /// Why the event failed, when it did.
    pub fn failure_cause(&self) -> Option<&str> {
        self.failure_cause.as_deref()
    }

    /// Move to `target`, stamping `ended_at` on entering a terminal status.
    pub fn transition_to(&mut self, target: EventStatus) -> Result<(), EventError> {
        if !self.status.can_transition_to(target) {
            return Err(EventError::InvalidTransition {
                id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        if target.is_terminal() {
            self.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    pub(crate) fn record_failure_cause(&mut self, cause: impl Into<String>) {
        if self.failure_cause.is_none() {
            self.failure_cause = Some(cause.into());
        }
    }

    /// Rebuild an event from stored columns.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_stored(
        id: Uuid,
        status: EventStatus,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
        associated_user: Option<String>,
        used_resource: Option<String>,
        caused_by: Option<Uuid>,
        failure_cause: Option<String>,
    ) -> Self {
        Self {
            id,
            status,
            started_at,
            ended_at,
            associated_user,
            used_resource,
            caused_by,
            failure_cause,
        }
    }
}

/// A unit of asynchronous work: an [`Event`] bound to a transformation
/// handler and a parameter bag.
///
/// Tasks are created by callers, never by the scheduler. Submission moves the
/// task into the scheduler, so after that point it is owned by exactly one
/// worker until it reaches a terminal status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    event: Event,
    transformation_id: String,
    param_blob: Option<String>,
    /// In-memory view of the parameters; rebuilt from `param_blob` on
    /// dispatch and never persisted directly.
    #[serde(skip)]
    params: ParamBag,
}

impl Task {
    /// Create a fresh task in status `NEW` targeting `transformation_id`.
    pub fn new(
        transformation_id: impl Into<String>,
        user: Option<String>,
        resource: Option<String>,
    ) -> Self {
        Self {
            event: Event::new(user, resource),
            transformation_id: transformation_id.into(),
            param_blob: None,
            params: ParamBag::new(),
        }
    }

    /// Link this task to the prior event that caused it.
    pub fn with_cause(mut self, cause: Uuid) -> Self {
        self.event = self.event.with_cause(cause);
        self
    }

    pub fn id(&self) -> Uuid {
        self.event.id()
    }

    pub fn status(&self) -> EventStatus {
        self.event.status()
    }

    pub fn transformation_id(&self) -> &str {
        &self.transformation_id
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub(crate) fn event_mut(&mut self) -> &mut Event {
        &mut self.event
    }

    /// The serialized parameter blob, present once `save_params` has run.
    pub fn param_blob(&self) -> Option<&str> {
        self.param_blob.as_deref()
    }

    /// In-memory parameters. Empty until `load_params` runs on a task that
    /// was rehydrated from storage.
    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParamBag {
        &mut self.params
    }

    /// Serialize the in-memory bag into the task's blob field.
    pub fn save_params(&mut self) -> Result<(), ParamError> {
        self.param_blob = Some(self.params.save()?);
        Ok(())
    }

    /// Rebuild the in-memory bag from the blob.
    ///
    /// A task without a blob (parameters were never saved) loads as an empty
    /// bag; a present but undecodable blob is a hard failure.
    pub fn load_params(&mut self) -> Result<(), ParamError> {
        self.params = match &self.param_blob {
            Some(blob) => ParamBag::load(blob)?,
            None => ParamBag::new(),
        };
        Ok(())
    }

    /// Rebuild a task from stored columns. The parameter bag stays empty
    /// until `load_params` runs.
    pub(crate) fn from_stored(
        event: Event,
        transformation_id: String,
        param_blob: Option<String>,
    ) -> Self {
        Self {
            event,
            transformation_id,
            param_blob,
            params: ParamBag::new(),
        }
    }
}
