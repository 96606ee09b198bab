//! Ergonomic testing utilities for read models
//!
//! This module provides a fluent API for testing folds with readable Given-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReadModelTest is the natural name

use crate::event_log_mocks::EventBuilder;
use readmodel_core::event::{Position, StoredEvent};
use readmodel_core::read_model::{ReadModel, reduce};
use readmodel_core::error::ReduceError;

/// Type alias for model assertion functions
type ModelAssertion<M> = Box<dyn FnOnce(&M)>;

/// Type alias for error assertion functions
type ErrorAssertion = Box<dyn FnOnce(&ReduceError)>;

/// Fluent API for testing read models with Given-Then syntax
///
/// Events given as builders get consecutive positions starting after the
/// highest position already given.
///
/// # Example
///
/// ```ignore
/// use readmodel_testing::{EventBuilder, ReadModelTest};
///
/// ReadModelTest::new(AccessTokenReadModel::new("instance-1", "V2_s1"))
///     .given_events([
///         EventBuilder::new("V2_s1", &added),
///         EventBuilder::new("V2_s1", &access_token_added),
///     ])
///     .then_model(|model| {
///         assert_eq!(model.access_token_id.as_deref(), Some("at-1"));
///     })
///     .run();
/// ```
pub struct ReadModelTest<M: ReadModel> {
    model: M,
    events: Vec<StoredEvent>,
    next_position: Position,
    model_assertions: Vec<ModelAssertion<M>>,
    error_assertions: Vec<ErrorAssertion>,
}

impl<M: ReadModel> ReadModelTest<M> {
    /// Create a new test folding into `model`
    #[must_use]
    pub fn new(model: M) -> Self {
        let next_position = model.base().position().unwrap_or_default().next();
        Self {
            model,
            events: Vec::new(),
            next_position,
            model_assertions: Vec::new(),
            error_assertions: Vec::new(),
        }
    }

    /// Append events at consecutive positions (Given)
    #[must_use]
    pub fn given_events(mut self, events: impl IntoIterator<Item = EventBuilder>) -> Self {
        for event in events {
            let position = self.next_position;
            self.next_position = position.next();
            self.events.push(event.build(position));
        }
        self
    }

    /// Append an event at an explicit position (Given)
    #[must_use]
    pub fn given_event_at(mut self, position: u64, event: EventBuilder) -> Self {
        let position = Position::new(position);
        self.next_position = self.next_position.max(position.next());
        self.events.push(event.build(position));
        self
    }

    /// Add an assertion about the folded model (Then)
    #[must_use]
    pub fn then_model<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&M) + 'static,
    {
        self.model_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the fold to fail and assert on the error (Then)
    #[must_use]
    pub fn then_error<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&ReduceError) + 'static,
    {
        self.error_assertions.push(Box::new(assertion));
        self
    }

    /// Run the fold and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if the fold fails while model assertions are registered, if it
    /// succeeds while error assertions are registered, or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    pub fn run(self) {
        match reduce(self.model, self.events) {
            Ok(model) => {
                assert!(
                    self.error_assertions.is_empty(),
                    "Expected the fold to fail, but it succeeded"
                );
                for assertion in self.model_assertions {
                    assertion(&model);
                }
            }
            Err(error) => {
                assert!(
                    self.model_assertions.is_empty(),
                    "Expected the fold to succeed, but it failed: {error}"
                );
                for assertion in self.error_assertions {
                    assertion(&error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use readmodel_core::event::{Event, EventError, EventMeta};
    use readmodel_core::read_model::ReadModelBase;
    use readmodel_core::search::{FilterClause, SearchQuery};
    use readmodel_events::instance::{Added, PrimaryDomainSet};

    #[derive(Debug)]
    enum InstanceEvent {
        Added(Added),
        PrimaryDomainSet(PrimaryDomainSet),
    }

    impl Event for InstanceEvent {
        fn decode(event: &StoredEvent) -> Result<Self, EventError> {
            match event.event_type() {
                "instance.added" => Ok(Self::Added(event.payload()?)),
                "instance.domain.primary.set" => Ok(Self::PrimaryDomainSet(event.payload()?)),
                other => Err(EventError::UnknownEventType(other.to_string())),
            }
        }

        fn event_type(&self) -> &'static str {
            match self {
                Self::Added(_) => "instance.added",
                Self::PrimaryDomainSet(_) => "instance.domain.primary.set",
            }
        }
    }

    #[derive(Debug)]
    struct DomainModel {
        base: ReadModelBase,
        domain: Option<String>,
    }

    impl ReadModel for DomainModel {
        type Event = InstanceEvent;
        const REQUIRES_CREATION: bool = true;

        fn query(&self) -> SearchQuery {
            SearchQuery::new(self.base.instance_id()).clause(FilterClause::aggregate("instance"))
        }

        fn base(&self) -> &ReadModelBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ReadModelBase {
            &mut self.base
        }

        fn apply(&mut self, _meta: &EventMeta, event: InstanceEvent) -> Result<(), ReduceError> {
            if let InstanceEvent::PrimaryDomainSet(set) = event {
                self.domain = Some(set.domain);
            }
            Ok(())
        }

        fn is_creation_event(event: &InstanceEvent) -> bool {
            matches!(event, InstanceEvent::Added(_))
        }
    }

    fn model() -> DomainModel {
        DomainModel {
            base: ReadModelBase::new("instance-1", "instance-1"),
            domain: None,
        }
    }

    #[test]
    fn test_folds_given_events() {
        ReadModelTest::new(model())
            .given_events([
                EventBuilder::new("instance-1", &Added { name: "acme".to_string() }),
                EventBuilder::new(
                    "instance-1",
                    &PrimaryDomainSet {
                        domain: "acme.example".to_string(),
                    },
                ),
            ])
            .then_model(|model| {
                assert_eq!(model.domain.as_deref(), Some("acme.example"));
                assert_eq!(model.base().position(), Some(Position::new(2)));
            })
            .run();
    }

    #[test]
    fn test_missing_creation_is_error() {
        ReadModelTest::new(model())
            .given_events([EventBuilder::new(
                "instance-1",
                &PrimaryDomainSet {
                    domain: "acme.example".to_string(),
                },
            )])
            .then_error(|error| assert_eq!(*error, ReduceError::NotFound))
            .run();
    }

    #[test]
    fn test_explicit_positions() {
        ReadModelTest::new(model())
            .given_event_at(10, EventBuilder::new("instance-1", &Added { name: "acme".to_string() }))
            .given_events([EventBuilder::new(
                "instance-1",
                &PrimaryDomainSet {
                    domain: "acme.example".to_string(),
                },
            )])
            .then_model(|model| assert_eq!(model.base().position(), Some(Position::new(11))))
            .run();
    }
}
