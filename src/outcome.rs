//! Aggregation of results from concurrent install phases.
//!
//! Every phase produces an [`Outcome`]. Outcomes from independent tasks are
//! folded with [`Outcome::reduce`] (or `collect`) into one flat, ordered list
//! of errors. Absent errors are dropped at every level, and a run where
//! nothing failed is always `Outcome::Ok`, never an empty failure list.

use crate::error::DevboxError;
use tokio::sync::mpsc::Receiver;

#[derive(Debug, Default)]
pub enum Outcome {
    #[default]
    Ok,
    /// Always holds at least one error.
    Failed(Vec<DevboxError>),
}

impl Outcome {
    /// Build an outcome from a list of errors, collapsing an empty list to `Ok`.
    pub fn from_errors(errors: Vec<DevboxError>) -> Self {
        if errors.is_empty() {
            Self::Ok
        } else {
            Self::Failed(errors)
        }
    }

    /// Flatten any number of outcomes, keeping iteration order.
    pub fn reduce<I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Outcome>,
    {
        let mut errors = Vec::new();
        for outcome in outcomes {
            if let Self::Failed(mut failed) = outcome {
                errors.append(&mut failed);
            }
        }
        Self::from_errors(errors)
    }

    /// Drain a channel of outcomes until every sender is gone.
    ///
    /// Blocks until the channel is closed, so callers must drop their own
    /// sender before awaiting this.
    pub async fn drain(mut receiver: Receiver<Outcome>) -> Self {
        let mut errors = Vec::new();
        while let Some(outcome) = receiver.recv().await {
            errors.extend(outcome.into_errors().unwrap_or_default());
        }
        Self::from_errors(errors)
    }

    /// Append another outcome after this one.
    pub fn merge(self, other: Outcome) -> Self {
        Self::reduce([self, other])
    }

    pub fn push(&mut self, error: DevboxError) {
        match self {
            Self::Ok => *self = Self::Failed(vec![error]),
            Self::Failed(errors) => errors.push(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Ok => 0,
            Self::Failed(errors) => errors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_ok()
    }

    pub fn errors(&self) -> &[DevboxError] {
        match self {
            Self::Ok => &[],
            Self::Failed(errors) => errors,
        }
    }

    /// `None` when nothing failed.
    pub fn into_errors(self) -> Option<Vec<DevboxError>> {
        match self {
            Self::Ok => None,
            Self::Failed(errors) => Some(errors),
        }
    }
}

impl From<DevboxError> for Outcome {
    fn from(error: DevboxError) -> Self {
        Self::Failed(vec![error])
    }
}

impl From<Option<DevboxError>> for Outcome {
    fn from(error: Option<DevboxError>) -> Self {
        error.map_or(Self::Ok, Self::from)
    }
}

impl From<Vec<DevboxError>> for Outcome {
    fn from(errors: Vec<DevboxError>) -> Self {
        Self::from_errors(errors)
    }
}

impl From<Vec<Option<DevboxError>>> for Outcome {
    fn from(errors: Vec<Option<DevboxError>>) -> Self {
        Self::from_errors(errors.into_iter().flatten().collect())
    }
}

impl From<Result<(), DevboxError>> for Outcome {
    fn from(result: Result<(), DevboxError>) -> Self {
        result.err().into()
    }
}

impl FromIterator<Outcome> for Outcome {
    fn from_iter<I: IntoIterator<Item = Outcome>>(iter: I) -> Self {
        Self::reduce(iter)
    }
}

impl IntoIterator for Outcome {
    type Item = DevboxError;
    type IntoIter = std::vec::IntoIter<DevboxError>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_errors().unwrap_or_default().into_iter()
    }
}
