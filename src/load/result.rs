use crate::error::{ErrorKind, SessionError};

/// Tri-state value published for a slot.
///
/// A load starts as `Pending` and settles exactly once into `Success` or
/// `Failure`, unless a newer load on the same slot supersedes it first.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultModel<T> {
    Pending,
    Success(T),
    Failure(ErrorKind, Option<String>),
}

impl<T> ResultModel<T> {
    /// Failure carrying the error's kind and its message as detail.
    pub fn from_error(error: &SessionError) -> Self {
        Self::Failure(error.kind(), Some(error.to_string()))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// `Success` or `Failure`.
    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Failure(kind, _) => Some(*kind),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResultModel<U> {
        match self {
            Self::Pending => ResultModel::Pending,
            Self::Success(value) => ResultModel::Success(f(value)),
            Self::Failure(kind, detail) => ResultModel::Failure(kind, detail),
        }
    }
}

impl<T> From<Result<T, SessionError>> for ResultModel<T> {
    fn from(result: Result<T, SessionError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(error) => Self::from_error(&error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_keeps_kind_and_message() {
        let model: ResultModel<()> = ResultModel::from_error(&SessionError::http(404, "no sitter"));
        assert_eq!(model.error_kind(), Some(ErrorKind::NotFound));
        assert!(model.is_terminal());
        match model {
            ResultModel::Failure(_, Some(detail)) => assert!(detail.contains("no sitter")),
            other => panic!("expected failure with detail, got {other:?}"),
        }
    }

    #[test]
    fn map_preserves_state() {
        assert_eq!(ResultModel::Success(2).map(|n| n * 10), ResultModel::Success(20));
        assert_eq!(
            ResultModel::<i32>::Pending.map(|n| n * 10),
            ResultModel::Pending
        );
    }
}
