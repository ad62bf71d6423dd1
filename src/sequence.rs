//! Output sequences of compiled artifacts.

use std::fmt;

use crate::compiler::InvocationError;

enum Inner<'a, T> {
    Lazy(Box<dyn Iterator<Item = Result<T, InvocationError>> + 'a>),
    Materialized(std::vec::IntoIter<T>),
}

/// Results of running a compiled artifact over a source.
///
/// A lazy sequence computes each item as it is pulled, so invocation failures
/// surface per item. A materialized sequence was fully computed when it was
/// built; any failure was already reported at that point.
pub struct Sequence<'a, T> {
    inner: Inner<'a, T>,
}

impl<'a, T: 'a> Sequence<'a, T> {
    /// Wrap `items`, collecting them first when `materialize` is set.
    pub fn build<I>(items: I, materialize: bool) -> Result<Self, InvocationError>
    where
        I: Iterator<Item = Result<T, InvocationError>> + 'a,
    {
        let inner = if materialize {
            Inner::Materialized(items.collect::<Result<Vec<T>, _>>()?.into_iter())
        } else {
            Inner::Lazy(Box::new(items))
        };
        Ok(Sequence { inner })
    }

    pub fn materialized(items: Vec<T>) -> Self {
        Sequence {
            inner: Inner::Materialized(items.into_iter()),
        }
    }

    pub fn is_materialized(&self) -> bool {
        matches!(self.inner, Inner::Materialized(_))
    }

    /// Remaining items of a materialized sequence.
    pub fn as_slice(&self) -> Option<&[T]> {
        match &self.inner {
            Inner::Materialized(items) => Some(items.as_slice()),
            Inner::Lazy(_) => None,
        }
    }

    /// Transform every item, preserving laziness.
    pub fn map_items<U, F>(self, f: F) -> Sequence<'a, U>
    where
        U: 'a,
        F: Fn(T) -> U + 'a,
    {
        match self.inner {
            Inner::Lazy(items) => Sequence {
                inner: Inner::Lazy(Box::new(items.map(move |item| item.map(&f)))),
            },
            Inner::Materialized(items) => Sequence::materialized(items.map(f).collect()),
        }
    }

    /// Drain into a vector, stopping at the first failure.
    pub fn into_vec(self) -> Result<Vec<T>, InvocationError> {
        self.collect()
    }
}

impl<T> Iterator for Sequence<'_, T> {
    type Item = Result<T, InvocationError>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Lazy(items) => items.next(),
            Inner::Materialized(items) => items.next().map(Ok),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            Inner::Lazy(items) => items.size_hint(),
            Inner::Materialized(items) => items.size_hint(),
        }
    }
}

impl<T> fmt::Debug for Sequence<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Lazy(_) => f.write_str("Sequence::Lazy"),
            Inner::Materialized(items) => write!(f, "Sequence::Materialized({})", items.len()),
        }
    }
}
