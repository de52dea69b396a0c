//! Compute-once cell shared by the handlers of one accrual pass.

use std::cell::Cell;

use once_cell::unsync::OnceCell;

/// Defers `init` until the first [`Lazy::get`] and hands out the cached result afterwards.
///
/// A fallible computation is expressed with `T = Result<_, _>`: the failure is cached like a
/// success and [`Lazy::try_get`] exposes it. The cell is neither `Sync` nor re-entrant.
pub struct Lazy<T, F> {
    value: OnceCell<T>,
    init: Cell<Option<F>>,
}

impl<T, F> Lazy<T, F>
where
    F: FnOnce() -> T,
{
    pub fn new(init: F) -> Self {
        Self {
            value: OnceCell::new(),
            init: Cell::new(Some(init)),
        }
    }

    pub fn get(&self) -> &T {
        self.value.get_or_init(|| match self.init.take() {
            Some(init) => init(),
            None => panic!("Lazy value is evaluated re-entrantly."),
        })
    }

    pub fn is_evaluated(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T, E, F> Lazy<Result<T, E>, F>
where
    F: FnOnce() -> Result<T, E>,
{
    pub fn try_get(&self) -> Result<&T, &E> {
        self.get().as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluates_once() {
        let calls = Cell::new(0);
        let lazy = Lazy::new(|| {
            calls.set(calls.get() + 1);
            vec![1, 2, 3]
        });
        assert!(!lazy.is_evaluated());
        assert_eq!(calls.get(), 0);

        assert_eq!(lazy.get(), &vec![1, 2, 3]);
        assert_eq!(lazy.get().len(), 3);
        assert!(lazy.is_evaluated());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failure_is_cached() {
        let calls = Cell::new(0);
        let lazy = Lazy::new(|| -> Result<u32, String> {
            calls.set(calls.get() + 1);
            Err("platform unreachable".to_owned())
        });
        assert_eq!(lazy.try_get(), Err(&"platform unreachable".to_owned()));
        assert!(lazy.try_get().is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn never_evaluated_when_unused() {
        let lazy = Lazy::new(|| -> u32 { panic!("must not run") });
        assert!(!lazy.is_evaluated());
    }
}
