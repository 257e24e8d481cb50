//! Per-run resolution context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::ResolveError;
use crate::resolve::settings::ResolutionSettings;

/// Externally owned cancellation signal.
///
/// Cloning is cheap; all clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns [`ResolveError::Cancelled`] once cancellation was requested.
    pub fn check(&self) -> Result<(), ResolveError> {
        if self.is_cancelled() {
            Err(ResolveError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a stage needs besides its inputs, scoped to one run.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub settings: &'a ResolutionSettings,
    pub cancel: &'a CancellationToken,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(settings: &'a ResolutionSettings, cancel: &'a CancellationToken) -> Self {
        Self { settings, cancel }
    }

    /// Applies `f` to every item, on the rayon pool when parallel resolution
    /// is enabled.
    ///
    /// Cancellation is checked before each item. Results keep the order of
    /// `items` either way.
    pub fn map_each<T, R, F>(&self, items: &[T], f: F) -> Result<Vec<R>, ResolveError>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        if self.settings.parallel {
            items
                .par_iter()
                .map(|item| {
                    self.cancel.check()?;
                    Ok(f(item))
                })
                .collect()
        } else {
            items
                .iter()
                .map(|item| {
                    self.cancel.check()?;
                    Ok(f(item))
                })
                .collect()
        }
    }
}
