use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::path::NodePath;
use crate::shell::{Shell, ShellError};

/// Scoped working directory change returned by [`Shell::managed_cd`].
///
/// Derefs to the shell. The previous working directory is restored by
/// [`ManagedCd::finish`] or, failing that, when the guard is dropped. A
/// restore that fails on drop is logged since it cannot be returned.
pub struct ManagedCd<'a, D, M> {
    shell: &'a mut Shell<D, M>,
    previous: Option<NodePath>,
}

impl<'a, D, M> ManagedCd<'a, D, M> {
    pub(crate) fn new(shell: &'a mut Shell<D, M>, previous: NodePath) -> Self {
        Self {
            shell,
            previous: Some(previous),
        }
    }

    /// Directory that will be restored.
    pub fn previous(&self) -> Option<&NodePath> {
        self.previous.as_ref()
    }

    /// Changes back now and reports whether that worked.
    pub fn finish(mut self) -> Result<(), ShellError> {
        self.restore()
    }

    fn restore(&mut self) -> Result<(), ShellError> {
        let Some(previous) = self.previous.take() else {
            return Ok(());
        };
        debug!("Restoring working directory {}", previous);
        self.shell.cd(&previous)
    }
}

impl<D, M> Deref for ManagedCd<'_, D, M> {
    type Target = Shell<D, M>;

    fn deref(&self) -> &Self::Target {
        &*self.shell
    }
}

impl<D, M> DerefMut for ManagedCd<'_, D, M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.shell
    }
}

impl<D, M> Drop for ManagedCd<'_, D, M> {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            warn!("Could not restore the working directory: {}", err);
        }
    }
}
