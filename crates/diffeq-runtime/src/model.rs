//! A loaded model and exclusive access to it.

use std::fmt;
use std::sync::{Mutex, PoisonError, TryLockError};

use diffeq_core::{DiffeqError, Result};
use wasmtime::Store;

use crate::capability::{Capabilities, CapabilityReport};
use crate::ledger::InstanceId;
use crate::sandbox::HostState;
use crate::session::Session;

/// Display name of the unnamed registry slot.
pub const DEFAULT_MODEL_ID: &str = "default";

/// One instantiated model module with its bound operation groups.
///
/// All calls into the module go through a [`Session`], which holds the
/// instance's store lock for its lifetime. Operations on one instance are
/// therefore strictly ordered, while separate instances run independently.
pub struct ModelInstance {
    id: Option<String>,
    instance_id: InstanceId,
    store: Mutex<Store<HostState>>,
    capabilities: Capabilities,
    report: CapabilityReport,
}

impl ModelInstance {
    pub(crate) fn new(
        id: Option<String>,
        store: Store<HostState>,
        capabilities: Capabilities,
        report: CapabilityReport,
    ) -> Self {
        Self {
            id,
            instance_id: InstanceId::next(),
            store: Mutex::new(store),
            capabilities,
            report,
        }
    }

    /// Registry id, or `None` for the default slot.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn display_id(&self) -> &str {
        self.id.as_deref().unwrap_or(DEFAULT_MODEL_ID)
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn capability_report(&self) -> &CapabilityReport {
        &self.report
    }

    /// Opens a session, waiting for any other session on this instance to end.
    ///
    /// A session abandoned by a panic leaves the module usable; the lock is
    /// recovered rather than propagated.
    ///
    /// Calling this while the same thread already holds a session on this
    /// instance, including from inside [`ModelInstance::scoped`], deadlocks.
    /// Use [`ModelInstance::try_session`] where that can happen.
    pub fn session(&self) -> Session<'_> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        Session::new(self, store)
    }

    /// Opens a session if no other session is active on this instance.
    ///
    /// # Errors
    ///
    /// `Precondition` if the instance is already in use.
    pub fn try_session(&self) -> Result<Session<'_>> {
        match self.store.try_lock() {
            Ok(store) => Ok(Session::new(self, store)),
            Err(TryLockError::Poisoned(poisoned)) => Ok(Session::new(self, poisoned.into_inner())),
            Err(TryLockError::WouldBlock) => Err(DiffeqError::Precondition(format!(
                "model {} is in use by another session",
                self.display_id()
            ))),
        }
    }

    /// Runs `f` in a session and destroys every handle it created but did not
    /// destroy, whether `f` returns `Ok`, returns `Err`, or panics.
    ///
    /// Leftovers are released solvers first, then options, then vectors.
    /// Handles that escape the closure are stale afterwards and fail with
    /// `UseAfterDestroy`.
    ///
    /// The instance stays locked while `f` runs. Work inside the closure must
    /// go through the session it receives: [`ModelInstance::session`] on the
    /// same instance blocks forever, and [`ModelInstance::try_session`]
    /// returns `Precondition`.
    ///
    /// # Examples
    ///
    /// ```
    /// use diffeq_runtime::{Sandbox, Vector};
    /// use diffeq_test::{logistic_module, Variant};
    ///
    /// let model = Sandbox::default()
    ///     .instantiate(&logistic_module(Variant::SelfLimiting), None)
    ///     .unwrap();
    ///
    /// let total = model
    ///     .scoped(|s| {
    ///         let v = Vector::from_slice(s, &[1.0, 2.0, 3.0])?;
    ///         Ok(v.view(s)?.iter().sum::<f64>())
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(total, 6.0);
    /// assert_eq!(model.session().live_handles(), 0);
    /// ```
    pub fn scoped<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T>,
    {
        let mut scope = Scope::new(self.session());
        f(&mut scope.session)
    }
}

impl fmt::Debug for ModelInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelInstance")
            .field("id", &self.id)
            .field("instance_id", &self.instance_id)
            .field("capabilities", &self.report)
            .finish_non_exhaustive()
    }
}

struct Scope<'m> {
    session: Session<'m>,
    watermark: u64,
}

impl<'m> Scope<'m> {
    fn new(session: Session<'m>) -> Self {
        let watermark = session.watermark();
        Self { session, watermark }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        let released = self.session.release_since(self.watermark);
        if released > 0 {
            tracing::debug!(
                event = "scope_released",
                model = self.session.model().display_id(),
                released,
                "Released handles left over by scope"
            );
        }
    }
}
