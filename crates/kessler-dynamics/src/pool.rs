//! Pooled checkout of integrator instances.
//!
//! Cloning a [`TaylorIntegrator`] allocates its series workspace, and
//! a superstep propagates every particle — so workers borrow a
//! ready-made instance from the pool and hand it back when their
//! particle is done. The template integrator is never used for
//! propagation; it only seeds clones when the pool runs dry.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use crate::integrator::TaylorIntegrator;

/// A thread-safe pool of ready-to-use integrators.
pub struct IntegratorPool {
    template: TaylorIntegrator,
    free: Mutex<Vec<TaylorIntegrator>>,
}

impl IntegratorPool {
    /// Creates a pool seeded from a template integrator.
    pub fn new(template: TaylorIntegrator) -> Self {
        Self {
            template,
            free: Mutex::new(Vec::new()),
        }
    }

    /// Integration order of the pooled instances.
    pub fn order(&self) -> usize {
        self.template.order()
    }

    /// Checks out an integrator, cloning the template if the pool is
    /// empty. The instance returns to the pool when the guard drops —
    /// on every exit path, including panics.
    pub fn acquire(&self) -> PooledIntegrator<'_> {
        let inner = self
            .free
            .lock()
            .expect("integrator pool poisoned")
            .pop()
            .unwrap_or_else(|| self.template.clone());
        PooledIntegrator {
            pool: self,
            inner: Some(inner),
        }
    }

    /// Number of idle instances currently parked in the pool.
    pub fn idle_count(&self) -> usize {
        self.free.lock().expect("integrator pool poisoned").len()
    }

    fn put_back(&self, integrator: TaylorIntegrator) {
        if let Ok(mut free) = self.free.lock() {
            free.push(integrator);
        }
    }
}

impl Clone for IntegratorPool {
    fn clone(&self) -> Self {
        // Clones share nothing: a cloned simulation gets a fresh pool
        // seeded from the same template.
        Self::new(self.template.clone())
    }
}

/// Scoped checkout handle; derefs to the integrator.
pub struct PooledIntegrator<'a> {
    pool: &'a IntegratorPool,
    inner: Option<TaylorIntegrator>,
}

impl Deref for PooledIntegrator<'_> {
    type Target = TaylorIntegrator;

    fn deref(&self) -> &TaylorIntegrator {
        self.inner.as_ref().expect("pooled integrator taken")
    }
}

impl DerefMut for PooledIntegrator<'_> {
    fn deref_mut(&mut self) -> &mut TaylorIntegrator {
        self.inner.as_mut().expect("pooled integrator taken")
    }
}

impl Drop for PooledIntegrator<'_> {
    fn drop(&mut self) {
        if let Some(integrator) = self.inner.take() {
            self.pool.put_back(integrator);
        }
    }
}
