// SPDX-License-Identifier: MIT

//! Adapter selection by `runtime_type` (spec.md §4.2, Open Question (c),
//! resolved in SPEC_FULL.md §4.2): the composition root wires whichever
//! `VmBackend`s are configured; the coordinator never introspects which
//! concrete adapter it holds (spec.md §9 "Polymorphism").

use std::sync::Arc;
use wso_core::{CoreError, RuntimeType};
use wso_vmbackend::VmBackend;

/// The set of `VmBackend`s available to the coordinator, one slot per
/// `RuntimeType`. A slot left `None` means that runtime is not configured
/// in this deployment; dispatching to it fails fast rather than silently
/// substituting a different backend.
#[derive(Clone, Default)]
pub struct Backends {
    pub docker: Option<Arc<dyn VmBackend>>,
    pub firecracker: Option<Arc<dyn VmBackend>>,
}

impl Backends {
    pub fn resolve(&self, runtime_type: RuntimeType) -> Result<Arc<dyn VmBackend>, CoreError> {
        let slot = match runtime_type {
            RuntimeType::Docker => &self.docker,
            RuntimeType::Firecracker => &self.firecracker,
        };
        slot.clone().ok_or_else(|| {
            CoreError::invalid_input(format!("no VmBackend configured for runtime_type={runtime_type}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wso_vmbackend::MockVmBackend;

    #[test]
    fn resolves_configured_slot() {
        let backends = Backends { docker: Some(Arc::new(MockVmBackend::new())), firecracker: None };
        assert!(backends.resolve(RuntimeType::Docker).is_ok());
    }

    #[test]
    fn missing_slot_fails_fast_with_invalid_input() {
        let backends = Backends::default();
        let err = backends.resolve(RuntimeType::Firecracker).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
