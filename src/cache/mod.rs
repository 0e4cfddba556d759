//! Cache decision engine
//!
//! Decides per layer whether the stored layer can be reused. Each layer is
//! bound to exactly one fingerprint domain, so staleness in one domain never
//! invalidates a layer bound to another.
//!
//! | Layer | Domain | Launch | Build | Cache |
//! |-------|--------|--------|-------|-------|
//! | nuget-cache | dependencies | no | no | yes |
//! | publish-output | full-source | yes | no | yes |
//! | debug-support | toolchain | yes | no | yes |

pub mod decision;

pub use decision::{
    decide, decide_all, CacheDecision, CurrentFingerprints, LayerBinding, LayerDecision,
    ValidationDomains,
};
