//! Decides which backend serves a given model id.
//!
//! Selection is a pure function of the model name and what is available at the
//! moment of the call. It never fails: anything that cannot go to the vendor
//! API degrades to the fallback gateway, and models of no known family are
//! left unrouted.

use crate::credentials::CredentialStore;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendTarget {
    VendorDirect,
    FallbackGateway,
    Unrouted,
}

impl BackendTarget {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BackendTarget::VendorDirect => "vendor-direct",
            BackendTarget::FallbackGateway => "fallback-gateway",
            BackendTarget::Unrouted => "unrouted",
        }
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse model family, by brand token in the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Claude,
    Gemini,
    Other,
}

#[must_use]
pub fn classify_model(model: &str) -> ModelFamily {
    let lower = model.to_lowercase();
    if lower.contains("claude") {
        ModelFamily::Claude
    } else if lower.contains("gemini") {
        ModelFamily::Gemini
    } else {
        ModelFamily::Other
    }
}

/// Tells whether a model id belongs to the vendor served directly by this bridge.
pub trait ModelClassifier: Send + Sync {
    fn is_vendor_model(&self, model: &str) -> bool;
}

/// Case-insensitive substring match on a brand token such as `claude`.
#[derive(Debug, Clone)]
pub struct BrandClassifier {
    brand: String,
}

impl BrandClassifier {
    pub fn new(brand: &str) -> Self {
        Self {
            brand: brand.to_lowercase(),
        }
    }
}

impl Default for BrandClassifier {
    fn default() -> Self {
        Self::new("claude")
    }
}

impl ModelClassifier for BrandClassifier {
    fn is_vendor_model(&self, model: &str) -> bool {
        !self.brand.is_empty() && model.to_lowercase().contains(&self.brand)
    }
}

/// What the vendor direct path has going for it right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    pub credential_present: bool,
    pub client_ready: bool,
}

impl Availability {
    #[must_use]
    pub fn is_available(self) -> bool {
        self.credential_present && self.client_ready
    }
}

/// First match wins: foreign model -> `Unrouted`; vendor model without a usable
/// direct client -> `FallbackGateway`; otherwise `VendorDirect`.
pub fn select(
    model: &str,
    availability: Availability,
    classifier: &dyn ModelClassifier,
) -> BackendTarget {
    if !classifier.is_vendor_model(model) {
        return BackendTarget::Unrouted;
    }

    if !availability.credential_present {
        tracing::debug!(model, "Vendor credential not set, falling back to gateway");
        return BackendTarget::FallbackGateway;
    }

    if !availability.client_ready {
        tracing::debug!(model, "Vendor client not initialized, falling back to gateway");
        return BackendTarget::FallbackGateway;
    }

    BackendTarget::VendorDirect
}

/// Selector wired to live configuration. The credential is read on every call,
/// so a reload takes effect on the next request.
#[derive(Clone)]
pub struct BackendSelector {
    classifier: Arc<dyn ModelClassifier>,
    credentials: CredentialStore,
    client_ready: bool,
}

impl BackendSelector {
    pub fn new(
        classifier: Arc<dyn ModelClassifier>,
        credentials: CredentialStore,
        client_ready: bool,
    ) -> Self {
        Self {
            classifier,
            credentials,
            client_ready,
        }
    }

    #[must_use]
    pub fn availability(&self) -> Availability {
        Availability {
            credential_present: self.credentials.is_present(),
            client_ready: self.client_ready,
        }
    }

    #[must_use]
    pub fn select(&self, model: &str) -> BackendTarget {
        let target = select(model, self.availability(), self.classifier.as_ref());
        tracing::debug!(model, backend = %target, "Routing request");
        target
    }
}
