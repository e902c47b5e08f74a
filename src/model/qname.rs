//! Namespace-qualified names

use crate::version::Revision;
use std::fmt;
use std::sync::Arc;

/// Namespace plus optional revision of a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QNameModule {
    pub namespace: Arc<str>,
    pub revision: Option<Revision>,
}

impl QNameModule {
    pub fn new(namespace: impl Into<Arc<str>>, revision: Option<Revision>) -> Self {
        Self { namespace: namespace.into(), revision }
    }
}

impl fmt::Display for QNameModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.revision {
            Some(rev) => write!(f, "({}?revision={})", self.namespace, rev),
            None => write!(f, "({})", self.namespace),
        }
    }
}

/// A local name bound to a module namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub module: QNameModule,
    pub local_name: Arc<str>,
}

impl QName {
    pub fn new(module: QNameModule, local_name: impl Into<Arc<str>>) -> Self {
        Self { module, local_name: local_name.into() }
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    /// Same local name in another module
    pub fn bind_to(&self, module: &QNameModule) -> Self {
        Self { module: module.clone(), local_name: self.local_name.clone() }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.module, self.local_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qname_display() {
        let module = QNameModule::new("urn:xml:ns:yang:lrr", Some(Revision::parse("2015-02-25").unwrap()));
        let qname = QName::new(module, "neighbor-id");
        assert_eq!(qname.to_string(), "(urn:xml:ns:yang:lrr?revision=2015-02-25)neighbor-id");
        assert_eq!(QName::new(QNameModule::new("urn:a", None), "b").to_string(), "(urn:a)b");
    }
}
