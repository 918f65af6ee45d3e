//! Out-of-line memory copy strategy
//!
//! Selected purely from the bound object's type tag - a lookup, not a
//! per-message decision. Pager and device objects consume the pages
//! they are handed outright, so their messages copy in as page lists
//! with page stealing; everything else uses the ordinary entry-list
//! copy.

use core_types::KobjectType;

/// How out-of-line regions in a message are copied in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OolCopyStrategy {
    /// Ordinary map-entry copy
    EntryList,
    /// Page-list copy, stealing the pages from the sender
    PageListSteal,
}

/// Returns the copy strategy for messages bound for `kind` objects
pub const fn copyin_strategy(kind: KobjectType) -> OolCopyStrategy {
    match kind {
        KobjectType::Pager | KobjectType::Device => OolCopyStrategy::PageListSteal,
        KobjectType::Task | KobjectType::Host | KobjectType::HostPriv | KobjectType::VmMap => {
            OolCopyStrategy::EntryList
        }
    }
}
