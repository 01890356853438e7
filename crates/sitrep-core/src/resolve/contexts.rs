//! Effective Context View
//!
//! The scoring stages consume the materialized per-node context rows as
//! one value per kind: the first REGION, GROUP, DIRECTION, and
//! PROXIMITY value in deterministic (sorted) row order.

use crate::lss::CtxKind;
use crate::storage::DomContextRow;

/// The contexts a LOCATION node inherits, one value per kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveContexts {
    pub region: Option<String>,
    pub group: Option<String>,
    pub direction: Option<String>,
    pub proximity: Option<String>,
}

impl EffectiveContexts {
    pub fn from_rows(rows: &[DomContextRow]) -> Self {
        let mut out = Self::default();
        for row in rows {
            let slot = match row.ctx_kind {
                CtxKind::Region => &mut out.region,
                CtxKind::Group => &mut out.group,
                CtxKind::Direction => &mut out.direction,
                CtxKind::Proximity => &mut out.proximity,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(row.ctx_value.clone());
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.region.is_none()
            && self.group.is_none()
            && self.direction.is_none()
            && self.proximity.is_none()
    }
}
