//! Behavior aliases: the table-driven behavior vocabulary.

use crate::models::board::Firmware;

/// One behavior alias from `aliases.yaml`.
///
/// Templates substitute `{param}` placeholders with translated arguments.
/// An empty template means the behavior has no emission on that firmware;
/// together with the `firmware` support list this drives graceful
/// degradation instead of compile failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BehaviorAlias {
    /// Behavior id as written in key tokens (`hrm`, `lt`, ...).
    pub id: String,
    /// Ordered parameter names; arity is checked against token arguments.
    pub params: Vec<String>,
    /// QMK emission template.
    pub qmk: String,
    /// ZMK emission template.
    pub zmk: String,
    /// Firmware families that support the behavior natively.
    pub firmware: Vec<Firmware>,
}

impl BehaviorAlias {
    /// Declared parameter count.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Emission template for the given firmware.
    #[must_use]
    pub fn template(&self, firmware: Firmware) -> &str {
        match firmware {
            Firmware::Qmk => &self.qmk,
            Firmware::Zmk => &self.zmk,
        }
    }

    /// True when the behavior emits natively on the given firmware.
    #[must_use]
    pub fn supports(&self, firmware: Firmware) -> bool {
        self.firmware.contains(&firmware) && !self.template(firmware).is_empty()
    }
}
