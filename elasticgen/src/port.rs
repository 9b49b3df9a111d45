//! Handshake ports.
//!
//! A handshake port named `p` is declared as up to four kinds of Verilog ports: the payload `p`
//! (omitted when dataless), one `p_<signal>` per extra signal, `p_valid` travelling with the
//! payload and `p_ready` travelling against it. Array ports of `n` channels flatten every field,
//! channel `i` occupying the `i`-th slice.

use crate::error::GenError;
use crate::params::ExtraSignals;
use crate::vir::PortDeclaration;

/// Direction of a handshake port, seen from the module declaring it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Payload flows into the module.
    In,
    /// Payload flows out of the module.
    Out,
}

/// Named handshake port with its payload width, extra signals and channel count.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortGroup {
    /// Port name.
    pub name: String,
    /// Payload width, 0 when dataless.
    pub bitwidth: u32,
    /// Extra signals carried by every channel.
    pub extra_signals: ExtraSignals,
    /// Channel count of an array port, `None` for a single channel.
    pub size: Option<u32>,
}

impl PortGroup {
    /// Single-channel port.
    pub fn new<S: Into<String>>(name: S, bitwidth: u32, extra_signals: ExtraSignals) -> Self {
        Self { name: name.into(), bitwidth, extra_signals, size: None }
    }

    /// Array port of `size` channels.
    pub fn array<S: Into<String>>(name: S, bitwidth: u32, extra_signals: ExtraSignals, size: u32) -> Self {
        Self { name: name.into(), bitwidth, extra_signals, size: Some(size) }
    }

    /// Number of channels.
    pub fn channels(&self) -> u32 { self.size.unwrap_or(1) }

    /// Name of the valid port.
    pub fn valid(&self) -> String { format!("{}_valid", self.name) }

    /// Name of the ready port.
    pub fn ready(&self) -> String { format!("{}_ready", self.name) }

    /// Name of the port carrying extra signal `signal`.
    pub fn extra(&self, signal: &str) -> String { format!("{}_{}", self.name, signal) }

    /// Checks the group against the extra signals shared by a signal manager.
    pub fn validate(&self, extra_signals: &ExtraSignals) -> Result<(), GenError> {
        if self.size == Some(0) {
            return Err(GenError::invalid("size", format!("array port `{}` has no channel", self.name)));
        }
        if &self.extra_signals != extra_signals {
            return Err(GenError::invalid(
                "extra_signals",
                format!("port `{}` does not carry the unit's extra signals", self.name),
            ));
        }
        Ok(())
    }

    /// Outer declarations: payload, extra signals, valid, ready.
    pub fn declarations(&self, direction: Direction) -> Vec<PortDeclaration> {
        let channels = self.channels() as usize;
        let mut decls = Vec::new();
        if self.bitwidth > 0 {
            decls.push(forward(direction, channels * self.bitwidth as usize, self.name.clone()));
        }
        for signal in &self.extra_signals {
            decls.push(forward(direction, channels * signal.bitwidth as usize, self.extra(&signal.name)));
        }
        decls.push(forward(direction, channels, self.valid()));
        decls.push(backward(direction, channels, self.ready()));
        decls
    }
}

fn forward(direction: Direction, width: usize, ident: String) -> PortDeclaration {
    match direction {
        Direction::In => PortDeclaration::input(width, ident),
        Direction::Out => PortDeclaration::output(width, ident),
    }
}

fn backward(direction: Direction, width: usize, ident: String) -> PortDeclaration {
    match direction {
        Direction::In => PortDeclaration::output(width, ident),
        Direction::Out => PortDeclaration::input(width, ident),
    }
}

/// Declarations of a handshake port without extra signals.
pub fn handshake_decls(direction: Direction, name: &str, bitwidth: u32, channels: u32) -> Vec<PortDeclaration> {
    let group = PortGroup { name: name.to_string(), bitwidth, extra_signals: ExtraSignals::default(), size: None };
    let channels = channels as usize;
    let mut decls = Vec::new();
    if bitwidth > 0 {
        decls.push(forward(direction, channels * bitwidth as usize, group.name.clone()));
    }
    decls.push(forward(direction, channels, group.valid()));
    decls.push(backward(direction, channels, group.ready()));
    decls
}

/// `clk` and `rst`.
pub fn clock_decls() -> Vec<PortDeclaration> {
    vec![PortDeclaration::input(1, "clk"), PortDeclaration::input(1, "rst")]
}

/// Fails with [`GenError::NameCollision`] if two declarations share a name.
pub fn check_unique(decls: &[PortDeclaration]) -> Result<(), GenError> {
    for (i, decl) in decls.iter().enumerate() {
        if decls[..i].iter().any(|other| other.ident() == decl.ident()) {
            return Err(GenError::collision(decl.ident()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_port_declarations() {
        let tag = ExtraSignals::from_pairs([("tag", 2)]).unwrap();
        let ins = PortGroup::array("ins", 8, tag.clone(), 2);
        let decls = ins.declarations(Direction::In);
        assert_eq!(decls, vec![
            PortDeclaration::input(16, "ins"),
            PortDeclaration::input(4, "ins_tag"),
            PortDeclaration::input(2, "ins_valid"),
            PortDeclaration::output(2, "ins_ready"),
        ]);
        assert_eq!(ins.validate(&tag), Ok(()));
        assert!(ins.validate(&ExtraSignals::default()).is_err());
        assert!(PortGroup::array("ins", 8, tag.clone(), 0).validate(&tag).is_err());
    }

    #[test]
    fn dataless_declarations_have_no_payload() {
        let decls = handshake_decls(Direction::Out, "outs", 0, 1);
        assert_eq!(decls, vec![PortDeclaration::output(1, "outs_valid"), PortDeclaration::input(1, "outs_ready")]);
    }

    #[test]
    fn clashing_extra_signal_names_are_detected() {
        let valid = ExtraSignals::from_pairs([("valid", 1)]).unwrap();
        let decls = PortGroup::new("outs", 8, valid).declarations(Direction::Out);
        assert_eq!(check_unique(&decls), Err(GenError::NameCollision { identity: "outs_valid".to_string() }));
    }
}
