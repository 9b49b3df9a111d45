//! Signal managers.
//!
//! A signal manager wraps a unit that only understands its primary payload so that it carries
//! extra signals (tags, spec bits, ...) as well. The wrapper exposes the full port interface and
//! instantiates the wrapped unit as its `inner` submodule.
//!
//! - [`concat`]: for units that pass data through unchanged (merge, buffers, muxes). Extra
//!   signals are packed next to the payload and travel through the inner unit.
//! - [`buffered`]: for units that compute a new payload (arithmetic). Extra signals bypass the
//!   inner unit through a delay line of the same latency.

pub mod buffered;
pub mod concat;

pub use buffered::{generate_buffered_signal_manager, DelayLine};
pub use concat::generate_concat_signal_manager;

use crate::error::GenError;
use crate::params::ExtraSignals;
use crate::port::{check_unique, clock_decls, Direction, PortGroup};
use crate::vir::PortDeclaration;

/// Validates the port groups of a wrapper and returns its outer port declarations.
fn outer_ports(
    in_ports: &[PortGroup], out_ports: &[PortGroup], extra_signals: &ExtraSignals,
) -> Result<Vec<PortDeclaration>, GenError> {
    if in_ports.is_empty() || out_ports.is_empty() {
        return Err(GenError::invalid("ports", "a signal manager needs at least one input and one output port"));
    }
    for group in in_ports.iter().chain(out_ports) {
        group.validate(extra_signals)?;
    }

    let mut decls = clock_decls();
    for group in in_ports {
        decls.extend(group.declarations(Direction::In));
    }
    for group in out_ports {
        decls.extend(group.declarations(Direction::Out));
    }
    check_unique(&decls)?;
    Ok(decls)
}
