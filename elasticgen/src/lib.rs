//! elasticgen: structural generators for handshake (elastic) dataflow units.
//!
//! A generator turns a unit kind and a parameter set into an [`Artifact`]: the Verilog text of the
//! requested module preceded by every submodule it instantiates. The crate provides the framework
//! shared by all unit kinds: variant dispatch, dependency accumulation, port width arithmetic and
//! the signal managers that let metadata-oblivious units carry extra signals.

// # Tries to deny all lints (`rustc -W help`).
#![deny(absolute_paths_not_starting_with_crate)]
#![deny(anonymous_parameters)]
#![deny(deprecated_in_future)]
#![deny(explicit_outlives_requirements)]
#![deny(keyword_idents)]
#![deny(macro_use_extern_crate)]
#![deny(missing_debug_implementations)]
#![deny(non_ascii_idents)]
#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![deny(unused_extern_crates)]
#![deny(unused_import_braces)]
//
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(rustdoc::invalid_codeblock_attributes)]
#![deny(rustdoc::invalid_html_tags)]
#![deny(rustdoc::bare_urls)]
//
#![allow(clippy::needless_lifetimes)]
#![allow(clippy::inherent_to_string)]
#![allow(clippy::to_string_trait_impl)]

pub mod artifact;
pub mod dispatch;
pub mod error;
pub mod ident;
pub mod params;
pub mod port;
pub mod signal_manager;
pub mod smv;
pub mod tag;
pub mod utils;
pub mod vir;
pub mod width;

pub use artifact::{Accumulator, Artifact, Block};
pub use dispatch::{dispatch, Shape, ShapeSupport, Variant};
pub use error::GenError;
pub use ident::{InstanceId, Role};
#[doc(hidden)]
pub use linked_hash_map;
pub use params::{ExtraSignal, ExtraSignals, ParamKey, ParamMap, ParamValue, Precision, UnitRequest};
pub use port::PortGroup;
pub use tag::{parse_tag, Tagged};
pub use utils::*;
pub use width::{combined_width, Field, FieldSlice, SliceBounds};

static_assertions::assert_impl_all!(Artifact: Send, Sync, Clone);
static_assertions::assert_impl_all!(UnitRequest: Send, Sync, Clone);
static_assertions::assert_impl_all!(ParamMap: Send, Sync);
