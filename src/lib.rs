// Performance
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::inline_always)]
#![warn(clippy::large_types_passed_by_value)]
#![allow(clippy::manual_div_ceil)]
#![warn(clippy::naive_bytecount)]
#![warn(clippy::needless_collect)]
#![warn(clippy::needless_pass_by_value)]
#![warn(clippy::or_fun_call)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::trivially_copy_pass_by_ref)]
// Readability/Code Intention
#![warn(clippy::checked_conversions)]
#![warn(clippy::cloned_instead_of_copied)]
#![warn(clippy::enum_glob_use)]
#![warn(clippy::implicit_clone)]
#![warn(clippy::inconsistent_struct_constructor)]
#![warn(clippy::manual_assert)]
#![warn(clippy::manual_let_else)]
#![warn(clippy::manual_string_new)]
#![warn(clippy::map_unwrap_or)]
#![warn(clippy::match_bool)]
#![warn(clippy::mod_module_files)]
#![warn(clippy::redundant_test_prefix)]
#![warn(clippy::semicolon_if_nothing_returned)]
#![warn(clippy::tests_outside_test_module)]
// Correctness/Safety
#![warn(clippy::collection_is_never_read)]
#![warn(clippy::dbg_macro)]
#![deny(clippy::debug_assert_with_mut_call)]
#![warn(clippy::infinite_loop)]
#![warn(clippy::large_stack_arrays)]
#![warn(clippy::mem_forget)]
#![warn(clippy::read_zero_byte_vec)]
#![warn(clippy::undocumented_unsafe_blocks)]
#![warn(clippy::unwrap_used)]
// Annoyances
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::uninlined_format_args)]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod blend;
pub mod codec;
pub mod comm;
pub mod error;
pub mod image;
pub mod morph;
pub mod partition;

pub use comm::{ChannelCommunicator, CommPhase, Communicator, TcpCommunicator};
pub use error::MorphError;
pub use image::ImageBuffer;
pub use morph::{DEFAULT_ALPHA, MorphConfig, morph_distributed, morph_sequential};
pub use partition::PartitionPlan;
