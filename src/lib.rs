//! Form controller and request builder for the Lattice Builder web
//! interface: validates a construction form, keeps its fields coupled and
//! serializes it into the positional parameters of `latbuilder_exec`.

pub mod about;
pub mod array_field;
pub mod backend;
pub mod config;
pub mod construction;
pub mod error;
pub mod figure;
pub mod form_shell;
pub mod form_state;
pub mod multilevel;
pub mod query;
pub mod results;
pub mod search;
pub mod size_param;
pub mod store;
pub mod validator;
pub mod weights;
