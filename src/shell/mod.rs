//! Stateful front end: a working directory into a shared tree and the
//! commands that resolve paths against it.

mod managed_cd;
mod shell;

pub use managed_cd::ManagedCd;
pub use shell::{Shell, ShellError};
