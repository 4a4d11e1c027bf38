pub use crate::console::{Logger, Verbosity};
pub use crate::context::{Abort, Context, TestResult};
pub use crate::filter::FilterSpec;
pub use crate::registry::{Fixture, Registry, TestEntry};
pub use crate::runner::{Outcome, RunReport, Runner};
pub use crate::timer::{Clock, TimerKind};
pub use crate::{check, check_eq, check_ne, check_panics, require, require_eq, require_ne};
